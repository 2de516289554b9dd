use std::{
    collections::HashMap,
    sync::Arc,
};

use hanoi_asm::Tier;
use hanoi_ternary::T81Digit;

use crate::{
    config::{CancelFlag, InterpreterParams},
    consts::VM_REGISTER_COUNT,
    host::{HostHooks, NoopHost},
    program::Program,
    tier_fsm::TierFsm,
    trace::{NoopSink, SessionId, TraceSink},
};

use super::{Interpreter, SymbolicCtx};

impl Interpreter {
    /// Create a context over a loaded program.
    ///
    /// The session id defaults to the program fingerprint so trace routing
    /// is stable across runs; trace sink, host hooks and cancel flag start
    /// as no-ops and are attached with the builder methods.
    pub fn new(program: Arc<Program>, params: InterpreterParams) -> Self {
        let session_id = params
            .session_id
            .clone()
            .unwrap_or_else(|| SessionId::from(program.fingerprint()));
        let fsm = TierFsm::new(params.promote_threshold, params.demote_threshold);
        let tier = params.initial_tier;
        Self {
            program,
            params,
            fsm,
            stack: Vec::new(),
            call_stack: Vec::new(),
            ip: 0,
            tier,
            call_depth: 0,
            registers: [T81Digit::ZERO; VM_REGISTER_COUNT],
            halted: false,
            last_fault: None,
            session_id,
            sink: Arc::new(NoopSink),
            host: Arc::new(NoopHost),
            cancel: CancelFlag::default(),
            yield_hook: None,
            symbolic: SymbolicCtx::new(),
            extension_handlers: HashMap::new(),
            current_offset: 0,
            current_len: 0,
            written_magnitude: 0,
            summary_override: None,
            pending_shifts: Vec::new(),
        }
    }

    /// Attach a trace sink; registers the session with it.
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        sink.register_session(&self.session_id);
        self.sink = sink;
        self
    }

    /// Attach host hooks for the delegated opcodes.
    pub fn with_host(mut self, host: Arc<dyn HostHooks>) -> Self {
        self.host = host;
        self
    }

    /// Attach a shared cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Attach a yield callback, invoked between instructions; the only
    /// preemption point the run loop offers.
    pub fn with_yield_hook(mut self, hook: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.yield_hook = Some(hook);
        self
    }

    /// Start in a higher tier, as the CLI `--mode` option does.
    pub fn with_initial_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self.params.initial_tier = tier;
        self
    }
}
