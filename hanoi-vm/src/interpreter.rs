//! [`Interpreter`] implementation
//!
//! One interpreter owns one execution context: operand stack, call stack,
//! instruction pointer, mode register, ternary accumulators and session id.
//! Contexts are single-owner and never shared across threads; the loaded
//! [`Program`] is shared by reference. Dispatch goes through a single
//! immutable table built from a declarative descriptor list, with a second
//! handler map for extension opcodes.

use hanoi_asm::{FaultReason, Opcode, Tier};
use hanoi_ternary::T81Digit;

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use tracing::debug;

use crate::{
    config::{CancelFlag, InterpreterParams},
    consts::VM_REGISTER_COUNT,
    error::SimpleResult,
    host::HostHooks,
    operand::Operand,
    program::Program,
    state::{ExecuteState, FaultInfo},
    symbolic::{T243MarkovMatrix, T243StateVector, TableHandle, TransitionTable},
    tier_fsm::{TierFsm, TierShift},
    trace::{SessionId, TraceSink},
};

mod alu;
mod constructors;
mod executors;
mod flow;
mod symbolic;
mod tensor;

/// Handler signature shared by core and extension opcodes.
pub type ExtensionHandler =
    fn(&mut Interpreter, &[Operand]) -> SimpleResult<ExecuteState>;

pub(crate) type Handler = ExtensionHandler;

struct Descriptor {
    opcode: Opcode,
    handler: Handler,
}

/// Declarative list the dispatch table is built from: one record per core
/// opcode, in code order.
const DESCRIPTORS: &[Descriptor] = &[
    Descriptor { opcode: Opcode::NOP, handler: Interpreter::op_nop },
    Descriptor { opcode: Opcode::PUSH, handler: Interpreter::op_push },
    Descriptor { opcode: Opcode::POP, handler: Interpreter::op_pop },
    Descriptor { opcode: Opcode::ADD, handler: Interpreter::op_add },
    Descriptor { opcode: Opcode::SUB, handler: Interpreter::op_sub },
    Descriptor { opcode: Opcode::MUL, handler: Interpreter::op_mul },
    Descriptor { opcode: Opcode::DIV, handler: Interpreter::op_div },
    Descriptor { opcode: Opcode::MOD, handler: Interpreter::op_mod },
    Descriptor { opcode: Opcode::NEG, handler: Interpreter::op_neg },
    Descriptor { opcode: Opcode::ABS, handler: Interpreter::op_abs },
    Descriptor { opcode: Opcode::CMP3, handler: Interpreter::op_cmp3 },
    Descriptor { opcode: Opcode::JMP, handler: Interpreter::op_jmp },
    Descriptor { opcode: Opcode::JZ, handler: Interpreter::op_jz },
    Descriptor { opcode: Opcode::JNZ, handler: Interpreter::op_jnz },
    Descriptor { opcode: Opcode::CALL, handler: Interpreter::op_call },
    Descriptor { opcode: Opcode::RET, handler: Interpreter::op_ret },
    Descriptor { opcode: Opcode::TNN_ACCUM, handler: Interpreter::op_tnn_accum },
    Descriptor { opcode: Opcode::T81_MATMUL, handler: Interpreter::op_t81_matmul },
    Descriptor { opcode: Opcode::T243_STATE_ADV, handler: Interpreter::op_t243_state_adv },
    Descriptor { opcode: Opcode::T729_INTENT, handler: Interpreter::op_t729_intent },
    Descriptor { opcode: Opcode::T729_HOLO_FFT, handler: Interpreter::op_t729_holo_fft },
    Descriptor { opcode: Opcode::T729_META_EXEC, handler: Interpreter::op_t729_meta_exec },
    Descriptor { opcode: Opcode::T243_MARKOV_STEP, handler: Interpreter::op_t243_markov_step },
    Descriptor { opcode: Opcode::T243_SYMBOL_OUT, handler: Interpreter::op_t243_symbol_out },
    Descriptor { opcode: Opcode::T729_ENTROPY_SNAP, handler: Interpreter::op_t729_entropy_snap },
    Descriptor { opcode: Opcode::T243_CIRCUIT_STEP, handler: Interpreter::op_t243_circuit_step },
    Descriptor { opcode: Opcode::T243_MORPHIC_TAG, handler: Interpreter::op_t243_morphic_tag },
    Descriptor { opcode: Opcode::T729_MINDMAP_QUERY, handler: Interpreter::op_t729_mindmap_query },
    Descriptor { opcode: Opcode::HALT, handler: Interpreter::op_halt },
];

fn dispatch(code: u8) -> Option<Handler> {
    static TABLE: OnceLock<[Option<Handler>; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [None; 256];
        for descriptor in DESCRIPTORS {
            table[descriptor.opcode.code() as usize] = Some(descriptor.handler);
        }
        table
    })[code as usize]
}

/// Context-resident symbolic state: the T243 FSM register, its transition
/// tables, the injected Markov matrix and the entropy accumulator.
pub(crate) struct SymbolicCtx {
    pub state: u8,
    pub tables: Vec<TransitionTable>,
    pub active_table: usize,
    pub markov: Option<T243MarkovMatrix>,
    pub entropy_accum: u64,
}

impl SymbolicCtx {
    fn new() -> Self {
        Self {
            state: 0,
            tables: vec![TransitionTable::rotation()],
            active_table: 0,
            markov: None,
            entropy_accum: 0,
        }
    }

    pub(crate) fn step(&mut self, signal: u8) -> u8 {
        let table = &self.tables[self.active_table % self.tables.len()];
        self.state = table.step(self.state, signal);
        self.state
    }

    pub(crate) fn state_vector(&self) -> T243StateVector {
        T243StateVector {
            current: hanoi_ternary::T243Digit::new(self.state % 243)
                .unwrap_or_default(),
            table: TableHandle(self.active_table),
        }
    }
}

/// VM interpreter.
///
/// Internal state is reachable through read accessors; mutation happens
/// only through [`Interpreter::run`] and [`Interpreter::step`]. The final
/// stack snapshot stays available after the run, whatever its outcome.
pub struct Interpreter {
    program: Arc<Program>,
    params: InterpreterParams,
    fsm: TierFsm,
    stack: Vec<Operand>,
    call_stack: Vec<usize>,
    ip: usize,
    tier: Tier,
    call_depth: usize,
    registers: [T81Digit; VM_REGISTER_COUNT],
    halted: bool,
    last_fault: Option<FaultInfo>,
    session_id: SessionId,
    sink: Arc<dyn TraceSink>,
    host: Arc<dyn HostHooks>,
    cancel: CancelFlag,
    yield_hook: Option<Arc<dyn Fn() + Send + Sync>>,
    symbolic: SymbolicCtx,
    extension_handlers: HashMap<u8, Handler>,
    // per-instruction observables
    current_offset: usize,
    current_len: usize,
    written_magnitude: u64,
    summary_override: Option<u8>,
    pending_shifts: Vec<TierShift>,
}

impl Interpreter {
    /// The loaded program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Current operand stack, bottom first.
    pub fn stack(&self) -> &[Operand] {
        &self.stack
    }

    /// Current call stack of return addresses.
    pub fn call_stack(&self) -> &[usize] {
        &self.call_stack
    }

    /// Instruction pointer, a byte offset into the body.
    pub const fn ip(&self) -> usize {
        self.ip
    }

    /// Current tier mode.
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Nested CALLs minus RETs.
    pub const fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// The 28 ternary accumulators.
    pub const fn registers(&self) -> &[T81Digit; VM_REGISTER_COUNT] {
        &self.registers
    }

    /// Mutable access to the accumulators, for hosts and extensions.
    pub fn registers_mut(&mut self) -> &mut [T81Digit; VM_REGISTER_COUNT] {
        &mut self.registers
    }

    /// Session id routing this context's trace events.
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether execution has terminated.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// The most recent runtime fault, if any.
    pub const fn last_fault(&self) -> Option<FaultInfo> {
        self.last_fault
    }

    /// Install a handler for an extension opcode registered with the
    /// loader's [`hanoi_asm::ExtensionTable`].
    pub fn register_extension_handler(&mut self, code: u8, handler: ExtensionHandler) {
        self.extension_handlers.insert(code, handler);
    }

    /// Replace the Markov matrix consulted by `T243_MARKOV_STEP`.
    pub fn set_markov_matrix(&mut self, matrix: T243MarkovMatrix) {
        self.symbolic.markov = Some(matrix);
    }

    /// Current symbolic FSM state, one of the 243.
    pub fn symbolic_state(&self) -> u8 {
        self.symbolic.state
    }

    // ---- handler plumbing ----

    pub(crate) fn push_operand(&mut self, operand: Operand) -> SimpleResult<()> {
        if self.stack.len() >= self.params.stack_capacity {
            return Err(FaultReason::StackOverflow)
        }
        // arithmetic may outgrow the validated wire width
        if let Operand::BigInt(value) = &operand {
            if value.digits().len() > 255 {
                return Err(FaultReason::Overflow)
            }
        }
        self.written_magnitude = self.written_magnitude.max(operand.magnitude_hint());
        self.stack.push(operand);
        Ok(())
    }

    pub(crate) fn pop_operand(&mut self) -> SimpleResult<Operand> {
        self.stack.pop().ok_or(FaultReason::StackUnderflow)
    }

    /// Put popped operands back, oldest first; bypasses the magnitude
    /// observation because nothing new was written.
    pub(crate) fn restore<I>(&mut self, operands: I)
    where
        I: IntoIterator<Item = Operand>,
    {
        for operand in operands {
            self.stack.push(operand);
        }
    }

    /// Highest tier any stack operand pins.
    pub(crate) fn stack_floor(&self) -> Tier {
        self.stack
            .iter()
            .map(Operand::tier_floor)
            .max()
            .unwrap_or(Tier::T81)
    }

    /// Record a magnitude the handler produced without pushing it.
    pub(crate) fn note_magnitude(&mut self, magnitude: u64) {
        self.written_magnitude = self.written_magnitude.max(magnitude);
    }

    /// Override the event summary byte for value-less instructions.
    pub(crate) fn note_summary(&mut self, summary: u8) {
        self.summary_override = Some(summary);
    }

    /// Call-depth increment epilogue.
    pub(crate) fn note_call_edge(&mut self) {
        if let Some(shift) = self.fsm.on_call(self.tier, self.call_depth) {
            self.pending_shifts.push(shift);
        }
    }

    /// Call-depth decrement epilogue.
    pub(crate) fn note_return_edge(&mut self) {
        let floor = self.stack_floor();
        if let Some(shift) = self.fsm.on_return(self.tier, self.call_depth, floor) {
            self.pending_shifts.push(shift);
        }
    }

    pub(crate) fn apply_shift(&mut self, shift: TierShift) {
        debug!(%shift, "tier transition");
        self.tier = shift.to;
        self.sink
            .event(&self.session_id, "MODE_CHANGE", shift.summary());
    }

    pub(crate) fn drain_shifts(&mut self) {
        let shifts = std::mem::take(&mut self.pending_shifts);
        for shift in shifts {
            // a queued shift may be stale after an earlier one applied
            if shift.from == self.tier {
                self.apply_shift(shift);
            }
        }
    }

    pub(crate) fn emit_fault_event(&self, mnemonic: &str, reason: FaultReason) {
        let name = format!("{mnemonic}_{}", reason.suffix());
        self.sink.event(&self.session_id, &name, reason.code());
    }

    pub(crate) fn host(&self) -> Arc<dyn HostHooks> {
        Arc::clone(&self.host)
    }

    pub(crate) fn core_dispatch(code: u8) -> Option<Handler> {
        dispatch(code)
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("ip", &self.ip)
            .field("tier", &self.tier)
            .field("call_depth", &self.call_depth)
            .field("stack_depth", &self.stack.len())
            .field("halted", &self.halted)
            .field("session_id", &self.session_id)
            .finish()
    }
}
