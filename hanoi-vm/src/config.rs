//! Loader and interpreter configuration

use hanoi_asm::{ExtensionTable, Tier};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    consts::{
        DEMOTE_THRESHOLD, PROGRAM_SIZE_LIMIT, PROMOTE_THRESHOLD,
        VM_CALL_STACK_CAPACITY, VM_STACK_CAPACITY,
    },
    trace::SessionId,
};

/// Read-only cancellation source checked between instructions.
///
/// Cloning shares the flag: the host keeps one handle and cancels, the
/// interpreter polls the other. The default flag never cancels.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag; the run loop stops before the next instruction.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Loader options.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Cap on the bytecode body, in bytes.
    pub program_size_limit: usize,
    /// Registry of opcodes outside the core set.
    pub extensions: ExtensionTable,
}

impl LoadConfig {
    /// Defaults: 64 KiB limit, no extensions.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            program_size_limit: PROGRAM_SIZE_LIMIT,
            extensions: ExtensionTable::new(),
        }
    }
}

/// Interpreter parameters, all optional with stated defaults.
#[derive(Debug, Clone)]
pub struct InterpreterParams {
    /// Maximum operand stack depth.
    pub stack_capacity: usize,
    /// Maximum call stack depth.
    pub call_stack_capacity: usize,
    /// Call depth above which the tier FSM promotes.
    pub promote_threshold: usize,
    /// Call depth below which the tier FSM may demote.
    pub demote_threshold: usize,
    /// Continue past recoverable faults instead of halting.
    pub continue_on_fault: bool,
    /// Tier the context starts in.
    pub initial_tier: Tier,
    /// Session override; defaults to the program fingerprint.
    pub session_id: Option<SessionId>,
}

impl Default for InterpreterParams {
    fn default() -> Self {
        Self {
            stack_capacity: VM_STACK_CAPACITY,
            call_stack_capacity: VM_CALL_STACK_CAPACITY,
            promote_threshold: PROMOTE_THRESHOLD,
            demote_threshold: DEMOTE_THRESHOLD,
            continue_on_fault: false,
            initial_tier: Tier::T81,
            session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let peer = flag.clone();
        assert!(!peer.is_cancelled());
        flag.cancel();
        assert!(peer.is_cancelled());
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let params = InterpreterParams::default();
        assert_eq!(params.stack_capacity, 2187);
        assert_eq!(params.promote_threshold, 5);
        assert_eq!(params.demote_threshold, 2);
        assert!(!params.continue_on_fault);
        assert_eq!(LoadConfig::new().program_size_limit, 65536);
    }
}
