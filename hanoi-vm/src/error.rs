//! Loader and interpreter error implementation

use hanoi_asm::FaultReason;

use crate::state::FaultInfo;

/// Result of a handler step; faults carry only their reason, the dispatcher
/// attributes them to the failing instruction.
pub type SimpleResult<T> = Result<T, FaultReason>;

/// Validation failures surfaced by [`crate::program::Program::load`].
///
/// Loader errors are fatal for the program being loaded; no execution
/// context is constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The body exceeds the configured size limit.
    #[error("program of {size} bytes exceeds the {limit}-byte limit")]
    ProgramTooLarge {
        /// Observed body size.
        size: usize,
        /// Configured cap.
        limit: usize,
    },
    /// A byte names neither a core nor an extension opcode.
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode {
        /// The unrecognized byte.
        byte: u8,
        /// Offset of the byte in the body.
        offset: usize,
    },
    /// An operand tag disagrees with the opcode's declared operand type.
    #[error("{mnemonic} rejects operand tag 0x{tag:02X} at offset {offset}")]
    TagMismatch {
        /// Mnemonic of the opcode being decoded.
        mnemonic: &'static str,
        /// The offending tag byte.
        tag: u8,
        /// Offset of the tag byte in the body.
        offset: usize,
    },
    /// An operand body violates the shape rules of its tag.
    #[error("malformed operand (tag 0x{tag:02X}) at offset {offset}: {reason}")]
    MalformedOperand {
        /// Tag byte of the operand.
        tag: u8,
        /// Offset of the operand in the body.
        offset: usize,
        /// Violated rule.
        reason: &'static str,
    },
    /// The body ends inside an instruction.
    #[error("bytecode truncated at offset {0}")]
    Truncated(usize),
    /// The computed digest differs from the caller's expectation.
    #[error("digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch {
        /// Hex rendering of the expected digest.
        expected: String,
        /// Hex rendering of the computed digest.
        actual: String,
    },
    /// The optional `HVM0` header is present but inconsistent.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
}

/// Top-level interpreter error, as reported to hosts and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    /// The program failed validation.
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
    /// Execution halted on a runtime fault.
    #[error("{} faulted at offset {}: {}", .0.mnemonic, .0.offset, .0.reason)]
    Fault(FaultInfo),
    /// Execution was cancelled by the host.
    #[error("execution cancelled")]
    Cancelled,
}

impl InterpreterError {
    /// The runtime fault reason, when applicable.
    pub const fn fault_reason(&self) -> Option<FaultReason> {
        match self {
            Self::Fault(info) => Some(info.reason),
            _ => None,
        }
    }
}

impl From<FaultInfo> for InterpreterError {
    fn from(info: FaultInfo) -> Self {
        Self::Fault(info)
    }
}
