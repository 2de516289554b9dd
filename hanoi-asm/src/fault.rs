use hanoi_ternary::NumericError;

use core::fmt;

/// Runtime fault representation for the interpreter.
///
/// Faults carry a stable one-byte code used as the trace-event summary when
/// an instruction fails. A fault is recorded in the run outcome; it is never
/// thrown across opcode boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[non_exhaustive]
pub enum FaultReason {
    /// The byte can't be mapped to any known `FaultReason`.
    UnknownFaultReason = 0x00,
    /// Push beyond the operand stack capacity.
    StackOverflow = 0x01,
    /// Pop from an empty operand stack.
    StackUnderflow = 0x02,
    /// CALL beyond the call stack capacity.
    CallStackOverflow = 0x03,
    /// RET with an empty call stack.
    CallStackUnderflow = 0x04,
    /// A popped operand does not match the opcode's signature.
    TypeMismatch = 0x05,
    /// The opcode requires a higher tier than the current mode.
    ModeViolation = 0x06,
    /// The divisor evaluated to zero.
    DivideByZero = 0x07,
    /// A fixed-width result left its declared range.
    Overflow = 0x08,
    /// Control transfer to an offset that is not an instruction boundary.
    InvalidJump = 0x09,
    /// The host callback for a delegated opcode is absent.
    HostUnavailable = 0x0a,
    /// A delegated or composite opcode failed as a unit.
    OpcodeFailed = 0x0b,
    /// A handler-built operand failed shape validation.
    MalformedOperand = 0x0c,
}

impl FaultReason {
    /// Stable one-byte code of the fault.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Suffix appended to the mnemonic in fault-path entropy events
    /// (`DIV` + `ZERO` → `DIV_ZERO`).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::UnknownFaultReason => "FAULT",
            Self::StackOverflow => "OVERFLOW",
            Self::StackUnderflow => "UNDERFLOW",
            Self::CallStackOverflow => "CALL_OVERFLOW",
            Self::CallStackUnderflow => "CALL_UNDERFLOW",
            Self::TypeMismatch => "TYPE",
            Self::ModeViolation => "MODE",
            Self::DivideByZero => "ZERO",
            Self::Overflow => "RANGE",
            Self::InvalidJump => "JUMP",
            Self::HostUnavailable => "HOST",
            Self::OpcodeFailed => "FAILED",
            Self::MalformedOperand => "MALFORMED",
        }
    }

    /// Whether the dispatcher may continue past the fault when configured
    /// to do so. Structural faults always halt.
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::TypeMismatch
                | Self::ModeViolation
                | Self::DivideByZero
                | Self::Overflow
                | Self::HostUnavailable
                | Self::OpcodeFailed
        )
    }
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for FaultReason {}

impl From<u8> for FaultReason {
    fn from(byte: u8) -> Self {
        use FaultReason::*;
        match byte {
            0x01 => StackOverflow,
            0x02 => StackUnderflow,
            0x03 => CallStackOverflow,
            0x04 => CallStackUnderflow,
            0x05 => TypeMismatch,
            0x06 => ModeViolation,
            0x07 => DivideByZero,
            0x08 => Overflow,
            0x09 => InvalidJump,
            0x0a => HostUnavailable,
            0x0b => OpcodeFailed,
            0x0c => MalformedOperand,
            _ => UnknownFaultReason,
        }
    }
}

impl From<NumericError> for FaultReason {
    fn from(error: NumericError) -> Self {
        match error {
            NumericError::Overflow => Self::Overflow,
            NumericError::DivideByZero => Self::DivideByZero,
            NumericError::InvalidDigit { .. } => Self::MalformedOperand,
        }
    }
}
