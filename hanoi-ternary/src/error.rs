use core::fmt;

/// Failure modes of the ternary numeric layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumericError {
    /// The result does not fit the requested width.
    Overflow,
    /// The divisor evaluated to zero.
    DivideByZero,
    /// A digit value is outside the range of its width.
    InvalidDigit {
        /// Radix of the digit width (81, 243 or 729).
        radix: u16,
        /// The offending value.
        value: u16,
    },
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "numeric overflow"),
            Self::DivideByZero => write!(f, "division by zero"),
            Self::InvalidDigit { radix, value } => {
                write!(f, "invalid base-{radix} digit: {value}")
            }
        }
    }
}

impl std::error::Error for NumericError {}
