use crate::{NumericError, NumericResult};

use core::{fmt, ops::Neg};

/// A single balanced-ternary digit.
///
/// The wire format of the VM is unsigned; [`Trit::to_unsigned`] and
/// [`Trit::from_unsigned`] are the total, round-trippable bridge between
/// the balanced {−1, 0, +1} and unsigned {0, 1, 2} views (`u = t mod 3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum Trit {
    /// −1
    N = -1,
    /// 0
    #[default]
    Z = 0,
    /// +1
    P = 1,
}

impl Trit {
    /// Signed value of the trit.
    pub const fn to_i8(self) -> i8 {
        self as i8
    }

    /// Build from a signed value in {−1, 0, +1}.
    pub const fn from_i8(value: i8) -> NumericResult<Self> {
        match value {
            -1 => Ok(Self::N),
            0 => Ok(Self::Z),
            1 => Ok(Self::P),
            _ => Err(NumericError::InvalidDigit {
                radix: 3,
                value: value.unsigned_abs() as u16,
            }),
        }
    }

    /// Unsigned residue of the trit, `t mod 3`.
    pub const fn to_unsigned(self) -> u8 {
        match self {
            Self::N => 2,
            Self::Z => 0,
            Self::P => 1,
        }
    }

    /// Inverse of [`Trit::to_unsigned`].
    pub const fn from_unsigned(value: u8) -> NumericResult<Self> {
        match value {
            0 => Ok(Self::Z),
            1 => Ok(Self::P),
            2 => Ok(Self::N),
            _ => Err(NumericError::InvalidDigit {
                radix: 3,
                value: value as u16,
            }),
        }
    }
}

impl Neg for Trit {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::N => Self::P,
            Self::Z => Self::Z,
            Self::P => Self::N,
        }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::N => write!(f, "-"),
            Self::Z => write!(f, "0"),
            Self::P => write!(f, "+"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_round_trip_is_total() {
        for u in 0u8..3 {
            let t = Trit::from_unsigned(u).unwrap();
            assert_eq!(t.to_unsigned(), u);
        }
        for s in [-1i8, 0, 1] {
            let t = Trit::from_i8(s).unwrap();
            assert_eq!(t.to_i8(), s);
        }
        assert!(Trit::from_unsigned(3).is_err());
        assert!(Trit::from_i8(2).is_err());
    }

    #[test]
    fn negation_mirrors() {
        assert_eq!(-Trit::P, Trit::N);
        assert_eq!(-Trit::N, Trit::P);
        assert_eq!(-Trit::Z, Trit::Z);
    }
}
