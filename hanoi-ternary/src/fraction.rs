use crate::{NumericError, NumericResult, T81Big};

use core::{
    cmp::Ordering,
    fmt,
};

/// Exact rational over [`T81Big`].
///
/// The denominator is always positive and the pair is reduced by their
/// greatest common divisor, so equal values have equal representations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct T81Fraction {
    num: T81Big,
    den: T81Big,
}

impl T81Fraction {
    /// Build from numerator and denominator; the denominator must be nonzero.
    pub fn new(num: T81Big, den: T81Big) -> NumericResult<Self> {
        if den.is_zero() {
            return Err(NumericError::DivideByZero)
        }
        let (num, den) = if den.is_negative() {
            (num.neg(), den.neg())
        } else {
            (num, den)
        };
        let divisor = gcd(num.abs(), den.clone());
        if divisor == T81Big::one() {
            Ok(Self { num, den })
        } else {
            Ok(Self {
                num: num.div(&divisor)?,
                den: den.div(&divisor)?,
            })
        }
    }

    /// Whole value as a fraction over one.
    pub fn from_integer(value: T81Big) -> Self {
        Self {
            num: value,
            den: T81Big::one(),
        }
    }

    /// Reduced numerator.
    pub const fn numerator(&self) -> &T81Big {
        &self.num
    }

    /// Reduced (positive) denominator.
    pub const fn denominator(&self) -> &T81Big {
        &self.den
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// Whether the value is exactly one.
    pub fn is_one(&self) -> bool {
        self.num == self.den
    }

    /// Sum of the operands.
    pub fn add(&self, other: &Self) -> NumericResult<Self> {
        Self::new(
            self.num
                .mul(&other.den)
                .add(&other.num.mul(&self.den)),
            self.den.mul(&other.den),
        )
    }

    /// Difference of the operands.
    pub fn sub(&self, other: &Self) -> NumericResult<Self> {
        self.add(&other.neg())
    }

    /// Product of the operands.
    pub fn mul(&self, other: &Self) -> NumericResult<Self> {
        Self::new(self.num.mul(&other.num), self.den.mul(&other.den))
    }

    /// Quotient of the operands; fails when `other` is zero.
    pub fn div(&self, other: &Self) -> NumericResult<Self> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero)
        }
        Self::new(self.num.mul(&other.den), self.den.mul(&other.num))
    }

    /// Negation.
    pub fn neg(&self) -> Self {
        Self {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Self {
            num: self.num.abs(),
            den: self.den.clone(),
        }
    }

    /// Three-way compare as a signed unit: −1, 0 or +1.
    pub fn cmp3(&self, other: &Self) -> i8 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }
}

impl Ord for T81Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // denominators are positive, cross-multiplication preserves order
        self.num.mul(&other.den).cmp(&other.num.mul(&self.den))
    }
}

impl PartialOrd for T81Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for T81Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Euclidean gcd over non-negative values, at least one of them nonzero.
fn gcd(mut a: T81Big, mut b: T81Big) -> T81Big {
    while !b.is_zero() {
        // divisor positive, so the remainder is non-negative
        let next = match a.rem(&b) {
            Ok(value) => value,
            Err(_) => return b,
        };
        a = b;
        b = next;
    }
    a
}
