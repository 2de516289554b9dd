use crate::{NumericError, NumericResult, T81Big};

use core::{
    cmp::Ordering,
    fmt,
};

/// Base-81 floating value: `mantissa · 81^exponent`.
///
/// Normalization strips factors of 81 out of the mantissa into the exponent,
/// and zero is pinned to exponent 0, so equal values compare equal
/// structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct T81Float {
    mantissa: T81Big,
    exponent: i8,
}

impl T81Float {
    /// Build and normalize.
    pub fn new(mantissa: T81Big, exponent: i8) -> Self {
        let mut out = Self { mantissa, exponent };
        out.normalize();
        out
    }

    /// The zero value.
    pub fn zero() -> Self {
        Self {
            mantissa: T81Big::zero(),
            exponent: 0,
        }
    }

    /// Mantissa view.
    pub const fn mantissa(&self) -> &T81Big {
        &self.mantissa
    }

    /// Base-81 exponent.
    pub const fn exponent(&self) -> i8 {
        self.exponent
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Sum of the operands.
    pub fn add(&self, other: &Self) -> Self {
        let (a, b, exponent) = Self::align(self, other);
        Self::new(a.add(&b), exponent)
    }

    /// Difference of the operands.
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Product of the operands; fails when the exponent leaves `i8`.
    pub fn mul(&self, other: &Self) -> NumericResult<Self> {
        let exponent = self
            .exponent
            .checked_add(other.exponent)
            .ok_or(NumericError::Overflow)?;
        Ok(Self::new(self.mantissa.mul(&other.mantissa), exponent))
    }

    /// Quotient of the operands, floored on the aligned mantissas.
    pub fn div(&self, other: &Self) -> NumericResult<Self> {
        if other.is_zero() {
            return Err(NumericError::DivideByZero)
        }
        let (a, b, _) = Self::align(self, other);
        Ok(Self::new(a.div(&b)?, 0))
    }

    /// Negation.
    pub fn neg(&self) -> Self {
        Self {
            mantissa: self.mantissa.neg(),
            exponent: self.exponent,
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
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

    /// Scale both mantissas to the smaller exponent.
    fn align(a: &Self, b: &Self) -> (T81Big, T81Big, i8) {
        let exponent = a.exponent.min(b.exponent);
        let lift_a = (i32::from(a.exponent) - i32::from(exponent)) as usize;
        let lift_b = (i32::from(b.exponent) - i32::from(exponent)) as usize;
        (
            a.mantissa.shift_radix_up(lift_a),
            b.mantissa.shift_radix_up(lift_b),
            exponent,
        )
    }

    fn normalize(&mut self) {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return
        }
        while self.mantissa.lowest_digit() == 0 && self.exponent < i8::MAX {
            self.mantissa = self.mantissa.shift_radix_down();
            self.exponent += 1;
        }
    }
}

impl Ord for T81Float {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = Self::align(self, other);
        a.cmp(&b)
    }
}

impl PartialOrd for T81Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for T81Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.mantissa, self.exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(mantissa: i64, exponent: i8) -> T81Float {
        T81Float::new(T81Big::from_i64(mantissa), exponent)
    }

    #[test]
    fn normalization_strips_radix_factors() {
        // 81 · 81^0 == 1 · 81^1
        assert_eq!(float(81, 0), float(1, 1));
        assert_eq!(float(81, 0).exponent(), 1);
        assert_eq!(float(0, 5), T81Float::zero());
    }

    #[test]
    fn addition_aligns_exponents() {
        // 2·81 + 3 = 165
        assert_eq!(float(2, 1).add(&float(3, 0)), float(165, 0));
        assert_eq!(float(1, 0).sub(&float(1, 0)), T81Float::zero());
    }

    #[test]
    fn multiplication_checks_exponent_range() {
        assert_eq!(float(2, 3).mul(&float(3, 4)).unwrap(), float(6, 7));
        assert_eq!(
            float(1, 100).mul(&float(1, 100)),
            Err(NumericError::Overflow)
        );
    }

    #[test]
    fn division_rejects_zero() {
        assert_eq!(float(6, 0).div(&float(2, 0)).unwrap(), float(3, 0));
        assert_eq!(
            float(1, 0).div(&T81Float::zero()),
            Err(NumericError::DivideByZero)
        );
    }

    #[test]
    fn ordering_is_value_based() {
        assert_eq!(float(1, 1).cmp3(&float(80, 0)), 1);
        assert_eq!(float(-1, 1).cmp3(&float(-80, 0)), -1);
        assert_eq!(float(81, 0).cmp3(&float(1, 1)), 0);
    }
}
