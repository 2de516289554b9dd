use hanoi_asm::FaultReason;
use hanoi_ternary::{T81Big, T81Float, T81Fraction};

use crate::{
    error::SimpleResult,
    operand::Operand,
    state::ExecuteState,
};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn op_add(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(add_values)
    }

    pub(crate) fn op_sub(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(sub_values)
    }

    pub(crate) fn op_mul(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(mul_values)
    }

    pub(crate) fn op_div(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(div_values)
    }

    pub(crate) fn op_mod(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(mod_values)
    }

    pub(crate) fn op_cmp3(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.binary_op(cmp3_values)
    }

    pub(crate) fn op_neg(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.unary_op(neg_value)
    }

    pub(crate) fn op_abs(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.unary_op(abs_value)
    }

    /// Pop `b` then `a`, push `apply(a, b)`.
    ///
    /// On any failure the popped operands go back in their original order,
    /// so a faulting instruction never leaves the stack ill-formed.
    fn binary_op(
        &mut self,
        apply: fn(&Operand, &Operand) -> SimpleResult<Operand>,
    ) -> SimpleResult<ExecuteState> {
        let b = self.pop_operand()?;
        let a = match self.pop_operand() {
            Ok(a) => a,
            Err(reason) => {
                self.restore([b]);
                return Err(reason)
            }
        };
        match apply(&a, &b) {
            Ok(result) => match self.push_operand(result) {
                Ok(()) => Ok(ExecuteState::Proceed),
                Err(reason) => {
                    self.restore([a, b]);
                    Err(reason)
                }
            },
            Err(reason) => {
                self.restore([a, b]);
                Err(reason)
            }
        }
    }

    fn unary_op(
        &mut self,
        apply: fn(&Operand) -> SimpleResult<Operand>,
    ) -> SimpleResult<ExecuteState> {
        let a = self.pop_operand()?;
        match apply(&a) {
            Ok(result) => match self.push_operand(result) {
                Ok(()) => Ok(ExecuteState::Proceed),
                Err(reason) => {
                    self.restore([a]);
                    Err(reason)
                }
            },
            Err(reason) => {
                self.restore([a]);
                Err(reason)
            }
        }
    }
}

/// Matched numeric views of an operand pair; mixing shapes is a type fault.
enum NumericPair {
    Ints(T81Big, T81Big),
    Fractions(T81Fraction, T81Fraction),
    Floats(T81Float, T81Float),
}

fn numeric_pair(a: &Operand, b: &Operand) -> SimpleResult<NumericPair> {
    match (a, b) {
        (Operand::BigInt(x), Operand::BigInt(y)) => {
            Ok(NumericPair::Ints(x.clone(), y.clone()))
        }
        (
            Operand::Fraction { num: xn, den: xd },
            Operand::Fraction { num: yn, den: yd },
        ) => Ok(NumericPair::Fractions(
            T81Fraction::new(xn.clone(), xd.clone())?,
            T81Fraction::new(yn.clone(), yd.clone())?,
        )),
        (
            Operand::Float { mantissa: xm, exponent: xe },
            Operand::Float { mantissa: ym, exponent: ye },
        ) => Ok(NumericPair::Floats(
            T81Float::new(xm.clone(), *xe),
            T81Float::new(ym.clone(), *ye),
        )),
        _ => Err(FaultReason::TypeMismatch),
    }
}

fn fraction_operand(value: T81Fraction) -> Operand {
    Operand::Fraction {
        num: value.numerator().clone(),
        den: value.denominator().clone(),
    }
}

fn float_operand(value: T81Float) -> Operand {
    Operand::Float {
        mantissa: value.mantissa().clone(),
        exponent: value.exponent(),
    }
}

fn add_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    match numeric_pair(a, b)? {
        NumericPair::Ints(x, y) => Ok(Operand::BigInt(x.add(&y))),
        NumericPair::Fractions(x, y) => Ok(fraction_operand(x.add(&y)?)),
        NumericPair::Floats(x, y) => Ok(float_operand(x.add(&y))),
    }
}

fn sub_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    match numeric_pair(a, b)? {
        NumericPair::Ints(x, y) => Ok(Operand::BigInt(x.sub(&y))),
        NumericPair::Fractions(x, y) => Ok(fraction_operand(x.sub(&y)?)),
        NumericPair::Floats(x, y) => Ok(float_operand(x.sub(&y))),
    }
}

fn mul_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    match numeric_pair(a, b)? {
        NumericPair::Ints(x, y) => Ok(Operand::BigInt(x.mul(&y))),
        NumericPair::Fractions(x, y) => Ok(fraction_operand(x.mul(&y)?)),
        NumericPair::Floats(x, y) => Ok(float_operand(x.mul(&y)?)),
    }
}

fn div_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    match numeric_pair(a, b)? {
        NumericPair::Ints(x, y) => Ok(Operand::BigInt(x.div(&y)?)),
        NumericPair::Fractions(x, y) => Ok(fraction_operand(x.div(&y)?)),
        NumericPair::Floats(x, y) => Ok(float_operand(x.div(&y)?)),
    }
}

fn mod_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    match numeric_pair(a, b)? {
        // the remainder carries the divisor's sign
        NumericPair::Ints(x, y) => Ok(Operand::BigInt(x.rem(&y)?)),
        _ => Err(FaultReason::TypeMismatch),
    }
}

fn cmp3_values(a: &Operand, b: &Operand) -> SimpleResult<Operand> {
    let ordering = match numeric_pair(a, b)? {
        NumericPair::Ints(x, y) => x.cmp3(&y),
        NumericPair::Fractions(x, y) => x.cmp3(&y),
        NumericPair::Floats(x, y) => x.cmp3(&y),
    };
    Ok(Operand::BigInt(T81Big::from_i64(i64::from(ordering))))
}

fn neg_value(a: &Operand) -> SimpleResult<Operand> {
    match a {
        Operand::BigInt(x) => Ok(Operand::BigInt(x.neg())),
        Operand::Fraction { num, den } => {
            Ok(fraction_operand(T81Fraction::new(num.clone(), den.clone())?.neg()))
        }
        Operand::Float { mantissa, exponent } => {
            Ok(float_operand(T81Float::new(mantissa.clone(), *exponent).neg()))
        }
        _ => Err(FaultReason::TypeMismatch),
    }
}

fn abs_value(a: &Operand) -> SimpleResult<Operand> {
    match a {
        Operand::BigInt(x) => Ok(Operand::BigInt(x.abs())),
        Operand::Fraction { num, den } => {
            Ok(fraction_operand(T81Fraction::new(num.clone(), den.clone())?.abs()))
        }
        Operand::Float { mantissa, exponent } => {
            Ok(float_operand(T81Float::new(mantissa.clone(), *exponent).abs()))
        }
        _ => Err(FaultReason::TypeMismatch),
    }
}
