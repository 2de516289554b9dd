//! Symbolic tier data layer
//!
//! The T243 and T729 structures live outside the wire format: the FSM state
//! vector and its transition tables are context-resident, the Markov matrix
//! is injected, and the holotensor/intent/meta-opcode types are built by
//! handlers from stack and immediate operands.

use hanoi_ternary::{T243Digit, T81Big, T81Fraction};

use core::fmt;

use crate::{
    consts::T243_STATES,
    operand::{Operand, Tensor, Vector},
};

/// Shape violations of the symbolic structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolicError {
    /// The Markov matrix is not 243×243.
    NotSquare,
    /// A Markov row does not sum to exactly one.
    RowNotStochastic {
        /// Index of the offending row.
        row: usize,
    },
    /// The holotensor parts disagree in shape.
    ShapeMismatch,
}

impl fmt::Display for SymbolicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare => write!(f, "matrix is not 243×243"),
            Self::RowNotStochastic { row } => {
                write!(f, "row {row} does not sum to one")
            }
            Self::ShapeMismatch => write!(f, "real and imaginary shapes differ"),
        }
    }
}

impl std::error::Error for SymbolicError {}

/// Handle into the context's transition-table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableHandle(pub usize);

/// Dense 243×243 transition table: `(state, signal) → state`.
#[derive(Clone, PartialEq, Eq)]
pub struct TransitionTable {
    entries: Vec<u8>,
}

impl TransitionTable {
    /// Materialize a table from a transition function.
    pub fn from_fn(transition: impl Fn(u8, u8) -> u8) -> Self {
        let mut entries = Vec::with_capacity(T243_STATES * T243_STATES);
        for state in 0..T243_STATES as u8 {
            for signal in 0..T243_STATES as u8 {
                entries.push(transition(state, signal) % T243_STATES as u8);
            }
        }
        Self { entries }
    }

    /// The default rotation table: `next = 3·state + signal (mod 243)`.
    pub fn rotation() -> Self {
        Self::from_fn(|state, signal| {
            ((3 * u16::from(state) + u16::from(signal)) % T243_STATES as u16) as u8
        })
    }

    /// Transition from `state` under `signal`.
    pub fn step(&self, state: u8, signal: u8) -> u8 {
        let row = usize::from(state) % T243_STATES;
        let col = usize::from(signal) % T243_STATES;
        self.entries[row * T243_STATES + col]
    }
}

impl fmt::Debug for TransitionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The symbolic FSM register: current state plus its transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct T243StateVector {
    /// Current state, one of the 243.
    pub current: T243Digit,
    /// Which arena table drives transitions.
    pub table: TableHandle,
}

/// Row-stochastic 243×243 matrix of exact fractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct T243MarkovMatrix {
    rows: Vec<Vec<T81Fraction>>,
}

impl T243MarkovMatrix {
    /// Build from rows, checking squareness and that each row sums to one.
    pub fn new(rows: Vec<Vec<T81Fraction>>) -> Result<Self, SymbolicError> {
        if rows.len() != T243_STATES
            || rows.iter().any(|row| row.len() != T243_STATES)
        {
            return Err(SymbolicError::NotSquare)
        }
        for (index, row) in rows.iter().enumerate() {
            let mut sum = T81Fraction::from_integer(T81Big::zero());
            for cell in row {
                sum = sum
                    .add(cell)
                    .map_err(|_| SymbolicError::RowNotStochastic { row: index })?;
            }
            if !sum.is_one() {
                return Err(SymbolicError::RowNotStochastic { row: index })
            }
        }
        Ok(Self { rows })
    }

    /// The uniform matrix: every transition equally likely.
    pub fn uniform() -> Self {
        let cell = T81Fraction::new(
            T81Big::one(),
            T81Big::from_i64(T243_STATES as i64),
        )
        .unwrap_or_else(|_| T81Fraction::from_integer(T81Big::zero()));
        Self {
            rows: vec![vec![cell; T243_STATES]; T243_STATES],
        }
    }

    /// Deterministic step: `argmax_j row[state][j]`, smallest index on ties.
    pub fn step(&self, state: u8) -> u8 {
        let row = &self.rows[usize::from(state) % T243_STATES];
        let mut best = 0usize;
        for (index, cell) in row.iter().enumerate().skip(1) {
            // strictly greater keeps the smallest index on ties
            if cell.cmp3(&row[best]) > 0 {
                best = index;
            }
        }
        best as u8
    }

    /// Row view.
    pub fn row(&self, state: u8) -> &[T81Fraction] {
        &self.rows[usize::from(state) % T243_STATES]
    }
}

/// Paired (real, imaginary) tensors with a phase vector over the last axis.
#[derive(Debug, Clone, PartialEq)]
pub struct T729HoloTensor {
    /// Real part.
    pub real: Tensor,
    /// Imaginary part, same shape as the real part.
    pub imag: Tensor,
    /// Phase quanta, one per last-axis position.
    pub phase: Vec<T81Big>,
}

impl T729HoloTensor {
    /// Pair two tensors, checking shape agreement; the phase starts zeroed.
    pub fn new(real: Tensor, imag: Tensor) -> Result<Self, SymbolicError> {
        if real.shape() != imag.shape() {
            return Err(SymbolicError::ShapeMismatch)
        }
        let phase = vec![T81Big::zero(); real.last_axis()];
        Ok(Self { real, imag, phase })
    }
}

/// A dispatchable intent: an opcode with modifiers and an entropy weight.
#[derive(Debug, Clone, PartialEq)]
pub struct T729Intent {
    /// Carried opcode byte.
    pub opcode: u8,
    /// Modifier operands, drawn from the stack top when present.
    pub modifiers: Vector,
    /// Entropy accumulator at dispatch time.
    pub entropy_weight: T81Big,
}

/// A meta-opcode: a base opcode stamped with the symbolic state.
#[derive(Debug, Clone, PartialEq)]
pub struct T729MetaOpcode {
    /// Symbolic FSM snapshot at construction.
    pub state_fingerprint: T243StateVector,
    /// The opcode to execute.
    pub base_opcode: u8,
    /// Execution condition derived from the state.
    pub condition_mask: T81Big,
}

/// Intent modifiers drawn from the stack top: a vector is carried along,
/// anything else contributes none.
pub fn intent_modifiers(top: Option<&Operand>) -> Vector {
    match top {
        Some(Operand::Vector(vector)) => vector.clone(),
        _ => Vector::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_table_is_total() {
        let table = TransitionTable::rotation();
        assert_eq!(table.step(0, 0), 0);
        assert_eq!(table.step(0, 7), 7);
        assert_eq!(table.step(1, 0), 3);
        assert_eq!(table.step(100, 5), ((300u32 + 5) % 243) as u8);
        // out-of-range inputs wrap instead of panicking
        assert_eq!(table.step(243, 243), 0);
    }

    #[test]
    fn markov_rows_must_be_stochastic() {
        assert!(T243MarkovMatrix::new(Vec::new()).is_err());
        let matrix = T243MarkovMatrix::uniform();
        assert_eq!(matrix.step(0), 0);
        assert_eq!(matrix.step(242), 0);
    }

    #[test]
    fn markov_argmax_breaks_ties_low() {
        let mut rows = T243MarkovMatrix::uniform().rows;
        // state 5: concentrate mass on column 9
        let heavy = T81Fraction::new(T81Big::from_i64(2), T81Big::from_i64(243))
            .unwrap();
        let light = T81Fraction::new(T81Big::one(), T81Big::from_i64(243)).unwrap();
        rows[5] = vec![light; T243_STATES];
        rows[5][9] = heavy.clone();
        rows[5][0] = T81Fraction::new(T81Big::zero(), T81Big::one()).unwrap();
        let matrix = T243MarkovMatrix::new(rows).unwrap();
        assert_eq!(matrix.step(5), 9);
    }

    #[test]
    fn holotensor_shapes_must_agree() {
        let cell = Operand::from(0i64);
        let a = Tensor::new(vec![2, 3], vec![cell.clone(); 6]).unwrap();
        let b = Tensor::new(vec![3, 2], vec![cell.clone(); 6]).unwrap();
        assert_eq!(
            T729HoloTensor::new(a.clone(), b),
            Err(SymbolicError::ShapeMismatch)
        );
        let paired = T729HoloTensor::new(a.clone(), a).unwrap();
        assert_eq!(paired.phase.len(), 3);
    }
}
