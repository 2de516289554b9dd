//! Typed operand layer
//!
//! A discriminated variant over every operand shape the wire format knows,
//! with validating constructors and the pretty renderings used by the
//! disassembler. The wire tag byte is the discriminant; there are no
//! implicit conversions between shapes.

use hanoi_asm::{Opcode, Tag, Tier};
use hanoi_ternary::T81Big;

use itertools::Itertools;

use core::fmt;

use crate::consts::{MAX_TENSOR_RANK, T81_MAX};

/// A §4.2 shape-rule violation, attributed to the offending tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandViolation {
    /// Tag of the rejected operand.
    pub tag: Tag,
    /// Violated rule.
    pub reason: &'static str,
}

impl OperandViolation {
    const fn new(tag: Tag, reason: &'static str) -> Self {
        Self { tag, reason }
    }
}

impl fmt::Display for OperandViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed {}: {}", self.tag, self.reason)
    }
}

/// Row-major matrix of tagged cells; `rows·cols == cells.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    rows: u8,
    cols: u8,
    cells: Vec<Operand>,
}

impl Matrix {
    /// Build a matrix, checking the shape against the cell count.
    pub fn new(rows: u8, cols: u8, cells: Vec<Operand>) -> Result<Self, OperandViolation> {
        if usize::from(rows) * usize::from(cols) != cells.len() {
            return Err(OperandViolation::new(
                Tag::Matrix,
                "rows·cols differs from the cell count",
            ))
        }
        Ok(Self { rows, cols, cells })
    }

    /// Row count.
    pub const fn rows(&self) -> u8 {
        self.rows
    }

    /// Column count.
    pub const fn cols(&self) -> u8 {
        self.cols
    }

    /// Row-major cell view.
    pub fn cells(&self) -> &[Operand] {
        &self.cells
    }

    /// Cell at `(row, col)`.
    pub fn get(&self, row: u8, col: u8) -> Option<&Operand> {
        if row >= self.rows || col >= self.cols {
            return None
        }
        self.cells
            .get(usize::from(row) * usize::from(self.cols) + usize::from(col))
    }
}

/// Ordered sequence of tagged elements, at most 255 of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector(Vec<Operand>);

impl Vector {
    /// Build a vector, checking the wire length bound.
    pub fn new(elements: Vec<Operand>) -> Result<Self, OperandViolation> {
        if elements.len() > 255 {
            return Err(OperandViolation::new(Tag::Vector, "more than 255 elements"))
        }
        Ok(Self(elements))
    }

    /// Element view.
    pub fn elements(&self) -> &[Operand] {
        &self.0
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ranked tensor with a flat data sequence of length `∏shape`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tensor {
    shape: Vec<u8>,
    data: Vec<Operand>,
}

impl Tensor {
    /// Build a tensor, checking rank, dimensions and the data length.
    pub fn new(shape: Vec<u8>, data: Vec<Operand>) -> Result<Self, OperandViolation> {
        if shape.is_empty() || shape.len() > MAX_TENSOR_RANK {
            return Err(OperandViolation::new(Tag::Tensor, "rank outside 1..=8"))
        }
        if shape.iter().any(|&dim| dim == 0) {
            return Err(OperandViolation::new(Tag::Tensor, "zero dimension"))
        }
        let volume: u64 = shape.iter().map(|&dim| u64::from(dim)).product();
        if volume != data.len() as u64 {
            return Err(OperandViolation::new(
                Tag::Tensor,
                "data length differs from the shape product",
            ))
        }
        Ok(Self { shape, data })
    }

    /// Dimension sizes.
    pub fn shape(&self) -> &[u8] {
        &self.shape
    }

    /// Flat data view.
    pub fn data(&self) -> &[Operand] {
        &self.data
    }

    /// Size of the last axis.
    pub fn last_axis(&self) -> usize {
        self.shape.last().map(|&dim| usize::from(dim)).unwrap_or(0)
    }
}

/// Coefficients indexed by degree, constant term first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polynomial(Vec<Operand>);

impl Polynomial {
    /// Build a polynomial, checking the wire length bound.
    pub fn new(coefficients: Vec<Operand>) -> Result<Self, OperandViolation> {
        if coefficients.len() > 255 {
            return Err(OperandViolation::new(
                Tag::Polynomial,
                "more than 255 coefficients",
            ))
        }
        Ok(Self(coefficients))
    }

    /// Coefficient view, constant term first.
    pub fn coefficients(&self) -> &[Operand] {
        &self.0
    }

    /// Degree of the polynomial; the empty polynomial has degree 0.
    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

/// Node count plus an edge list of index pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Graph {
    nodes: u8,
    edges: Vec<(u8, u8)>,
}

impl Graph {
    /// Build a graph, checking every edge endpoint against the node count.
    pub fn new(nodes: u8, edges: Vec<(u8, u8)>) -> Result<Self, OperandViolation> {
        if edges.len() > 255 {
            return Err(OperandViolation::new(Tag::Graph, "more than 255 edges"))
        }
        if edges.iter().any(|&(u, v)| u >= nodes || v >= nodes) {
            return Err(OperandViolation::new(
                Tag::Graph,
                "edge endpoint outside the node range",
            ))
        }
        Ok(Self { nodes, edges })
    }

    /// Node count.
    pub const fn nodes(&self) -> u8 {
        self.nodes
    }

    /// Edge view.
    pub fn edges(&self) -> &[(u8, u8)] {
        &self.edges
    }
}

/// Four-component quaternion of base-81 integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    /// x component.
    pub x: T81Big,
    /// y component.
    pub y: T81Big,
    /// z component.
    pub z: T81Big,
    /// w component.
    pub w: T81Big,
}

impl Quaternion {
    /// Build from the four components.
    pub const fn new(x: T81Big, y: T81Big, z: T81Big, w: T81Big) -> Self {
        Self { x, y, z, w }
    }

    /// Component view in `(x, y, z, w)` order.
    pub fn components(&self) -> [&T81Big; 4] {
        [&self.x, &self.y, &self.z, &self.w]
    }
}

/// A tagged operand: one stack value or instruction immediate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Arbitrary-precision base-81 integer.
    BigInt(T81Big),
    /// Numerator/denominator pair; the denominator is nonzero but the pair
    /// is kept exactly as it appeared on the wire.
    Fraction {
        /// Numerator.
        num: T81Big,
        /// Denominator, nonzero.
        den: T81Big,
    },
    /// Mantissa and base-81 exponent, kept as encoded.
    Float {
        /// Mantissa.
        mantissa: T81Big,
        /// Base-81 exponent.
        exponent: i8,
    },
    /// Row-major matrix.
    Matrix(Matrix),
    /// Ordered element sequence.
    Vector(Vector),
    /// Ranked tensor.
    Tensor(Tensor),
    /// Coefficient sequence.
    Polynomial(Polynomial),
    /// Index-pair edge list.
    Graph(Graph),
    /// Four-component quaternion.
    Quaternion(Quaternion),
    /// Nested opcode literal.
    Opcode(u8),
}

impl Operand {
    /// Wire tag of the operand.
    pub const fn tag(&self) -> Tag {
        match self {
            Self::BigInt(_) => Tag::Bigint,
            Self::Fraction { .. } => Tag::Fraction,
            Self::Float { .. } => Tag::Float,
            Self::Matrix(_) => Tag::Matrix,
            Self::Vector(_) => Tag::Vector,
            Self::Tensor(_) => Tag::Tensor,
            Self::Polynomial(_) => Tag::Polynomial,
            Self::Graph(_) => Tag::Graph,
            Self::Quaternion(_) => Tag::Quaternion,
            Self::Opcode(_) => Tag::Opcode,
        }
    }

    /// Re-check the §4.2 shape rules, recursively.
    ///
    /// Constructors already validate; this is the invariant check used by
    /// tests and by `push` for values produced at runtime.
    pub fn validate(&self) -> Result<(), OperandViolation> {
        match self {
            Self::BigInt(value) => {
                if value.digits().len() > 255 {
                    Err(OperandViolation::new(Tag::Bigint, "more than 255 digits"))
                } else {
                    Ok(())
                }
            }
            Self::Fraction { den, .. } => {
                if den.is_zero() {
                    Err(OperandViolation::new(Tag::Fraction, "zero denominator"))
                } else {
                    Ok(())
                }
            }
            Self::Float { .. } => Ok(()),
            Self::Matrix(matrix) => {
                Matrix::new(matrix.rows, matrix.cols, matrix.cells.clone())?;
                matrix.cells.iter().try_for_each(Operand::validate)
            }
            Self::Vector(vector) => {
                Vector::new(vector.0.clone())?;
                vector.0.iter().try_for_each(Operand::validate)
            }
            Self::Tensor(tensor) => {
                Tensor::new(tensor.shape.clone(), tensor.data.clone())?;
                tensor.data.iter().try_for_each(Operand::validate)
            }
            Self::Polynomial(poly) => {
                Polynomial::new(poly.0.clone())?;
                poly.0.iter().try_for_each(Operand::validate)
            }
            Self::Graph(graph) => {
                Graph::new(graph.nodes, graph.edges.clone()).map(|_| ())
            }
            Self::Quaternion(_) | Self::Opcode(_) => Ok(()),
        }
    }

    /// Magnitude observed by the tier FSM, clamped to the host word range.
    ///
    /// Containers report the maximum over their elements.
    pub fn magnitude_hint(&self) -> u64 {
        match self {
            Self::BigInt(value) => value.magnitude_clamped(),
            Self::Fraction { num, .. } => num.magnitude_clamped(),
            Self::Float { mantissa, .. } => mantissa.magnitude_clamped(),
            Self::Matrix(matrix) => max_magnitude(&matrix.cells),
            Self::Vector(vector) => max_magnitude(&vector.0),
            Self::Tensor(tensor) => max_magnitude(&tensor.data),
            Self::Polynomial(poly) => max_magnitude(&poly.0),
            Self::Graph(graph) => u64::from(graph.nodes),
            Self::Quaternion(quat) => quat
                .components()
                .iter()
                .map(|c| c.magnitude_clamped())
                .max()
                .unwrap_or(0),
            Self::Opcode(code) => u64::from(*code),
        }
    }

    /// Lowest tier the operand is at home in; pins demotion.
    ///
    /// Tensors belong to T729; matrices and wide integers to T243;
    /// everything else rides along at T81.
    pub fn tier_floor(&self) -> Tier {
        match self {
            Self::Tensor(_) => Tier::T729,
            Self::Matrix(_) => Tier::T243,
            Self::BigInt(value) if value.magnitude_clamped() >= T81_MAX => Tier::T243,
            _ => Tier::T81,
        }
    }
}

fn max_magnitude(operands: &[Operand]) -> u64 {
    operands
        .iter()
        .map(Operand::magnitude_hint)
        .max()
        .unwrap_or(0)
}

impl From<T81Big> for Operand {
    fn from(value: T81Big) -> Self {
        Self::BigInt(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::BigInt(T81Big::from_i64(value))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigInt(value) => write!(f, "BIGINT({value})"),
            Self::Fraction { num, den } => write!(f, "FRACTION({num}/{den})"),
            Self::Float { mantissa, exponent } => {
                write!(f, "FLOAT({mantissa}e{exponent})")
            }
            Self::Matrix(matrix) => write!(
                f,
                "MATRIX[{}×{}]{{{}}}",
                matrix.rows,
                matrix.cols,
                matrix.cells.iter().join(", "),
            ),
            Self::Vector(vector) => {
                write!(f, "VECTOR[{}]{{{}}}", vector.len(), vector.0.iter().join(", "))
            }
            Self::Tensor(tensor) => write!(
                f,
                "TENSOR[{}]{{{}}}",
                tensor.shape.iter().join("×"),
                tensor.data.iter().join(", "),
            ),
            Self::Polynomial(poly) => write!(
                f,
                "POLYNOMIAL[deg={}]{{{}}}",
                poly.degree(),
                poly.0.iter().join(", "),
            ),
            Self::Graph(graph) => write!(
                f,
                "GRAPH[n={}]{{{}}}",
                graph.nodes,
                graph
                    .edges
                    .iter()
                    .map(|(u, v)| format!("({u},{v})"))
                    .join(", "),
            ),
            Self::Quaternion(quat) => write!(
                f,
                "QUATERNION({}, {}, {}, {})",
                quat.x, quat.y, quat.z, quat.w
            ),
            Self::Opcode(code) => match Opcode::try_from(*code) {
                Ok(op) => write!(f, "OPCODE({op})"),
                Err(_) => write!(f, "OPCODE(0x{code:02X})"),
            },
        }
    }
}
