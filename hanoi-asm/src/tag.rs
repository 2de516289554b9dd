use core::fmt;

/// Wire tag byte identifying the shape of a tagged operand.
///
/// Tags are part of the bytecode format and are round-trip-preserved by the
/// codec; the numeric values are fixed for compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Tag {
    /// Arbitrary-precision base-81 integer.
    Bigint = 0x01,
    /// Numerator/denominator pair.
    Fraction = 0x02,
    /// Mantissa and base-81 exponent.
    Float = 0x03,
    /// Row-major matrix of tagged cells.
    Matrix = 0x04,
    /// Ordered sequence of tagged elements.
    Vector = 0x05,
    /// Ranked tensor with a flat data sequence.
    Tensor = 0x06,
    /// Coefficients indexed by degree.
    Polynomial = 0x07,
    /// Node count plus an index-pair edge list.
    Graph = 0x08,
    /// Four-component quaternion.
    Quaternion = 0x09,
    /// Nested opcode literal.
    Opcode = 0x0a,
}

/// Raw byte that does not name a [`Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTag(pub u8);

impl Tag {
    /// Wire value of the tag.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case wire name, as rendered by the disassembler.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bigint => "BIGINT",
            Self::Fraction => "FRACTION",
            Self::Float => "FLOAT",
            Self::Matrix => "MATRIX",
            Self::Vector => "VECTOR",
            Self::Tensor => "TENSOR",
            Self::Polynomial => "POLYNOMIAL",
            Self::Graph => "GRAPH",
            Self::Quaternion => "QUATERNION",
            Self::Opcode => "OPCODE",
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = InvalidTag;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Self::Bigint),
            0x02 => Ok(Self::Fraction),
            0x03 => Ok(Self::Float),
            0x04 => Ok(Self::Matrix),
            0x05 => Ok(Self::Vector),
            0x06 => Ok(Self::Tensor),
            0x07 => Ok(Self::Polynomial),
            0x08 => Ok(Self::Graph),
            0x09 => Ok(Self::Quaternion),
            0x0a => Ok(Self::Opcode),
            _ => Err(InvalidTag(byte)),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn byte_round_trip() {
        for tag in Tag::iter() {
            assert_eq!(Tag::try_from(tag.code()), Ok(tag));
        }
        assert_eq!(Tag::try_from(0x00), Err(InvalidTag(0x00)));
        assert_eq!(Tag::try_from(0x0b), Err(InvalidTag(0x0b)));
    }
}
