use crate::{Tag, Tier};

use core::fmt;

/// Byte representation of a core opcode.
///
/// The numeric codes are fixed for wire compatibility. Opcodes outside this
/// set are resolvable through an [`crate::ExtensionTable`] at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[repr(u8)]
#[non_exhaustive]
pub enum Opcode {
    /// No operation.
    NOP = 0x00,
    /// Push the immediate tagged operand.
    PUSH = 0x01,
    /// Discard the stack top.
    POP = 0x02,
    /// Pop two values, push their sum.
    ADD = 0x03,
    /// Pop two values, push their difference.
    SUB = 0x04,
    /// Pop two values, push their product.
    MUL = 0x05,
    /// Pop two values, push their floored quotient.
    DIV = 0x06,
    /// Pop two values, push the remainder (divisor's sign).
    MOD = 0x07,
    /// Negate the stack top.
    NEG = 0x08,
    /// Absolute value of the stack top.
    ABS = 0x09,
    /// Pop two values, push −1/0/+1.
    CMP3 = 0x0a,
    /// Unconditional jump to the immediate offset.
    JMP = 0x10,
    /// Pop a condition, jump when it is zero.
    JZ = 0x11,
    /// Pop a condition, jump when it is nonzero.
    JNZ = 0x12,
    /// Push the return address and jump.
    CALL = 0x13,
    /// Pop the return address and jump back.
    RET = 0x14,
    /// Element-wise saturating accumulate of the two immediates.
    TNN_ACCUM = 0x20,
    /// Matrix product of the two immediate matrices.
    T81_MATMUL = 0x21,
    /// Advance the resident state vector by the immediate signal.
    T243_STATE_ADV = 0x30,
    /// Dispatch the immediate opcode literal as an intent.
    T729_INTENT = 0x31,
    /// Radix-3 FFT over the holotensor popped from the stack.
    T729_HOLO_FFT = 0x32,
    /// Pop an opcode literal and execute it as a meta-opcode.
    T729_META_EXEC = 0x33,
    /// Markov transition from the immediate state.
    T243_MARKOV_STEP = 0x34,
    /// Emit the immediate symbol id through the trace sink.
    T243_SYMBOL_OUT = 0x35,
    /// Record an entropy snapshot of the context.
    T729_ENTROPY_SNAP = 0x36,
    /// Advance the symbolic circuit by one tick.
    T243_CIRCUIT_STEP = 0x37,
    /// Push the morphic tag of the stack top.
    T243_MORPHIC_TAG = 0x38,
    /// Semantic lookup of the immediate query vector.
    T729_MINDMAP_QUERY = 0x39,
    /// Terminate execution.
    HALT = 0xff,
}

/// Raw byte that does not name a core [`Opcode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidOpcode(pub u8);

/// Acceptance class for one immediate operand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagClass {
    /// Any recognized tag.
    Any,
    /// BIGINT only.
    BigInt,
    /// MATRIX only.
    Matrix,
    /// VECTOR only.
    Vector,
    /// VECTOR or MATRIX.
    VectorOrMatrix,
    /// Nested opcode literal only.
    OpcodeLiteral,
}

impl TagClass {
    /// Whether the class admits an operand of the given tag.
    pub const fn admits(self, tag: Tag) -> bool {
        match self {
            Self::Any => true,
            Self::BigInt => matches!(tag, Tag::Bigint),
            Self::Matrix => matches!(tag, Tag::Matrix),
            Self::Vector => matches!(tag, Tag::Vector),
            Self::VectorOrMatrix => matches!(tag, Tag::Vector | Tag::Matrix),
            Self::OpcodeLiteral => matches!(tag, Tag::Opcode),
        }
    }
}

impl Opcode {
    /// Wire value of the opcode.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Canonical mnemonic, identical to the disassembler rendering.
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Minimum tier the opcode executes at.
    pub const fn tier(self) -> Tier {
        use Opcode::*;
        match self {
            TNN_ACCUM | T81_MATMUL | T243_STATE_ADV | T243_MARKOV_STEP
            | T243_SYMBOL_OUT | T243_CIRCUIT_STEP | T243_MORPHIC_TAG => Tier::T243,
            T729_INTENT | T729_HOLO_FFT | T729_META_EXEC | T729_ENTROPY_SNAP
            | T729_MINDMAP_QUERY => Tier::T729,
            _ => Tier::T81,
        }
    }

    /// Immediate-operand signature validated by the loader.
    pub const fn signature(self) -> &'static [TagClass] {
        use Opcode::*;
        match self {
            PUSH => &[TagClass::Any],
            JMP | JZ | JNZ | CALL => &[TagClass::BigInt],
            TNN_ACCUM => &[TagClass::VectorOrMatrix, TagClass::VectorOrMatrix],
            T81_MATMUL => &[TagClass::Matrix, TagClass::Matrix],
            T243_STATE_ADV | T243_MARKOV_STEP | T243_SYMBOL_OUT => {
                &[TagClass::BigInt]
            }
            T729_INTENT => &[TagClass::OpcodeLiteral],
            T729_MINDMAP_QUERY => &[TagClass::Vector],
            _ => &[],
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = InvalidOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        match byte {
            0x00 => Ok(NOP),
            0x01 => Ok(PUSH),
            0x02 => Ok(POP),
            0x03 => Ok(ADD),
            0x04 => Ok(SUB),
            0x05 => Ok(MUL),
            0x06 => Ok(DIV),
            0x07 => Ok(MOD),
            0x08 => Ok(NEG),
            0x09 => Ok(ABS),
            0x0a => Ok(CMP3),
            0x10 => Ok(JMP),
            0x11 => Ok(JZ),
            0x12 => Ok(JNZ),
            0x13 => Ok(CALL),
            0x14 => Ok(RET),
            0x20 => Ok(TNN_ACCUM),
            0x21 => Ok(T81_MATMUL),
            0x30 => Ok(T243_STATE_ADV),
            0x31 => Ok(T729_INTENT),
            0x32 => Ok(T729_HOLO_FFT),
            0x33 => Ok(T729_META_EXEC),
            0x34 => Ok(T243_MARKOV_STEP),
            0x35 => Ok(T243_SYMBOL_OUT),
            0x36 => Ok(T729_ENTROPY_SNAP),
            0x37 => Ok(T243_CIRCUIT_STEP),
            0x38 => Ok(T243_MORPHIC_TAG),
            0x39 => Ok(T729_MINDMAP_QUERY),
            0xff => Ok(HALT),
            _ => Err(InvalidOpcode(byte)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
