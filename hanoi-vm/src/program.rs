//! Bytecode loader and validator
//!
//! Loading streams through the body once, validating every opcode against
//! the core and extension tables and every operand tag against the opcode's
//! signature. On success the program is immutable: the byte sequence, its
//! SHA-256 digest, the printable fingerprint and the opcode index may be
//! shared across threads by reference.

use hanoi_asm::{ExtensionSpec, Opcode, Tag, TagClass, Tier};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    bytecode,
    config::LoadConfig,
    consts::{BYTECODE_VERSION, FINGERPRINT_PREFIX, HEADER_MAGIC, HEADER_SIZE},
    error::LoadError,
    operand::Operand,
};

/// A loaded opcode: core table first, extension table second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeRef {
    /// Member of the core instruction set.
    Core(Opcode),
    /// Resolved through the extension table.
    Extension {
        /// Wire value.
        code: u8,
        /// Mnemonic from the registered spec.
        mnemonic: &'static str,
        /// Minimum tier from the registered spec.
        tier: Tier,
    },
}

impl OpcodeRef {
    /// Wire value of the opcode.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Core(op) => op.code(),
            Self::Extension { code, .. } => *code,
        }
    }

    /// Mnemonic as rendered by the disassembler.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Core(op) => op.mnemonic(),
            Self::Extension { mnemonic, .. } => mnemonic,
        }
    }

    /// Minimum tier the opcode executes at.
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Core(op) => op.tier(),
            Self::Extension { tier, .. } => *tier,
        }
    }

    /// The core opcode, when this is one.
    pub const fn core(&self) -> Option<Opcode> {
        match self {
            Self::Core(op) => Some(*op),
            Self::Extension { .. } => None,
        }
    }
}

/// One decoded instruction of the opcode index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Body offset of the opcode byte.
    pub offset: usize,
    /// Resolved opcode.
    pub opcode: OpcodeRef,
    /// Decoded immediate operands, in wire order.
    pub operands: Vec<Operand>,
    /// Encoded length of the whole instruction.
    pub len: usize,
}

/// An immutable, validated program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    bytes: Vec<u8>,
    digest: [u8; 32],
    fingerprint: String,
    index: Vec<IndexEntry>,
}

impl Program {
    /// Load and validate a bytecode blob, headered or raw.
    pub fn load(bytes: &[u8], config: &LoadConfig) -> Result<Self, LoadError> {
        let body = strip_header(bytes)?;
        if body.len() > config.program_size_limit {
            return Err(LoadError::ProgramTooLarge {
                size: body.len(),
                limit: config.program_size_limit,
            })
        }

        let mut index = Vec::new();
        let mut offset = 0;
        while offset < body.len() {
            let start = offset;
            let byte = body[offset];
            offset += 1;

            let (opcode, signature) = resolve(byte, config).ok_or(
                LoadError::UnknownOpcode {
                    byte,
                    offset: start,
                },
            )?;

            let mut operands = Vec::with_capacity(signature.len());
            for class in signature {
                let tag_offset = offset;
                let tag_byte = *body
                    .get(offset)
                    .ok_or(LoadError::Truncated(body.len()))?;
                let tag = Tag::try_from(tag_byte).map_err(|_| {
                    LoadError::MalformedOperand {
                        tag: tag_byte,
                        offset: tag_offset,
                        reason: "unrecognized tag",
                    }
                })?;
                if !class.admits(tag) {
                    return Err(LoadError::TagMismatch {
                        mnemonic: opcode.mnemonic(),
                        tag: tag_byte,
                        offset: tag_offset,
                    })
                }
                operands.push(bytecode::decode_operand(body, &mut offset)?);
            }

            index.push(IndexEntry {
                offset: start,
                opcode,
                operands,
                len: offset - start,
            });
        }

        let digest: [u8; 32] = Sha256::digest(body).into();
        let fingerprint =
            format!("{FINGERPRINT_PREFIX}{}", hex::encode(&digest[..14]));
        debug!(
            bytes = body.len(),
            instructions = index.len(),
            %fingerprint,
            "program loaded"
        );

        Ok(Self {
            bytes: body.to_vec(),
            digest,
            fingerprint,
            index,
        })
    }

    /// Load, additionally checking the body digest against the caller's.
    pub fn load_expecting(
        bytes: &[u8],
        config: &LoadConfig,
        expected: &[u8; 32],
    ) -> Result<Self, LoadError> {
        let program = Self::load(bytes, config)?;
        if &program.digest != expected {
            return Err(LoadError::DigestMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(program.digest),
            })
        }
        Ok(program)
    }

    /// Validated body bytes, header stripped.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 digest of the body.
    pub const fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Printable `HVM-` fingerprint derived from the digest; stable across
    /// loads of the same body.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Decoded instruction index, ordered by offset.
    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    /// Index entry starting exactly at `offset`.
    pub fn entry_at(&self, offset: usize) -> Option<&IndexEntry> {
        self.index
            .binary_search_by_key(&offset, |entry| entry.offset)
            .ok()
            .map(|position| &self.index[position])
    }

    /// Whether `offset` is a legal control-transfer target: an instruction
    /// boundary or the terminal offset.
    pub fn is_boundary(&self, offset: usize) -> bool {
        offset == self.bytes.len() || self.entry_at(offset).is_some()
    }
}

fn resolve<'a>(
    byte: u8,
    config: &'a LoadConfig,
) -> Option<(OpcodeRef, &'a [TagClass])> {
    if let Ok(op) = Opcode::try_from(byte) {
        return Some((OpcodeRef::Core(op), op.signature()))
    }
    config.extensions.get(byte).map(|spec: &ExtensionSpec| {
        (
            OpcodeRef::Extension {
                code: spec.code,
                mnemonic: spec.mnemonic,
                tier: spec.tier,
            },
            spec.signature.as_slice(),
        )
    })
}

fn strip_header(bytes: &[u8]) -> Result<&[u8], LoadError> {
    if bytes.len() < HEADER_SIZE || bytes[..4] != HEADER_MAGIC {
        return Ok(bytes)
    }
    let declared = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != BYTECODE_VERSION {
        return Err(LoadError::InvalidHeader("unsupported version"))
    }
    let body = &bytes[HEADER_SIZE..];
    if body.len() as u32 != declared {
        return Err(LoadError::InvalidHeader("length field disagrees with body"))
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprints_are_stable_and_prefixed() {
        let bytes = [0x00, 0xff];
        let config = LoadConfig::default();
        let first = Program::load(&bytes, &config).unwrap();
        let second = Program::load(&bytes, &config).unwrap();
        assert_eq!(first.digest(), second.digest());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert!(first.fingerprint().starts_with(FINGERPRINT_PREFIX));
        assert_eq!(first.fingerprint().len(), 32);
    }

    #[test]
    fn headered_and_raw_bodies_agree() {
        let body = [0x00u8, 0x00, 0xff];
        let mut headered = Vec::new();
        headered.extend_from_slice(&HEADER_MAGIC);
        headered.extend_from_slice(&(body.len() as u32).to_le_bytes());
        headered.extend_from_slice(&BYTECODE_VERSION.to_le_bytes());
        headered.extend_from_slice(&body);

        let config = LoadConfig::default();
        let raw = Program::load(&body, &config).unwrap();
        let wrapped = Program::load(&headered, &config).unwrap();
        assert_eq!(raw.digest(), wrapped.digest());
        assert_eq!(raw.bytes(), wrapped.bytes());
    }

    #[test]
    fn header_inconsistencies_are_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&HEADER_MAGIC);
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&BYTECODE_VERSION.to_le_bytes());
        bytes.push(0xff);
        assert_eq!(
            Program::load(&bytes, &LoadConfig::default()),
            Err(LoadError::InvalidHeader("length field disagrees with body"))
        );
    }
}
