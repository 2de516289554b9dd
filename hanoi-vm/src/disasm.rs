//! Type-aware disassembler
//!
//! The structural view mirrors what the loader accepts: one record per
//! index entry, carrying the raw bytes and the decoded operands. The
//! textual form is deterministic so tests can pin it, and `assemble`
//! reproduces the loaded body byte for byte.

use itertools::Itertools;

use core::fmt;

use crate::{
    bytecode,
    error::LoadError,
    operand::Operand,
    program::Program,
};

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Body offset of the instruction.
    pub addr: usize,
    /// Opcode byte.
    pub code: u8,
    /// Mnemonic of the resolved opcode.
    pub mnemonic: &'static str,
    /// Raw instruction bytes, opcode included.
    pub raw: Vec<u8>,
    /// Decoded immediate operands, in wire order.
    pub operands: Vec<Operand>,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: {:<24}{}", self.addr, hex::encode(&self.raw), self.mnemonic)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.iter().join(", "))?;
        }
        Ok(())
    }
}

/// Structured disassembly of a whole program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Disassembly {
    lines: Vec<Line>,
}

impl Disassembly {
    /// Line view, in address order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Disassemble a loaded program.
pub fn disassemble(program: &Program) -> Disassembly {
    let lines = program
        .index()
        .iter()
        .map(|entry| Line {
            addr: entry.offset,
            code: entry.opcode.code(),
            mnemonic: entry.opcode.mnemonic(),
            raw: program.bytes()[entry.offset..entry.offset + entry.len].to_vec(),
            operands: entry.operands.clone(),
        })
        .collect();
    Disassembly { lines }
}

/// Re-encode a disassembly into a raw bytecode body.
///
/// For every loaded program `P`, `assemble(&disassemble(&P))` equals the
/// body of `P` byte for byte.
pub fn assemble(disassembly: &Disassembly) -> Result<Vec<u8>, LoadError> {
    let mut out = Vec::new();
    for line in &disassembly.lines {
        out.push(line.code);
        for operand in &line.operands {
            bytecode::encode_operand(operand, &mut out)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;

    #[test]
    fn rendering_is_pinned() {
        // PUSH BIGINT(7); HALT
        let bytes = [0x01, 0x01, 0x01, 0x07, 0xff];
        let program = Program::load(&bytes, &LoadConfig::default()).unwrap();
        let text = disassemble(&program).to_string();
        assert_eq!(text, "0000: 01010107                PUSH BIGINT(7)\n0004: ff                      HALT\n");
    }

    #[test]
    fn assembly_reproduces_the_body() {
        let bytes = [
            0x01, 0x01, 0x01, 0x07, // PUSH BIGINT(7)
            0x01, 0x01, 0x01, 0x05, // PUSH BIGINT(5)
            0x03, // ADD
            0xff, // HALT
        ];
        let program = Program::load(&bytes, &LoadConfig::default()).unwrap();
        let assembled = assemble(&disassemble(&program)).unwrap();
        assert_eq!(assembled, bytes);
    }
}
