//! Whole-VM tests: loader, dispatcher, tier FSM and trace accounting.

mod encoding;
mod extension;
mod flow;
mod symbolic;
mod tier;

use std::sync::Arc;

use crate::{
    bytecode::encode_operand,
    config::{InterpreterParams, LoadConfig},
    interpreter::Interpreter,
    operand::Operand,
    program::Program,
    trace::RingSink,
};

/// Byte-level program builder for tests.
pub(crate) struct ProgramBuilder {
    bytes: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append a bare opcode byte.
    pub fn op(mut self, code: u8) -> Self {
        self.bytes.push(code);
        self
    }

    /// Append an opcode byte followed by encoded immediates.
    pub fn op_with(mut self, code: u8, operands: &[Operand]) -> Self {
        self.bytes.push(code);
        for operand in operands {
            encode_operand(operand, &mut self.bytes).expect("encodable operand");
        }
        self
    }

    /// Append `PUSH BIGINT(value)`.
    pub fn push_int(self, value: i64) -> Self {
        self.op_with(0x01, &[Operand::from(value)])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub(crate) fn load(bytes: &[u8]) -> Arc<Program> {
    Arc::new(Program::load(bytes, &LoadConfig::default()).expect("valid program"))
}

pub(crate) fn vm(bytes: &[u8]) -> Interpreter {
    Interpreter::new(load(bytes), InterpreterParams::default())
}

pub(crate) fn vm_with_ring(bytes: &[u8]) -> (Interpreter, Arc<RingSink>) {
    let ring = Arc::new(RingSink::new(4096));
    let vm = Interpreter::new(load(bytes), InterpreterParams::default())
        .with_sink(Arc::clone(&ring) as Arc<dyn crate::trace::TraceSink>);
    (vm, ring)
}

pub(crate) fn int(value: i64) -> Operand {
    Operand::from(value)
}
