use hanoi_asm::{ExtensionSpec, FaultReason, TagClass, Tier};
use hanoi_ternary::T81Digit;

use std::sync::Arc;

use crate::{
    config::{InterpreterParams, LoadConfig},
    error::{LoadError, SimpleResult},
    interpreter::Interpreter,
    operand::Operand,
    program::Program,
    state::{ExecuteState, ProgramState},
};

fn tick_spec() -> ExtensionSpec {
    ExtensionSpec {
        code: 0x40,
        mnemonic: "REG_TICK",
        tier: Tier::T81,
        signature: Vec::new(),
    }
}

fn reg_tick(vm: &mut Interpreter, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
    let one = T81Digit::new(1).map_err(|_| FaultReason::OpcodeFailed)?;
    let registers = vm.registers_mut();
    registers[0] = registers[0].wrapping_add(one);
    Ok(ExecuteState::Proceed)
}

#[test]
fn unknown_opcodes_consult_the_extension_table() {
    let bytes = [0x40u8, 0x40, 0xff];

    // without a registration the loader rejects the byte
    assert_eq!(
        Program::load(&bytes, &LoadConfig::default()),
        Err(LoadError::UnknownOpcode {
            byte: 0x40,
            offset: 0
        })
    );

    let mut config = LoadConfig::default();
    assert!(config.extensions.register(tick_spec()));
    let program = Program::load(&bytes, &config).unwrap();
    assert_eq!(program.index()[0].opcode.mnemonic(), "REG_TICK");

    let mut vm = Interpreter::new(Arc::new(program), InterpreterParams::default());
    vm.register_extension_handler(0x40, reg_tick);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.registers()[0].value(), 2);
}

#[test]
fn extension_without_a_handler_faults() {
    let bytes = [0x40u8, 0xff];
    let mut config = LoadConfig::default();
    config.extensions.register(tick_spec());
    let program = Program::load(&bytes, &config).unwrap();
    let mut vm = Interpreter::new(Arc::new(program), InterpreterParams::default());
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::OpcodeFailed)
    );
}

#[test]
fn extension_signatures_are_validated_like_core_ones() {
    let mut config = LoadConfig::default();
    config.extensions.register(ExtensionSpec {
        code: 0x41,
        mnemonic: "REG_LOAD",
        tier: Tier::T81,
        signature: vec![TagClass::BigInt],
    });
    // REG_LOAD with an OPCODE literal operand
    let bytes = [0x41u8, 0x0a, 0x00];
    assert_eq!(
        Program::load(&bytes, &config),
        Err(LoadError::TagMismatch {
            mnemonic: "REG_LOAD",
            tag: 0x0a,
            offset: 1,
        })
    );
    // and with a BIGINT it loads
    let ok = [0x41u8, 0x01, 0x01, 0x05, 0xff];
    assert!(Program::load(&ok, &config).is_ok());
}
