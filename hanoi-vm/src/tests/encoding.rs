use quickcheck_macros::quickcheck;

use crate::{
    config::LoadConfig,
    disasm::{assemble, disassemble},
    error::LoadError,
    operand::{Matrix, Operand, Vector},
    program::Program,
    tests::{int, ProgramBuilder},
};

#[test]
fn the_size_limit_is_exact() {
    let config = LoadConfig::default();
    let at_limit = vec![0x00u8; config.program_size_limit];
    assert!(Program::load(&at_limit, &config).is_ok());

    let over = vec![0x00u8; config.program_size_limit + 1];
    assert_eq!(
        Program::load(&over, &config),
        Err(LoadError::ProgramTooLarge {
            size: config.program_size_limit + 1,
            limit: config.program_size_limit,
        })
    );
}

#[test]
fn operand_tags_must_match_the_signature() {
    // JMP with a MATRIX operand
    let matrix = Operand::Matrix(Matrix::new(1, 1, vec![int(0)]).unwrap());
    let bytes = ProgramBuilder::new().op_with(0x10, &[matrix]).build();
    assert_eq!(
        Program::load(&bytes, &LoadConfig::default()),
        Err(LoadError::TagMismatch {
            mnemonic: "JMP",
            tag: 0x04,
            offset: 1,
        })
    );
}

#[test]
fn truncated_instructions_are_rejected() {
    // PUSH announcing a 3-digit run with only one digit present
    assert!(matches!(
        Program::load(&[0x01, 0x01, 0x03, 0x07], &LoadConfig::default()),
        Err(LoadError::Truncated(_))
    ));
    // opcode expecting an operand at the very end
    assert!(matches!(
        Program::load(&[0x00, 0x01], &LoadConfig::default()),
        Err(LoadError::Truncated(_))
    ));
}

#[test]
fn digest_expectations_are_checked() {
    let bytes = ProgramBuilder::new().op(0xff).build();
    let config = LoadConfig::default();
    let program = Program::load(&bytes, &config).unwrap();
    let digest = *program.digest();

    assert!(Program::load_expecting(&bytes, &config, &digest).is_ok());

    let mut wrong = digest;
    wrong[0] ^= 0xff;
    assert!(matches!(
        Program::load_expecting(&bytes, &config, &wrong),
        Err(LoadError::DigestMismatch { .. })
    ));
}

#[test]
fn the_index_mirrors_the_stream() {
    let bytes = ProgramBuilder::new()
        .push_int(7)
        .op(0x03)
        .op(0xff)
        .build();
    let program = Program::load(&bytes, &LoadConfig::default()).unwrap();
    let offsets: Vec<usize> =
        program.index().iter().map(|entry| entry.offset).collect();
    assert_eq!(offsets, vec![0, 4, 5]);
    assert_eq!(program.entry_at(4).unwrap().opcode.mnemonic(), "ADD");
    assert_eq!(program.entry_at(3), None);
    assert!(program.is_boundary(5));
    assert!(program.is_boundary(6)); // terminal offset
    assert!(!program.is_boundary(7));
}

#[quickcheck]
fn the_loader_never_panics(bytes: Vec<u8>) -> bool {
    // arbitrary byte strings produce a typed error or a valid program
    let _ = Program::load(&bytes, &LoadConfig::default());
    true
}

#[quickcheck]
fn push_programs_are_stable_under_reassembly(values: Vec<i32>) -> bool {
    let mut builder = ProgramBuilder::new();
    for value in &values {
        builder = builder.push_int(i64::from(*value));
    }
    let bytes = builder.op(0xff).build();
    let program = match Program::load(&bytes, &LoadConfig::default()) {
        Ok(program) => program,
        Err(_) => return false,
    };
    assemble(&disassemble(&program)).ok() == Some(bytes)
}

#[quickcheck]
fn decoded_operands_survive_the_index(values: Vec<i8>) -> bool {
    // vectors of small ints exercise the nested decoder
    let elements: Vec<Operand> =
        values.iter().map(|&value| int(i64::from(value))).collect();
    if elements.len() > 255 {
        return true
    }
    let vector = Operand::Vector(Vector::new(elements.clone()).unwrap());
    let bytes = ProgramBuilder::new().op_with(0x01, &[vector.clone()]).build();
    let program = match Program::load(&bytes, &LoadConfig::default()) {
        Ok(program) => program,
        Err(_) => return false,
    };
    program.index()[0].operands == vec![vector]
}
