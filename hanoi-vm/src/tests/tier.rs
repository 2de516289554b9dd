use hanoi_asm::{FaultReason, Tier};

use std::sync::Arc;

use crate::{
    config::InterpreterParams,
    interpreter::Interpreter,
    operand::{Operand, Tensor},
    state::ProgramState,
    tests::{int, load, vm_with_ring, ProgramBuilder},
};

#[test]
fn t243_opcodes_fault_in_t81() {
    // T243_STATE_ADV straight from the base tier
    let bytes = ProgramBuilder::new()
        .op_with(0x30, &[int(1)])
        .op(0xff)
        .build();
    let (mut vm, ring) = vm_with_ring(&bytes);
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::ModeViolation)
    );
    assert_eq!(ring.named("T243_STATE_ADV_MODE").len(), 1);
    assert!(ring.named("MODE_CHANGE").is_empty());
}

#[test]
fn t729_opcodes_at_t243_promote_instead_of_faulting() {
    let bytes = ProgramBuilder::new().op(0x36).op(0xff).build();
    let ring = Arc::new(crate::trace::RingSink::new(64));
    let mut vm = Interpreter::new(
        load(&bytes),
        InterpreterParams {
            initial_tier: Tier::T243,
            ..InterpreterParams::default()
        },
    )
    .with_sink(Arc::clone(&ring) as Arc<dyn crate::trace::TraceSink>);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.tier(), Tier::T729);
    assert_eq!(ring.named("MODE_CHANGE").len(), 1);
    // the snapshot itself still ran
    assert_eq!(ring.named("T729_ENTROPY_SNAP").len(), 1);
}

#[test]
fn magnitude_promotions_climb_one_tier_at_a_time() {
    // 81·81 = 6561 at T81: one promotion per observation, not a leap
    let bytes = ProgramBuilder::new()
        .push_int(80)
        .push_int(80)
        .op(0x05) // 6400 ≥ 81: T81 → T243
        .push_int(80)
        .op(0x05) // 512000 ≥ 243: T243 → T729
        .op(0xff)
        .build();
    let (mut vm, ring) = vm_with_ring(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.tier(), Tier::T729);
    assert_eq!(ring.named("MODE_CHANGE").len(), 2);
}

#[test]
fn pinned_operands_block_demotion() {
    // a tensor on the stack pins T729 through the unwind
    let tensor = Operand::Tensor(
        Tensor::new(vec![1], vec![int(0)]).unwrap(),
    );
    // main: PUSH (7 bytes), CALL F1, HALT. F1 at 12: RET.
    let bytes = ProgramBuilder::new()
        .op_with(0x01, &[tensor.clone()])
        .op_with(0x13, &[int(12)])
        .op(0xff)
        .op(0x14)
        .build();
    let mut vm = Interpreter::new(
        load(&bytes),
        InterpreterParams {
            initial_tier: Tier::T729,
            ..InterpreterParams::default()
        },
    );
    assert_eq!(vm.run(), ProgramState::Completed);
    // depth fell below the threshold but the tensor holds the tier
    assert_eq!(vm.tier(), Tier::T729);
    assert_eq!(vm.stack(), &[tensor]);
}

#[test]
fn demotion_descends_when_nothing_pins() {
    // same shape, but only a small integer on the stack
    let bytes = ProgramBuilder::new()
        .push_int(3)
        .op_with(0x13, &[int(9)])
        .op(0xff)
        .op(0x14)
        .build();
    let mut vm = Interpreter::new(
        load(&bytes),
        InterpreterParams {
            initial_tier: Tier::T729,
            ..InterpreterParams::default()
        },
    );
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.tier(), Tier::T243);
}

#[test]
fn mode_is_stable_between_call_boundaries() {
    // plain arithmetic below the bases never changes mode
    let bytes = ProgramBuilder::new()
        .push_int(10)
        .push_int(20)
        .op(0x03)
        .push_int(2)
        .op(0x05)
        .op(0xff)
        .build();
    let (mut vm, ring) = vm_with_ring(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.tier(), Tier::T81);
    assert_eq!(vm.stack(), &[int(60)]);
    assert!(ring.named("MODE_CHANGE").is_empty());
}
