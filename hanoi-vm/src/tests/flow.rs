use hanoi_asm::{FaultReason, Tier};

use std::sync::Arc;

use crate::{
    config::{CancelFlag, InterpreterParams},
    interpreter::Interpreter,
    state::ProgramState,
    tests::{int, load, vm, vm_with_ring, ProgramBuilder},
};

#[test]
fn jmp_skips_over_instructions() {
    // 0000: JMP 8 (4 bytes), 0004: PUSH 1 (4 bytes), 0008: HALT
    let bytes = ProgramBuilder::new()
        .op_with(0x10, &[int(8)])
        .push_int(1)
        .op(0xff)
        .build();
    let mut context = vm(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert!(context.stack().is_empty());
}

#[test]
fn jz_and_jnz_pop_their_condition() {
    // JZ taken: PUSH 0, JZ 12, PUSH 7, HALT
    let bytes = ProgramBuilder::new()
        .push_int(0)
        .op_with(0x11, &[int(12)])
        .push_int(7)
        .op(0xff)
        .build();
    let mut context = vm(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert!(context.stack().is_empty());

    // JNZ not taken on zero: the condition is consumed, PUSH runs
    let bytes = ProgramBuilder::new()
        .push_int(0)
        .op_with(0x12, &[int(12)])
        .push_int(7)
        .op(0xff)
        .build();
    let mut context = vm(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert_eq!(context.stack(), &[int(7)]);
}

#[test]
fn call_and_ret_balance_the_depth() {
    // 0000: CALL 9, 0004: PUSH 3, 0008: HALT, 0009: RET
    let bytes = ProgramBuilder::new()
        .op_with(0x13, &[int(9)])
        .push_int(3)
        .op(0xff)
        .op(0x14)
        .build();
    let mut context = vm(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert_eq!(context.stack(), &[int(3)]);
    assert_eq!(context.call_depth(), 0);
    assert!(context.call_stack().is_empty());
}

#[test]
fn jumps_must_land_on_instruction_boundaries() {
    // offset 2 is inside the PUSH immediate
    let bytes = ProgramBuilder::new()
        .push_int(1)
        .op_with(0x10, &[int(2)])
        .op(0xff)
        .build();
    let mut context = vm(&bytes);
    assert_eq!(
        context.run().fault().map(|fault| fault.reason),
        Some(FaultReason::InvalidJump)
    );
}

#[test]
fn jump_to_program_end_terminates() {
    let bytes = ProgramBuilder::new().op_with(0x10, &[int(4)]).build();
    assert_eq!(bytes.len(), 4);
    let mut context = vm(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert!(context.is_halted());
}

#[test]
fn ret_without_call_underflows() {
    let bytes = ProgramBuilder::new().op(0x14).build();
    let mut context = vm(&bytes);
    assert_eq!(
        context.run().fault().map(|fault| fault.reason),
        Some(FaultReason::CallStackUnderflow)
    );
}

#[test]
fn call_stack_capacity_is_enforced() {
    // 0000: CALL 0 — self-recursion with no RET
    let bytes = ProgramBuilder::new().op_with(0x13, &[int(0)]).build();
    let params = InterpreterParams {
        call_stack_capacity: 3,
        // keep the tier FSM quiet while depth climbs
        promote_threshold: usize::MAX,
        ..InterpreterParams::default()
    };
    let mut context = Interpreter::new(load(&bytes), params);
    assert_eq!(
        context.run().fault().map(|fault| fault.reason),
        Some(FaultReason::CallStackOverflow)
    );
    assert_eq!(context.call_depth(), 3);
}

#[test]
fn stack_capacity_is_enforced() {
    // 0000: PUSH 1, 0004: JMP 0
    let bytes = ProgramBuilder::new()
        .push_int(1)
        .op_with(0x10, &[int(0)])
        .build();
    let params = InterpreterParams {
        stack_capacity: 5,
        ..InterpreterParams::default()
    };
    let mut context = Interpreter::new(load(&bytes), params);
    assert_eq!(
        context.run().fault().map(|fault| fault.reason),
        Some(FaultReason::StackOverflow)
    );
    assert_eq!(context.stack().len(), 5);
}

#[test]
fn cancellation_wins_between_instructions() {
    let bytes = ProgramBuilder::new().push_int(1).op(0xff).build();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut context = Interpreter::new(load(&bytes), InterpreterParams::default())
        .with_cancel(cancel);
    assert_eq!(context.run(), ProgramState::Cancelled);
    assert!(context.is_halted());
    assert!(context.stack().is_empty());
}

#[test]
fn continue_on_fault_skips_recoverable_faults() {
    // DIV by zero, then a PUSH that must still run
    let bytes = ProgramBuilder::new()
        .push_int(9)
        .push_int(0)
        .op(0x06)
        .push_int(1)
        .op(0xff)
        .build();
    let params = InterpreterParams {
        continue_on_fault: true,
        ..InterpreterParams::default()
    };
    let mut context = Interpreter::new(load(&bytes), params);
    assert_eq!(context.run(), ProgramState::Completed);
    assert_eq!(
        context.last_fault().map(|fault| fault.reason),
        Some(FaultReason::DivideByZero)
    );
    assert_eq!(context.stack(), &[int(9), int(0), int(1)]);
}

#[test]
fn returning_below_the_demote_threshold_demotes() {
    // main: CALL F1; HALT — then five CALL/RET frames and a leaf RET,
    // 5 bytes per frame, reaching depth 6 before unwinding
    let mut builder = ProgramBuilder::new().op_with(0x13, &[int(5)]).op(0xff);
    for frame in 0..5 {
        builder = builder
            .op_with(0x13, &[int((10 + 5 * frame) as i64)])
            .op(0x14);
    }
    let bytes = builder.op(0x14).build();
    let (mut context, ring) = vm_with_ring(&bytes);
    assert_eq!(context.run(), ProgramState::Completed);
    assert_eq!(context.call_depth(), 0);
    assert_eq!(context.tier(), Tier::T81);
    // one promotion at depth 6, one demotion on the way out
    let changes = ring.named("MODE_CHANGE");
    assert_eq!(changes.len(), 2);
}

#[test]
fn trace_carries_the_session_and_one_event_per_instruction() {
    let bytes = ProgramBuilder::new()
        .push_int(2)
        .push_int(3)
        .op(0x05)
        .op(0xff)
        .build();
    let (mut context, ring) = vm_with_ring(&bytes);
    let session = context.session_id().clone();
    assert_eq!(context.run(), ProgramState::Completed);
    let events = ring.events();
    // PUSH, PUSH, MUL, HALT — and nothing else
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|event| event.session == session));
    assert_eq!(
        events.iter().map(|event| event.op.as_str()).collect::<Vec<_>>(),
        vec!["PUSH", "PUSH", "MUL", "HALT"]
    );
}

#[test]
fn yield_hook_fires_between_instructions() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let bytes = ProgramBuilder::new().push_int(1).op(0x02).op(0xff).build();
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let mut context = Interpreter::new(load(&bytes), InterpreterParams::default())
        .with_yield_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
    assert_eq!(context.run(), ProgramState::Completed);
    // once before each of PUSH, POP, HALT
    assert_eq!(ticks.load(Ordering::Relaxed), 3);
}

#[test]
fn session_defaults_to_the_fingerprint() {
    let bytes = ProgramBuilder::new().op(0xff).build();
    let program = load(&bytes);
    let context = Interpreter::new(Arc::clone(&program), InterpreterParams::default());
    assert_eq!(context.session_id().as_str(), program.fingerprint());
}
