use hanoi_asm::{FaultReason, Tier};
use hanoi_ternary::{T81Big, T81Fraction};

use std::sync::Arc;

use crate::{
    config::InterpreterParams,
    consts::T243_STATES,
    host::MindMap,
    interpreter::Interpreter,
    operand::{Operand, Vector},
    state::ProgramState,
    symbolic::T243MarkovMatrix,
    tests::{int, load, ProgramBuilder},
};

fn t243_vm(bytes: &[u8]) -> Interpreter {
    Interpreter::new(
        load(bytes),
        InterpreterParams {
            initial_tier: Tier::T243,
            ..InterpreterParams::default()
        },
    )
}

fn t729_vm(bytes: &[u8]) -> Interpreter {
    Interpreter::new(
        load(bytes),
        InterpreterParams {
            initial_tier: Tier::T729,
            ..InterpreterParams::default()
        },
    )
}

#[test]
fn state_adv_walks_the_rotation_table() {
    // two signals: 0 → 3·0+7 = 7, then 3·7+2 = 23
    let bytes = ProgramBuilder::new()
        .op_with(0x30, &[int(7)])
        .op_with(0x30, &[int(2)])
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.symbolic_state(), 23);
    assert!(vm.stack().is_empty());
}

#[test]
fn state_adv_reduces_large_signals() {
    let bytes = ProgramBuilder::new()
        .op_with(0x30, &[int(243 + 7)])
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.symbolic_state(), 7);
}

#[test]
fn markov_step_defaults_to_uniform_smallest_index() {
    let bytes = ProgramBuilder::new()
        .op_with(0x34, &[int(17)])
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    // uniform row: every column ties, the smallest index wins
    assert_eq!(vm.stack(), &[int(0)]);
    assert_eq!(vm.symbolic_state(), 0);
}

#[test]
fn markov_step_follows_an_injected_matrix() {
    let mut rows =
        vec![
            vec![
                T81Fraction::new(T81Big::one(), T81Big::from_i64(T243_STATES as i64))
                    .unwrap();
                T243_STATES
            ];
            T243_STATES
        ];
    // state 4: all mass on column 99
    rows[4] = vec![
        T81Fraction::new(T81Big::zero(), T81Big::one()).unwrap();
        T243_STATES
    ];
    rows[4][99] = T81Fraction::new(T81Big::one(), T81Big::one()).unwrap();
    let matrix = T243MarkovMatrix::new(rows).unwrap();

    let bytes = ProgramBuilder::new()
        .op_with(0x34, &[int(4)])
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    vm.set_markov_matrix(matrix);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.stack(), &[int(99)]);
    assert_eq!(vm.symbolic_state(), 99);
}

#[test]
fn symbol_out_summarizes_the_symbol() {
    let bytes = ProgramBuilder::new()
        .op_with(0x35, &[int(300)])
        .op(0xff)
        .build();
    let (mut vm, ring) = {
        let ring = Arc::new(crate::trace::RingSink::new(64));
        let vm = t243_vm(&bytes)
            .with_sink(Arc::clone(&ring) as Arc<dyn crate::trace::TraceSink>);
        (vm, ring)
    };
    assert_eq!(vm.run(), ProgramState::Completed);
    let events = ring.named("T243_SYMBOL_OUT");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, (300u64 & 0xff) as u8);
}

#[test]
fn circuit_step_ticks_with_signal_zero() {
    let bytes = ProgramBuilder::new()
        .op_with(0x30, &[int(5)]) // state := 5
        .op(0x37) // state := 3·5
        .op(0x37) // state := 3·15
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.symbolic_state(), 45);
}

#[test]
fn morphic_tag_folds_tag_and_state() {
    let bytes = ProgramBuilder::new()
        .push_int(50)
        .op_with(0x30, &[int(4)]) // state := 4
        .op(0x38)
        .op(0xff)
        .build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    // BIGINT tag 0x01 → 9·1 + 4 = 13, pushed above the peeked operand
    assert_eq!(vm.stack(), &[int(50), int(13)]);
}

#[test]
fn morphic_tag_on_an_empty_stack_underflows() {
    let bytes = ProgramBuilder::new().op(0x38).op(0xff).build();
    let mut vm = t243_vm(&bytes);
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::StackUnderflow)
    );
}

#[test]
fn intent_defers_to_inline_execution() {
    // the carried POP executes against the stack
    let bytes = ProgramBuilder::new()
        .push_int(6)
        .op_with(0x31, &[Operand::Opcode(0x02)])
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert!(vm.stack().is_empty());
}

#[test]
fn intent_carrying_an_immediate_opcode_fails() {
    // PUSH cannot ride an intent: it takes an immediate
    let bytes = ProgramBuilder::new()
        .op_with(0x31, &[Operand::Opcode(0x01)])
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes);
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::OpcodeFailed)
    );
}

#[test]
fn meta_exec_pops_its_literal_and_runs_it() {
    // NEG through META_EXEC: [-8] becomes [8]
    let bytes = ProgramBuilder::new()
        .push_int(-8)
        .op_with(0x01, &[Operand::Opcode(0x08)])
        .op(0x33)
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes);
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.stack(), &[int(8)]);
}

#[test]
fn meta_exec_restores_the_literal_on_failure() {
    // the carried ADD underflows the empty stack below the literal
    let bytes = ProgramBuilder::new()
        .op_with(0x01, &[Operand::Opcode(0x03)])
        .op(0x33)
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes);
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::StackUnderflow)
    );
    assert_eq!(vm.stack(), &[Operand::Opcode(0x03)]);
}

#[test]
fn entropy_snap_summarizes_the_stack() {
    let bytes = ProgramBuilder::new()
        .push_int(77)
        .op(0x36)
        .op(0xff)
        .build();
    let ring = Arc::new(crate::trace::RingSink::new(64));
    let mut vm = t729_vm(&bytes)
        .with_sink(Arc::clone(&ring) as Arc<dyn crate::trace::TraceSink>);
    assert_eq!(vm.run(), ProgramState::Completed);
    let events = ring.named("T729_ENTROPY_SNAP");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, 77);
    // the stack is untouched
    assert_eq!(vm.stack(), &[int(77)]);
}

#[test]
fn mindmap_query_walks_the_injected_arena() {
    let mut map = MindMap::new();
    let root = map.insert(T81Big::from_i64(1), int(10));
    let leaf = map.insert(T81Big::from_i64(2), int(20));
    map.link(root, leaf);

    let query = Operand::Vector(Vector::new(vec![int(1), int(2)]).unwrap());
    let bytes = ProgramBuilder::new()
        .op_with(0x39, &[query])
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes).with_host(Arc::new(map));
    assert_eq!(vm.run(), ProgramState::Completed);
    assert_eq!(vm.stack(), &[int(20)]);
}

#[test]
fn mindmap_query_without_a_host_is_unavailable() {
    let query = Operand::Vector(Vector::new(vec![int(1)]).unwrap());
    let bytes = ProgramBuilder::new()
        .op_with(0x39, &[query])
        .op(0xff)
        .build();
    let mut vm = t729_vm(&bytes);
    assert_eq!(
        vm.run().fault().map(|fault| fault.reason),
        Some(FaultReason::HostUnavailable)
    );
    assert!(vm.stack().is_empty());
}
