use hanoi_asm::{FaultReason, Opcode};
use hanoi_ternary::T81Big;

use crate::{
    error::SimpleResult,
    host::{HostError, IntentOutcome},
    operand::Operand,
    state::ExecuteState,
    symbolic::{intent_modifiers, T243MarkovMatrix, T729Intent, T729MetaOpcode},
};

use super::Interpreter;

impl Interpreter {
    /// Advance the resident state vector by the immediate signal.
    pub(crate) fn op_t243_state_adv(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let signal = self.signal_class(operands)?;
        let next = self.symbolic.step(signal);
        self.note_summary(next);
        Ok(ExecuteState::Proceed)
    }

    /// Deterministic Markov transition from the immediate state.
    pub(crate) fn op_t243_markov_step(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let state = self.signal_class(operands)?;
        if self.symbolic.markov.is_none() {
            self.symbolic.markov = Some(T243MarkovMatrix::uniform());
        }
        let next = match &self.symbolic.markov {
            Some(matrix) => matrix.step(state),
            None => state,
        };
        self.symbolic.state = next;
        self.push_operand(Operand::BigInt(T81Big::from_i64(i64::from(next))))?;
        Ok(ExecuteState::Proceed)
    }

    /// Emit the immediate symbol id through the trace sink.
    pub(crate) fn op_t243_symbol_out(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let Some(Operand::BigInt(symbol)) = operands.first() else {
            return Err(FaultReason::TypeMismatch)
        };
        self.note_summary((symbol.magnitude_clamped() & 0xff) as u8);
        Ok(ExecuteState::Proceed)
    }

    /// Advance the symbolic circuit by one tick (signal 0).
    pub(crate) fn op_t243_circuit_step(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let next = self.symbolic.step(0);
        self.note_summary(next);
        Ok(ExecuteState::Proceed)
    }

    /// Push the morphic tag of the stack top: its wire tag folded with the
    /// symbolic state.
    pub(crate) fn op_t243_morphic_tag(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let top = self.stack.last().ok_or(FaultReason::StackUnderflow)?;
        let tag = top.tag().code();
        let morphic = u64::from(tag) * 9 + u64::from(self.symbolic.state % 9);
        self.push_operand(Operand::BigInt(T81Big::from_i64(morphic as i64)))?;
        Ok(ExecuteState::Proceed)
    }

    /// Dispatch the immediate opcode literal as an intent.
    ///
    /// The host gets the first offer; when it defers, the carried opcode is
    /// executed in place, provided it takes no immediates.
    pub(crate) fn op_t729_intent(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let Some(Operand::Opcode(code)) = operands.first() else {
            return Err(FaultReason::TypeMismatch)
        };
        let intent = T729Intent {
            opcode: *code,
            modifiers: intent_modifiers(self.stack.last()),
            entropy_weight: T81Big::from_i64(self.symbolic.entropy_accum as i64),
        };
        match self.host().intent(&intent) {
            Ok(IntentOutcome::Handled(Some(value))) => {
                self.push_operand(value)?;
                Ok(ExecuteState::Proceed)
            }
            Ok(IntentOutcome::Handled(None)) => Ok(ExecuteState::Proceed),
            Ok(IntentOutcome::Defer) => self.execute_inline(intent.opcode),
            Err(HostError::Unavailable) => Err(FaultReason::HostUnavailable),
            Err(HostError::Failed(_)) => Err(FaultReason::OpcodeFailed),
        }
    }

    /// Pop an opcode literal and execute it as a meta-opcode stamped with
    /// the symbolic state.
    pub(crate) fn op_t729_meta_exec(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let literal = self.pop_operand()?;
        let Operand::Opcode(code) = &literal else {
            self.restore([literal]);
            return Err(FaultReason::TypeMismatch)
        };
        let meta = T729MetaOpcode {
            state_fingerprint: self.symbolic.state_vector(),
            base_opcode: *code,
            condition_mask: T81Big::from_i64(i64::from(self.symbolic.state % 3)),
        };
        match self.execute_inline(meta.base_opcode) {
            Ok(state) => Ok(state),
            Err(reason) => {
                self.restore([literal]);
                Err(reason)
            }
        }
    }

    /// Record an entropy snapshot of the context.
    pub(crate) fn op_t729_entropy_snap(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let depth = self.stack.len() as u64;
        let peak = self
            .stack
            .iter()
            .map(Operand::magnitude_hint)
            .max()
            .unwrap_or(0);
        self.symbolic.entropy_accum = self
            .symbolic
            .entropy_accum
            .rotate_left(8)
            .wrapping_add(peak)
            .wrapping_add(depth);
        self.note_summary((peak & 0xff) as u8);
        Ok(ExecuteState::Proceed)
    }

    /// Semantic lookup of the immediate query vector through the host.
    pub(crate) fn op_t729_mindmap_query(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let Some(query @ Operand::Vector(_)) = operands.first() else {
            return Err(FaultReason::TypeMismatch)
        };
        match self.host().mindmap_query(query) {
            Ok(value) => {
                self.push_operand(value)?;
                Ok(ExecuteState::Proceed)
            }
            Err(HostError::Unavailable) => Err(FaultReason::HostUnavailable),
            Err(HostError::Failed(_)) => Err(FaultReason::OpcodeFailed),
        }
    }

    /// Execute a carried opcode in place; only immediate-less core opcodes
    /// qualify, and the tier guard still applies.
    fn execute_inline(&mut self, code: u8) -> SimpleResult<ExecuteState> {
        let op = Opcode::try_from(code).map_err(|_| FaultReason::OpcodeFailed)?;
        if !op.signature().is_empty() {
            return Err(FaultReason::OpcodeFailed)
        }
        if self.tier < op.tier() {
            return Err(FaultReason::ModeViolation)
        }
        let handler =
            Self::core_dispatch(op.code()).ok_or(FaultReason::OpcodeFailed)?;
        handler(self, &[])
    }

    /// Reduce a BIGINT immediate to one of the 243 signal classes.
    fn signal_class(&self, operands: &[Operand]) -> SimpleResult<u8> {
        let Some(Operand::BigInt(value)) = operands.first() else {
            return Err(FaultReason::TypeMismatch)
        };
        let class = value.rem(&T81Big::from_i64(243))?;
        // divisor positive, remainder in 0..243
        let class = class.to_i64().map_err(|_| FaultReason::Overflow)?;
        Ok(class as u8)
    }
}
