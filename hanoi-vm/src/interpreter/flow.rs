use hanoi_asm::FaultReason;

use crate::{
    error::SimpleResult,
    operand::Operand,
    state::ExecuteState,
};

use super::Interpreter;

impl Interpreter {
    pub(crate) fn op_jmp(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let target = self.branch_target(operands)?;
        Ok(ExecuteState::Jump(target))
    }

    pub(crate) fn op_jz(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.conditional_jump(operands, true)
    }

    pub(crate) fn op_jnz(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.conditional_jump(operands, false)
    }

    pub(crate) fn op_call(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let target = self.branch_target(operands)?;
        if self.call_stack.len() >= self.params.call_stack_capacity {
            return Err(FaultReason::CallStackOverflow)
        }
        let return_address = self.current_offset + self.current_len;
        self.call_stack.push(return_address);
        self.call_depth += 1;
        self.note_call_edge();
        Ok(ExecuteState::Jump(target))
    }

    pub(crate) fn op_ret(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let return_address = self
            .call_stack
            .pop()
            .ok_or(FaultReason::CallStackUnderflow)?;
        self.call_depth = self.call_depth.saturating_sub(1);
        self.note_return_edge();
        Ok(ExecuteState::Jump(return_address))
    }

    /// Pop the condition, then transfer when its zeroness matches.
    fn conditional_jump(
        &mut self,
        operands: &[Operand],
        jump_on_zero: bool,
    ) -> SimpleResult<ExecuteState> {
        let condition = self.pop_operand()?;
        let Operand::BigInt(value) = &condition else {
            self.restore([condition]);
            return Err(FaultReason::TypeMismatch)
        };
        let is_zero = value.is_zero();
        let taken = is_zero == jump_on_zero;
        if !taken {
            return Ok(ExecuteState::Proceed)
        }
        match self.branch_target(operands) {
            Ok(target) => Ok(ExecuteState::Jump(target)),
            Err(reason) => {
                self.restore([condition]);
                Err(reason)
            }
        }
    }

    /// Resolve a BIGINT immediate into an instruction boundary.
    fn branch_target(&self, operands: &[Operand]) -> SimpleResult<usize> {
        let Some(Operand::BigInt(offset)) = operands.first() else {
            return Err(FaultReason::TypeMismatch)
        };
        let target = offset
            .to_i64()
            .map_err(|_| FaultReason::InvalidJump)?;
        if target < 0 {
            return Err(FaultReason::InvalidJump)
        }
        let target = target as usize;
        if !self.program.is_boundary(target) {
            return Err(FaultReason::InvalidJump)
        }
        Ok(target)
    }
}
