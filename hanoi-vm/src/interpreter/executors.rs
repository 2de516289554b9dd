use hanoi_asm::FaultReason;

use tracing::debug;

use crate::{
    error::SimpleResult,
    operand::Operand,
    state::{ExecuteState, FaultInfo, ProgramState},
};

use super::Interpreter;

impl Interpreter {
    /// Run until `HALT`, the end of the bytecode, a fault, or cancellation.
    ///
    /// Faults are recorded in the returned [`ProgramState`], never thrown;
    /// the stack snapshot stays readable afterwards. With
    /// `continue_on_fault` set, recoverable faults skip to the next
    /// instruction instead of halting.
    pub fn run(&mut self) -> ProgramState {
        loop {
            if self.cancel.is_cancelled() {
                self.halted = true;
                debug!(session = %self.session_id, "run cancelled");
                return ProgramState::Cancelled
            }
            if self.halted || self.ip >= self.program.len() {
                self.halted = true;
                return ProgramState::Completed
            }
            if let Some(hook) = &self.yield_hook {
                (**hook)();
            }
            match self.step() {
                Ok(_) => {}
                Err(info) => {
                    self.last_fault = Some(info);
                    if self.params.continue_on_fault && info.reason.is_recoverable() {
                        if let Some(entry) = self.program.entry_at(info.offset) {
                            self.ip = entry.offset + entry.len;
                            continue
                        }
                    }
                    self.halted = true;
                    return ProgramState::Faulted(info)
                }
            }
        }
    }

    /// Execute exactly one instruction at the current instruction pointer.
    ///
    /// Emits the instruction's entropy event (fault-suffixed on failure),
    /// applies any tier transitions it caused, and advances `ip` unless the
    /// handler transferred control itself.
    pub fn step(&mut self) -> Result<ExecuteState, FaultInfo> {
        let Some(entry) = self.program.entry_at(self.ip) else {
            // unreachable through validated control flow; a defect guard
            self.emit_fault_event("FLOW", FaultReason::InvalidJump);
            return Err(FaultInfo {
                mnemonic: "FLOW",
                offset: self.ip,
                reason: FaultReason::InvalidJump,
            })
        };
        let entry = entry.clone();
        let mnemonic = entry.opcode.mnemonic();
        let required = entry.opcode.tier();

        self.current_offset = entry.offset;
        self.current_len = entry.len;
        self.written_magnitude = 0;
        self.summary_override = None;

        // a T729 opcode arriving at T243 promotes; any other shortfall is a
        // mode violation
        if let Some(shift) = self.fsm.on_requirement(self.tier, required) {
            self.apply_shift(shift);
        }
        if self.tier < required {
            self.emit_fault_event(mnemonic, FaultReason::ModeViolation);
            return Err(FaultInfo {
                mnemonic,
                offset: entry.offset,
                reason: FaultReason::ModeViolation,
            })
        }

        let handler = match entry.opcode.core() {
            Some(op) => Self::core_dispatch(op.code()),
            None => self.extension_handlers.get(&entry.opcode.code()).copied(),
        };
        let Some(handler) = handler else {
            self.emit_fault_event(mnemonic, FaultReason::OpcodeFailed);
            return Err(FaultInfo {
                mnemonic,
                offset: entry.offset,
                reason: FaultReason::OpcodeFailed,
            })
        };

        match handler(self, &entry.operands) {
            Ok(state) => {
                let summary = self
                    .summary_override
                    .unwrap_or((self.written_magnitude & 0xff) as u8);
                self.sink.event(&self.session_id, mnemonic, summary);
                self.drain_shifts();
                if let Some(shift) =
                    self.fsm.on_magnitude(self.tier, self.written_magnitude)
                {
                    self.apply_shift(shift);
                }
                match state {
                    ExecuteState::Proceed => self.ip = entry.offset + entry.len,
                    ExecuteState::Jump(target) => self.ip = target,
                    ExecuteState::Halt => {
                        self.ip = entry.offset + entry.len;
                        self.halted = true;
                    }
                }
                Ok(state)
            }
            Err(reason) => {
                self.pending_shifts.clear();
                self.emit_fault_event(mnemonic, reason);
                Err(FaultInfo {
                    mnemonic,
                    offset: entry.offset,
                    reason,
                })
            }
        }
    }

    // trivial handlers

    pub(crate) fn op_nop(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        Ok(ExecuteState::Proceed)
    }

    pub(crate) fn op_push(&mut self, operands: &[Operand]) -> SimpleResult<ExecuteState> {
        let operand = operands.first().ok_or(FaultReason::TypeMismatch)?;
        self.push_operand(operand.clone())?;
        Ok(ExecuteState::Proceed)
    }

    pub(crate) fn op_pop(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        self.pop_operand()?;
        Ok(ExecuteState::Proceed)
    }

    pub(crate) fn op_halt(&mut self, _operands: &[Operand]) -> SimpleResult<ExecuteState> {
        Ok(ExecuteState::Halt)
    }
}
