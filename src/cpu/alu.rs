//! Arithmetic/logic unit.
//!
//! Pure register-to-register operations with fixed-width semantics: every
//! result is reduced mod 256 rather than overflow-trapped.

use crate::cpu::decode::Opcode;
use crate::cpu::registers::Registers;
use thiserror::Error;

/// Apply an arithmetic operation in place: `reg[dest] op= reg[src]`.
///
/// Only the arithmetic opcodes are valid here; routing anything else into
/// the ALU is a dispatch bug and aborts the run.
pub fn apply(regs: &mut Registers, op: Opcode, dest: u8, src: u8) -> Result<(), AluError> {
    match op {
        Opcode::Add => {
            let result = regs.get(dest).wrapping_add(regs.get(src));
            regs.set(dest, result);
            Ok(())
        }
        Opcode::Mul => {
            let result = regs.get(dest).wrapping_mul(regs.get(src));
            regs.set(dest, result);
            Ok(())
        }
        other => Err(AluError::UnsupportedOperation(other)),
    }
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("unsupported ALU operation: {0}")]
    UnsupportedOperation(Opcode),
}
