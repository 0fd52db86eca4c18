//! Instruction decoder.
//!
//! Each instruction is an opcode byte followed by zero, one, or two
//! operand bytes. The opcode byte is structural: bits 7-6 carry the
//! operand count, bit 5 marks ALU-class instructions, and the low bits
//! identify the instruction within its group.

use crate::cpu::registers::NUM_REGISTERS;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The thirteen LS-8 mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Load an immediate into a register.
    Ldi,
    /// Halt execution.
    Hlt,
    /// Print a register as a decimal line.
    Prn,
    /// Multiply two registers.
    Mul,
    /// Push a register onto the stack.
    Push,
    /// Pop the stack into a register.
    Pop,
    /// Call the subroutine whose address is in a register.
    Call,
    /// Return from a subroutine.
    Ret,
    /// Add two registers.
    Add,
    /// Compare two registers.
    Cmp,
    /// Jump if the flags read equal.
    Jeq,
    /// Jump unconditionally.
    Jmp,
    /// Jump if the flags read unequal.
    Jne,
}

impl Opcode {
    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        Ok(match byte {
            0b1000_0010 => Opcode::Ldi,
            0b0000_0001 => Opcode::Hlt,
            0b0100_0111 => Opcode::Prn,
            0b1010_0010 => Opcode::Mul,
            0b0100_0101 => Opcode::Push,
            0b0100_0110 => Opcode::Pop,
            0b0101_0000 => Opcode::Call,
            0b0001_0001 => Opcode::Ret,
            0b1010_0000 => Opcode::Add,
            0b1010_0111 => Opcode::Cmp,
            0b0101_0101 => Opcode::Jeq,
            0b0101_0100 => Opcode::Jmp,
            0b0101_0110 => Opcode::Jne,
            other => return Err(DecodeError::UnknownOpcode(other)),
        })
    }

    /// The opcode byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Ldi => 0b1000_0010,
            Opcode::Hlt => 0b0000_0001,
            Opcode::Prn => 0b0100_0111,
            Opcode::Mul => 0b1010_0010,
            Opcode::Push => 0b0100_0101,
            Opcode::Pop => 0b0100_0110,
            Opcode::Call => 0b0101_0000,
            Opcode::Ret => 0b0001_0001,
            Opcode::Add => 0b1010_0000,
            Opcode::Cmp => 0b1010_0111,
            Opcode::Jeq => 0b0101_0101,
            Opcode::Jmp => 0b0101_0100,
            Opcode::Jne => 0b0101_0110,
        }
    }

    /// Operand count, encoded in the top two bits of the opcode byte.
    pub fn operand_count(self) -> u8 {
        self.to_byte() >> 6
    }

    /// Whether bit 5 marks this as an ALU-class instruction.
    pub fn is_alu(self) -> bool {
        self.to_byte() & 0b0010_0000 != 0
    }

    /// The assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ldi => "LDI",
            Opcode::Hlt => "HLT",
            Opcode::Prn => "PRN",
            Opcode::Mul => "MUL",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Add => "ADD",
            Opcode::Cmp => "CMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jmp => "JMP",
            Opcode::Jne => "JNE",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction.
///
/// Instructions are transient: the engine decodes one per cycle, executes
/// it, and discards it. Register operands are already validated, so the
/// register file can index them unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `reg[reg] = value`
    Ldi { reg: u8, value: u8 },
    /// Emit `reg[reg]` as a decimal line.
    Prn { reg: u8 },
    /// Halt and reset the program counter.
    Hlt,
    /// `reg[a] = reg[a] * reg[b] (mod 256)`
    Mul { a: u8, b: u8 },
    /// `reg[a] = reg[a] + reg[b] (mod 256)`
    Add { a: u8, b: u8 },
    /// Push `reg[reg]` onto the stack.
    Push { reg: u8 },
    /// Pop the top of the stack into `reg[reg]`.
    Pop { reg: u8 },
    /// Push the return address, then jump to `reg[reg]`.
    Call { reg: u8 },
    /// Jump to the address on top of the stack.
    Ret,
    /// Set the flags from the ordering of `reg[a]` and `reg[b]`.
    Cmp { a: u8, b: u8 },
    /// Jump to `reg[reg]` if the flags read equal.
    Jeq { reg: u8 },
    /// Jump to `reg[reg]`.
    Jmp { reg: u8 },
    /// Jump to `reg[reg]` if the flags read unequal.
    Jne { reg: u8 },
}

impl Instruction {
    /// The opcode this instruction decodes from.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Prn { .. } => Opcode::Prn,
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
            Instruction::Cmp { .. } => Opcode::Cmp,
            Instruction::Jeq { .. } => Opcode::Jeq,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jne { .. } => Opcode::Jne,
        }
    }

    /// Instruction size in bytes: the opcode plus its operands.
    pub fn size(&self) -> u8 {
        self.opcode().operand_count() + 1
    }
}

/// Decode one instruction from an opcode byte and its two candidate
/// operand bytes.
///
/// The engine fetches both operand bytes unconditionally; instructions
/// that take fewer simply ignore the rest.
pub fn decode(opcode: u8, operand_a: u8, operand_b: u8) -> Result<Instruction, DecodeError> {
    let op = Opcode::from_byte(opcode)?;
    Ok(match op {
        Opcode::Ldi => Instruction::Ldi {
            reg: reg_operand(operand_a)?,
            value: operand_b,
        },
        Opcode::Prn => Instruction::Prn {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Hlt => Instruction::Hlt,
        Opcode::Mul => Instruction::Mul {
            a: reg_operand(operand_a)?,
            b: reg_operand(operand_b)?,
        },
        Opcode::Add => Instruction::Add {
            a: reg_operand(operand_a)?,
            b: reg_operand(operand_b)?,
        },
        Opcode::Push => Instruction::Push {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Pop => Instruction::Pop {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Call => Instruction::Call {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Ret => Instruction::Ret,
        Opcode::Cmp => Instruction::Cmp {
            a: reg_operand(operand_a)?,
            b: reg_operand(operand_b)?,
        },
        Opcode::Jeq => Instruction::Jeq {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Jmp => Instruction::Jmp {
            reg: reg_operand(operand_a)?,
        },
        Opcode::Jne => Instruction::Jne {
            reg: reg_operand(operand_a)?,
        },
    })
}

/// Encode an instruction back to its byte form.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    match *instr {
        Instruction::Ldi { reg, value } => vec![Opcode::Ldi.to_byte(), reg, value],
        Instruction::Prn { reg } => vec![Opcode::Prn.to_byte(), reg],
        Instruction::Hlt => vec![Opcode::Hlt.to_byte()],
        Instruction::Mul { a, b } => vec![Opcode::Mul.to_byte(), a, b],
        Instruction::Add { a, b } => vec![Opcode::Add.to_byte(), a, b],
        Instruction::Push { reg } => vec![Opcode::Push.to_byte(), reg],
        Instruction::Pop { reg } => vec![Opcode::Pop.to_byte(), reg],
        Instruction::Call { reg } => vec![Opcode::Call.to_byte(), reg],
        Instruction::Ret => vec![Opcode::Ret.to_byte()],
        Instruction::Cmp { a, b } => vec![Opcode::Cmp.to_byte(), a, b],
        Instruction::Jeq { reg } => vec![Opcode::Jeq.to_byte(), reg],
        Instruction::Jmp { reg } => vec![Opcode::Jmp.to_byte(), reg],
        Instruction::Jne { reg } => vec![Opcode::Jne.to_byte(), reg],
    }
}

/// Encode a whole program to its byte image.
pub fn encode_program(instructions: &[Instruction]) -> Vec<u8> {
    instructions.iter().flat_map(encode).collect()
}

fn reg_operand(byte: u8) -> Result<u8, DecodeError> {
    if usize::from(byte) < NUM_REGISTERS {
        Ok(byte)
    } else {
        Err(DecodeError::InvalidRegister(byte))
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {0:#010b}")]
    UnknownOpcode(u8),

    #[error("register operand {0} out of range")]
    InvalidRegister(u8),
}
