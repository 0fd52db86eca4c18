//! CPU emulation for the LS-8 machine.
//!
//! This module implements the complete architecture:
//! - 256 byte-addressable memory cells
//! - 8 general-purpose registers, with R7 serving as the stack pointer
//! - A 13-instruction set with arithmetic, stack, comparison/branch, and
//!   subroutine call/return groups

pub mod alu;
pub mod decode;
pub mod execute;
pub mod flags;
pub mod memory;
pub mod registers;
pub mod stack;

pub use decode::{decode, encode, encode_program, DecodeError, Instruction, Opcode};
pub use execute::{Cpu, CpuError, CpuState};
pub use flags::Flags;
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
