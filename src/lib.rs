//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a minimal 8-bit register machine: 256 bytes
//! of memory, eight registers (R7 is the stack pointer), and a
//! 13-instruction set covering arithmetic, a downward-growing stack,
//! comparison/branching, and subroutine call/return.
//!
//! Programs are byte images. The loader reads them from the textual
//! format, one base-2 byte literal per line:
//!
//! ```text
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```
//!
//! Running a program:
//!
//! ```
//! use ls8::{Cpu, Instruction};
//! use ls8::cpu::encode_program;
//!
//! let program = encode_program(&[
//!     Instruction::Ldi { reg: 0, value: 8 },
//!     Instruction::Prn { reg: 0 },
//!     Instruction::Hlt,
//! ]);
//!
//! let mut cpu = Cpu::new();
//! cpu.load_program(&program).unwrap();
//!
//! let mut output = Vec::new();
//! cpu.run(&mut output).unwrap();
//!
//! assert_eq!(output, b"8\n");
//! assert!(cpu.is_halted());
//! ```

pub mod asm;
pub mod cpu;

// Re-export commonly used types
pub use asm::{disassemble, load_program, parse_program, LoadError};
pub use cpu::{Cpu, CpuError, CpuState, Flags, Instruction, Memory, Opcode, Registers};
