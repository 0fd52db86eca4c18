//! The execution engine.
//!
//! Implements the fetch-decode-execute cycle and every instruction's
//! effect on machine state. Each cycle fetches the byte at the program
//! counter plus the two bytes after it as candidate operands, decodes,
//! executes, and applies the instruction's own PC-advancement rule:
//! sequential instructions advance by their size, control flow redirects.

use crate::cpu::alu::{self, AluError};
use crate::cpu::decode::{self, DecodeError, Instruction, Opcode};
use crate::cpu::flags::Flags;
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{Registers, NUM_REGISTERS};
use crate::cpu::stack;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Executing instructions.
    Running,
    /// Reached HLT; no further instructions execute.
    Halted,
}

/// The LS-8 CPU.
///
/// Owns the whole machine state for one program execution. The state is
/// constructed once, mutated in place by the run loop, and not reusable
/// across runs without [`Cpu::reset`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// The register file.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    pc: u8,
    flags: Flags,
    stall_on_unknown: bool,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU with zeroed memory and registers, SP at its reset
    /// value, and the program counter at 0.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            pc: 0,
            flags: Flags::Unset,
            stall_on_unknown: false,
            last_instr: None,
        }
    }

    /// Reset to a freshly constructed machine.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.pc = 0;
        self.flags = Flags::Unset;
        self.last_instr = None;
    }

    /// Load a program image into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(program)
    }

    /// Reproduce the hardware's unknown-opcode behavior: report and
    /// re-fetch the same byte instead of failing the run.
    pub fn stall_on_unknown(&mut self, stall: bool) {
        self.stall_on_unknown = stall;
    }

    /// The program counter.
    pub fn pc(&self) -> u8 {
        self.pc
    }

    /// The comparison flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU has halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Execute a single fetch-decode-execute cycle.
    ///
    /// PRN output goes to `out`. Returns the executed instruction.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        log::trace!("{}", self.trace_line());

        // Fetch the opcode and, unconditionally, both candidate operands.
        let pc = self.pc;
        let opcode = self.mem.read(pc);
        let operand_a = self.mem.read(pc.wrapping_add(1));
        let operand_b = self.mem.read(pc.wrapping_add(2));

        let instr = decode::decode(opcode, operand_a, operand_b)
            .map_err(|source| CpuError::Decode { pc, source })?;

        self.execute(instr, out)?;

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt.
    ///
    /// Returns the number of instructions executed. With the
    /// unknown-opcode stall enabled this can loop forever, exactly like
    /// the hardware; use [`Cpu::run_limited`] to bound it.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        let start = self.cycles;
        while self.state == CpuState::Running {
            self.step_or_stall(out)?;
        }
        Ok(self.cycles - start)
    }

    /// Run for at most `max_cycles` fetch attempts.
    ///
    /// Stalled attempts count toward the limit, so this terminates even
    /// in compatibility mode.
    pub fn run_limited<W: Write>(&mut self, out: &mut W, max_cycles: u64) -> Result<u64, CpuError> {
        let start = self.cycles;
        let mut attempts = 0;
        while self.state == CpuState::Running && attempts < max_cycles {
            self.step_or_stall(out)?;
            attempts += 1;
        }
        Ok(self.cycles - start)
    }

    /// Render the hardware-style trace line: PC, the bytes at PC..PC+2,
    /// and all eight registers, in hex.
    pub fn trace_line(&self) -> String {
        let mut line = format!(
            "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            self.mem.read(self.pc),
            self.mem.read(self.pc.wrapping_add(1)),
            self.mem.read(self.pc.wrapping_add(2)),
        );
        for r in 0..NUM_REGISTERS as u8 {
            line.push_str(&format!(" {:02X}", self.regs.get(r)));
        }
        line
    }

    /// Step once, converting an unknown opcode into a report-and-stall
    /// when compatibility mode asks for it.
    fn step_or_stall<W: Write>(&mut self, out: &mut W) -> Result<(), CpuError> {
        match self.step(out) {
            Ok(_) => Ok(()),
            Err(CpuError::Decode {
                pc,
                source: source @ DecodeError::UnknownOpcode(_),
            }) if self.stall_on_unknown => {
                // The hardware re-fetches the same byte forever.
                log::error!("{} at address {:#04x}", source, pc);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Execute a decoded instruction, applying its PC-advancement rule.
    fn execute<W: Write>(&mut self, instr: Instruction, out: &mut W) -> Result<(), CpuError> {
        match instr {
            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value);
                self.pc = self.pc.wrapping_add(3);
            }
            Instruction::Prn { reg } => {
                writeln!(out, "{}", self.regs.get(reg))
                    .map_err(|e| CpuError::Output(e.to_string()))?;
                self.pc = self.pc.wrapping_add(2);
            }
            Instruction::Hlt => {
                self.state = CpuState::Halted;
                self.pc = 0;
            }
            Instruction::Mul { a, b } => {
                alu::apply(&mut self.regs, Opcode::Mul, a, b)?;
                self.pc = self.pc.wrapping_add(3);
            }
            Instruction::Add { a, b } => {
                alu::apply(&mut self.regs, Opcode::Add, a, b)?;
                self.pc = self.pc.wrapping_add(3);
            }
            Instruction::Push { reg } => {
                let value = self.regs.get(reg);
                stack::push(&mut self.regs, &mut self.mem, value);
                self.pc = self.pc.wrapping_add(2);
            }
            Instruction::Pop { reg } => {
                let value = stack::pop(&mut self.regs, &self.mem);
                self.regs.set(reg, value);
                self.pc = self.pc.wrapping_add(2);
            }
            Instruction::Call { reg } => {
                let return_addr = self.pc.wrapping_add(2);
                stack::push(&mut self.regs, &mut self.mem, return_addr);
                self.pc = self.regs.get(reg);
            }
            Instruction::Ret => {
                self.pc = stack::pop(&mut self.regs, &self.mem);
            }
            Instruction::Cmp { a, b } => {
                self.flags = Flags::compare(self.regs.get(a), self.regs.get(b));
                self.pc = self.pc.wrapping_add(3);
            }
            Instruction::Jeq { reg } => {
                if self.flags.is_equal() {
                    self.pc = self.regs.get(reg);
                } else {
                    self.pc = self.pc.wrapping_add(2);
                }
            }
            Instruction::Jmp { reg } => {
                self.pc = self.regs.get(reg);
            }
            Instruction::Jne { reg } => {
                if self.flags.is_unequal() {
                    self.pc = self.regs.get(reg);
                } else {
                    self.pc = self.pc.wrapping_add(2);
                }
            }
        }
        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("pc", &self.pc)
            .field("flags", &self.flags)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("decode failed at address {pc:#04x}: {source}")]
    Decode {
        pc: u8,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Alu(#[from] AluError),

    #[error("output error: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode_program;
    use crate::cpu::registers::SP_INIT;

    fn run_program(instructions: &[Instruction]) -> (Cpu, Vec<u8>) {
        let mut cpu = Cpu::new();
        cpu.load_program(&encode_program(instructions)).unwrap();
        let mut output = Vec::new();
        cpu.run(&mut output).unwrap();
        (cpu, output)
    }

    #[test]
    fn ldi_sets_the_register_and_advances_pc_by_three() {
        let mut cpu = Cpu::new();
        cpu.regs.set(0, 0xEE);
        cpu.load_program(&encode_program(&[Instruction::Ldi { reg: 0, value: 8 }]))
            .unwrap();
        let mut out = Vec::new();
        cpu.step(&mut out).unwrap();
        assert_eq!(cpu.regs.get(0), 8);
        assert_eq!(cpu.pc(), 3);
        assert!(out.is_empty());
    }

    #[test]
    fn print8_program_prints_and_halts() {
        // LDI R0,8; PRN R0; HLT, as raw bytes.
        let program = [
            0b1000_0010,
            0b0000_0000,
            0b0000_1000,
            0b0100_0111,
            0b0000_0000,
            0b0000_0001,
        ];
        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let mut out = Vec::new();
        let executed = cpu.run(&mut out).unwrap();
        assert_eq!(out, b"8\n");
        assert_eq!(executed, 3);
        assert_eq!(cpu.pc(), 0);
        assert!(cpu.is_halted());
    }

    #[test]
    fn prn_prints_one_decimal_line_per_call() {
        let (_, output) = run_program(&[
            Instruction::Ldi { reg: 0, value: 255 },
            Instruction::Prn { reg: 0 },
            Instruction::Prn { reg: 0 },
            Instruction::Hlt,
        ]);
        assert_eq!(output, b"255\n255\n");
    }

    #[test]
    fn add_accumulates_without_memoization() {
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 3 },
            Instruction::Ldi { reg: 1, value: 4 },
            Instruction::Add { a: 0, b: 1 },
            Instruction::Add { a: 0, b: 1 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.get(0), 11);
    }

    #[test]
    fn arithmetic_wraps_mod_256() {
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 200 },
            Instruction::Ldi { reg: 1, value: 100 },
            Instruction::Add { a: 0, b: 1 },
            Instruction::Ldi { reg: 2, value: 32 },
            Instruction::Ldi { reg: 3, value: 8 },
            Instruction::Mul { a: 2, b: 3 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.get(0), 44);
        assert_eq!(cpu.regs.get(2), 0);
    }

    #[test]
    fn push_pop_transfer_through_memory() {
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 1 },
            Instruction::Ldi { reg: 1, value: 2 },
            Instruction::Push { reg: 0 },
            Instruction::Push { reg: 1 },
            Instruction::Pop { reg: 0 },
            Instruction::Pop { reg: 1 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.get(0), 2);
        assert_eq!(cpu.regs.get(1), 1);
        assert_eq!(cpu.regs.sp(), SP_INIT);
    }

    #[test]
    fn call_and_ret_resume_after_the_call_site() {
        // 0: LDI R0,6  3: CALL R0  5: HLT  6: LDI R1,42  9: RET
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 6 },
            Instruction::Call { reg: 0 },
            Instruction::Hlt,
            Instruction::Ldi { reg: 1, value: 42 },
            Instruction::Ret,
        ]);
        assert_eq!(cpu.regs.get(1), 42);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.sp(), SP_INIT);
    }

    #[test]
    fn jmp_redirects_unconditionally() {
        // 0: LDI R0,8  3: JMP R0  5: LDI R1,99  8: HLT
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 8 },
            Instruction::Jmp { reg: 0 },
            Instruction::Ldi { reg: 1, value: 99 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.get(1), 0);
        assert!(cpu.is_halted());
    }

    fn branch_taken(a: u8, b: u8, jump: fn(u8) -> Instruction) -> bool {
        // 0: LDI R0,a  3: LDI R1,b  6: LDI R2,18  9: CMP R0,R1
        // 12: jump R2  14: LDI R3,1  17: HLT  18: LDI R3,2  21: HLT
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: a },
            Instruction::Ldi { reg: 1, value: b },
            Instruction::Ldi { reg: 2, value: 18 },
            Instruction::Cmp { a: 0, b: 1 },
            jump(2),
            Instruction::Ldi { reg: 3, value: 1 },
            Instruction::Hlt,
            Instruction::Ldi { reg: 3, value: 2 },
            Instruction::Hlt,
        ]);
        cpu.regs.get(3) == 2
    }

    #[test]
    fn cmp_branch_matrix() {
        let jeq = |reg| Instruction::Jeq { reg };
        let jne = |reg| Instruction::Jne { reg };
        assert!(branch_taken(5, 5, jeq));
        assert!(!branch_taken(5, 5, jne));
        assert!(branch_taken(5, 3, jne));
        assert!(!branch_taken(5, 3, jeq));
        assert!(branch_taken(3, 5, jne));
        assert!(!branch_taken(3, 5, jeq));
    }

    #[test]
    fn unset_flags_take_no_branch() {
        // Would jump into unknown territory if either branch fired.
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 99 },
            Instruction::Jeq { reg: 0 },
            Instruction::Jne { reg: 0 },
            Instruction::Hlt,
        ]);
        assert!(cpu.is_halted());
    }

    #[test]
    fn flags_persist_until_the_next_compare() {
        // 0: LDI R0,5  3: LDI R1,5  6: LDI R2,18  9: CMP R0,R1
        // 12: LDI R3,7  15: JEQ R2  17: HLT  18: LDI R4,1  21: HLT
        let (cpu, _) = run_program(&[
            Instruction::Ldi { reg: 0, value: 5 },
            Instruction::Ldi { reg: 1, value: 5 },
            Instruction::Ldi { reg: 2, value: 18 },
            Instruction::Cmp { a: 0, b: 1 },
            Instruction::Ldi { reg: 3, value: 7 },
            Instruction::Jeq { reg: 2 },
            Instruction::Hlt,
            Instruction::Ldi { reg: 4, value: 1 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.get(4), 1);
    }

    #[test]
    fn call_loop_computes_a_wrapped_power() {
        // Multiply R0 by 9 three more times via a subroutine, counting
        // the loop down with ADD 255 (-1 mod 256): 9^4 = 6561 = 161 mod 256.
        let program = [
            Instruction::Ldi { reg: 0, value: 9 },   // 0
            Instruction::Ldi { reg: 3, value: 9 },   // 3
            Instruction::Ldi { reg: 1, value: 3 },   // 6
            Instruction::Ldi { reg: 4, value: 255 }, // 9
            Instruction::Ldi { reg: 5, value: 0 },   // 12
            Instruction::Ldi { reg: 2, value: 34 },  // 15: subroutine address
            Instruction::Ldi { reg: 6, value: 21 },  // 18: loop address
            Instruction::Call { reg: 2 },            // 21
            Instruction::Add { a: 1, b: 4 },         // 23
            Instruction::Cmp { a: 1, b: 5 },         // 26
            Instruction::Jne { reg: 6 },             // 29
            Instruction::Prn { reg: 0 },             // 31
            Instruction::Hlt,                        // 33
            Instruction::Mul { a: 0, b: 3 },         // 34
            Instruction::Ret,                        // 37
        ];
        let (cpu, output) = run_program(&program);
        assert_eq!(cpu.regs.get(0), 161);
        assert_eq!(output, b"161\n");
        assert_eq!(cpu.regs.sp(), SP_INIT);
    }

    #[test]
    fn unknown_opcode_is_fatal_by_default() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xFF]).unwrap();
        let mut out = Vec::new();
        let err = cpu.run(&mut out).unwrap_err();
        assert_eq!(
            err,
            CpuError::Decode {
                pc: 0,
                source: DecodeError::UnknownOpcode(0xFF),
            }
        );
    }

    #[test]
    fn compat_stall_refetches_without_advancing() {
        let mut cpu = Cpu::new();
        cpu.stall_on_unknown(true);
        cpu.load_program(&[0xFF]).unwrap();
        let mut out = Vec::new();
        let executed = cpu.run_limited(&mut out, 10).unwrap();
        assert_eq!(executed, 0);
        assert_eq!(cpu.pc(), 0);
        assert!(cpu.is_running());
    }

    #[test]
    fn step_after_halt_is_an_error() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[Opcode::Hlt.to_byte()]).unwrap();
        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();
        assert_eq!(
            cpu.step(&mut out).unwrap_err(),
            CpuError::NotRunning(CpuState::Halted)
        );
    }

    #[test]
    fn reset_restores_a_runnable_machine() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[Opcode::Hlt.to_byte()]).unwrap();
        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();
        cpu.reset();
        assert!(cpu.is_running());
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.flags(), Flags::Unset);
    }

    #[test]
    fn trace_line_shows_the_pc_window_and_registers() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0x82, 0x00, 0x08]).unwrap();
        assert_eq!(
            cpu.trace_line(),
            "TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"
        );
    }
}
