//! Disassembler.
//!
//! Renders a program image as an address-annotated mnemonic listing,
//! walking instruction boundaries by each opcode's operand count.

use crate::cpu::decode::{self, Instruction};

/// Format one decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Ldi { reg, value } => format!("LDI R{},{}", reg, value),
        Instruction::Prn { reg } => format!("PRN R{}", reg),
        Instruction::Hlt => "HLT".to_string(),
        Instruction::Mul { a, b } => format!("MUL R{},R{}", a, b),
        Instruction::Add { a, b } => format!("ADD R{},R{}", a, b),
        Instruction::Push { reg } => format!("PUSH R{}", reg),
        Instruction::Pop { reg } => format!("POP R{}", reg),
        Instruction::Call { reg } => format!("CALL R{}", reg),
        Instruction::Ret => "RET".to_string(),
        Instruction::Cmp { a, b } => format!("CMP R{},R{}", a, b),
        Instruction::Jeq { reg } => format!("JEQ R{}", reg),
        Instruction::Jmp { reg } => format!("JMP R{}", reg),
        Instruction::Jne { reg } => format!("JNE R{}", reg),
    }
}

/// Disassemble a program image.
///
/// Bytes that do not decode are listed as `???` with their raw value and
/// skipped one at a time.
pub fn disassemble(program: &[u8]) -> String {
    let mut output = String::new();
    let mut addr = 0;

    while addr < program.len() {
        let opcode = program[addr];
        let operand_a = program.get(addr + 1).copied().unwrap_or(0);
        let operand_b = program.get(addr + 2).copied().unwrap_or(0);

        match decode::decode(opcode, operand_a, operand_b) {
            Ok(instr) => {
                output.push_str(&format!("{:03}: {}\n", addr, format_instruction(&instr)));
                addr += usize::from(instr.size());
            }
            Err(_) => {
                output.push_str(&format!("{:03}: ??? ; {:#010b}\n", addr, opcode));
                addr += 1;
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_instructions_with_addresses() {
        let program = [0x82, 0x00, 0x08, 0x47, 0x00, 0x01];
        assert_eq!(
            disassemble(&program),
            "000: LDI R0,8\n003: PRN R0\n005: HLT\n"
        );
    }

    #[test]
    fn undecodable_bytes_are_marked() {
        assert_eq!(
            disassemble(&[0xFF, 0x01]),
            "000: ??? ; 0b11111111\n001: HLT\n"
        );
    }

    #[test]
    fn two_operand_instructions_render_both_registers() {
        let listing = disassemble(&[0xA2, 0x00, 0x01, 0xA7, 0x02, 0x03]);
        assert_eq!(listing, "000: MUL R0,R1\n003: CMP R2,R3\n");
    }
}
