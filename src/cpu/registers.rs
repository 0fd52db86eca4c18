//! The LS-8 register file.
//!
//! Eight general-purpose 8-bit registers, R0 through R7. R7 doubles as the
//! stack pointer and starts at 0xF4, the base of the downward-growing
//! stack in high memory. Register values are `u8`, so every write lands in
//! [0, 255] by construction; arithmetic on them wraps mod 256.

use serde::{Deserialize, Serialize};

/// The number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// Index of the register reserved as the stack pointer.
pub const SP: u8 = 7;

/// Stack pointer value at construction.
pub const SP_INIT: u8 = 0xF4;

/// The register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gp: [u8; NUM_REGISTERS],
}

impl Registers {
    /// Create a register file with R0-R6 zeroed and SP at [`SP_INIT`].
    pub fn new() -> Self {
        let mut gp = [0; NUM_REGISTERS];
        gp[usize::from(SP)] = SP_INIT;
        Self { gp }
    }

    /// Reset all registers to their construction state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read register `r`.
    ///
    /// `r` must be below [`NUM_REGISTERS`]; the decoder guarantees this
    /// for every register operand it produces.
    #[inline]
    pub fn get(&self, r: u8) -> u8 {
        self.gp[usize::from(r)]
    }

    /// Write register `r`.
    #[inline]
    pub fn set(&mut self, r: u8, value: u8) {
        self.gp[usize::from(r)] = value;
    }

    /// Read the stack pointer.
    #[inline]
    pub fn sp(&self) -> u8 {
        self.gp[usize::from(SP)]
    }

    /// Write the stack pointer.
    #[inline]
    pub fn set_sp(&mut self, value: u8) {
        self.gp[usize::from(SP)] = value;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_initializes_the_stack_pointer() {
        let regs = Registers::new();
        assert_eq!(regs.sp(), SP_INIT);
        for r in 0..SP {
            assert_eq!(regs.get(r), 0);
        }
    }

    #[test]
    fn get_set_roundtrip() {
        let mut regs = Registers::new();
        regs.set(3, 200);
        assert_eq!(regs.get(3), 200);
        assert_eq!(regs.get(2), 0);
    }

    #[test]
    fn reset_restores_construction_state() {
        let mut regs = Registers::new();
        regs.set(0, 9);
        regs.set_sp(0x10);
        regs.reset();
        assert_eq!(regs, Registers::new());
    }
}
