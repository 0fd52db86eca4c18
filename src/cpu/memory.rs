//! LS-8 memory subsystem.
//!
//! The machine has 256 byte-addressable cells, so the address space is
//! exactly the range of a `u8`: every address a program can name is valid
//! by construction and reads/writes cannot fail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of memory cells in the machine.
pub const MEMORY_SIZE: usize = 256;

/// Flat memory: 256 unsigned 8-bit cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read the cell at `addr`.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[usize::from(addr)]
    }

    /// Write `value` to the cell at `addr`.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[usize::from(addr)] = value;
    }

    /// Clear all cells to zero.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = 0;
        }
    }

    /// Load a program image starting at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        if program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE,
            });
        }
        self.cells[..program.len()].copy_from_slice(program);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only summarize; 256 cells of mostly zeroes are not worth printing.
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();
        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while populating memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let mut mem = Memory::new();
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
    }

    #[test]
    fn every_address_is_valid() {
        let mut mem = Memory::new();
        mem.write(0, 1);
        mem.write(255, 2);
        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(255), 2);
    }

    #[test]
    fn load_program_fills_from_address_zero() {
        let mut mem = Memory::new();
        mem.load_program(&[1, 2, 3]).unwrap();
        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(1), 2);
        assert_eq!(mem.read(2), 3);
        assert_eq!(mem.read(3), 0);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut mem = Memory::new();
        let program = vec![0u8; MEMORY_SIZE + 1];
        assert_eq!(
            mem.load_program(&program),
            Err(MemoryError::ProgramTooLarge {
                size: MEMORY_SIZE + 1,
                available: MEMORY_SIZE,
            })
        );
    }

    #[test]
    fn clear_zeroes_all_cells() {
        let mut mem = Memory::new();
        mem.write(100, 7);
        mem.clear();
        assert_eq!(mem.read(100), 0);
    }
}
