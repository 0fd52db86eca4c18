//! Program text tooling around the core.
//!
//! This module provides:
//! - The loader for the textual program format (one base-2 byte per line)
//! - A disassembler (byte image → readable listing)

pub mod disasm;
pub mod loader;

pub use disasm::disassemble;
pub use loader::{load_program, parse_program, LoadError};
