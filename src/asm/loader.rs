//! Program loader.
//!
//! LS-8 programs are distributed as text: one base-2 byte literal per
//! line, with `#` starting a comment (whole-line or trailing) and blank
//! lines ignored. The loader turns such a file into the raw byte image
//! the CPU executes from address 0.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parse program text into its byte image.
pub fn parse_program(source: &str) -> Result<Vec<u8>, LoadError> {
    let mut bytes = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Strip a trailing comment, then parse the remaining token as a
        // single base-2 byte. Anything that does not fit in 8 bits is
        // malformed.
        let token = line.split('#').next().unwrap_or_default().trim();
        let value = u8::from_str_radix(token, 2).map_err(|_| LoadError::InvalidLiteral {
            line: line_num + 1,
            token: token.to_string(),
        })?;
        bytes.push(value);
    }

    Ok(bytes)
}

/// Read and parse a program file.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LoadError::FileNotFound(path.to_path_buf())
        } else {
            LoadError::Io(e.to_string())
        }
    })?;
    parse_program(&source)
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid number on line {line}: {token:?}")]
    InvalidLiteral { line: usize, token: String },
}
