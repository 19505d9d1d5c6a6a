//! Fatal VM fault types.
//!
//! The instruction set is closed: every defined encoding is handled, so a
//! decode miss or an out-of-range memory access signals a defective program
//! (or an interpreter bug) and terminates the run. Neither fault is
//! recoverable.

use std::fmt;

/// A fatal fault raised during program load or instruction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8Error {
    /// A memory access whose span falls outside the 4 KB address space.
    AddressingFault {
        /// First address of the requested span.
        addr: u16,
        /// Length of the requested span in bytes.
        len: usize,
    },
    /// An opcode with no handler in the dispatch tables. Carries the full
    /// 16-bit instruction word for diagnostics.
    InvalidOpcode(u16),
}

impl fmt::Display for Chip8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressingFault { addr, len } => write!(
                f,
                "addressing fault: {len}-byte access at {addr:#05X} falls outside RAM",
            ),
            Self::InvalidOpcode(opcode) => write!(f, "invalid opcode {opcode:#06X}"),
        }
    }
}

impl std::error::Error for Chip8Error {}
