//! CHIP-8 virtual machine interpreter.
//!
//! CHIP-8 is a byte-code machine from the late 1970s: 4 KB of RAM, 16
//! 8-bit registers plus a 16-bit index register, a 64x32 monochrome
//! framebuffer with XOR sprite compositing, a 16-key hex pad and two
//! 60 Hz-class countdown timers, driven by a fixed set of 35 16-bit
//! opcodes.
//!
//! This crate is the machine only. It knows nothing about windows,
//! keyboards or speakers: the host feeds key transitions in, drains the
//! sound trigger out, and reads the framebuffer whenever it wants to
//! paint.

mod cpu;
mod error;
mod font;
mod framebuffer;
mod keypad;
mod memory;
mod registers;

pub use cpu::Chip8;
pub use error::Chip8Error;
pub use font::{FONT, FONT_ADDR, GLYPH_BYTES};
pub use framebuffer::{FB_HEIGHT, FB_WIDTH, Framebuffer};
pub use keypad::Keypad;
pub use memory::{Memory, RAM_SIZE};
pub use registers::{PROGRAM_ADDR, Registers, STACK_ADDR};
