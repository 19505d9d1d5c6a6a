//! Built-in hex digit font.
//!
//! 16 glyphs of 5 bytes each, one row bitmap per byte (high bit = leftmost
//! pixel). Loaded at 0x000-0x04F when the machine is built; `LD F,Vx`
//! computes glyph addresses as `Vx * 5` against this layout, so the table
//! must stay byte-for-byte identical to the standard set.

/// Where the font table lives in RAM.
pub const FONT_ADDR: u16 = 0x000;

/// Bytes per glyph.
pub const GLYPH_BYTES: u16 = 5;

/// Row bitmaps for digits 0-F.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
