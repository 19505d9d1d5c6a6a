//! Headless capture: PNG screenshots.

use std::error::Error;
use std::fs;
use std::path::Path;

use emu_chip8::{Chip8, FB_HEIGHT, FB_WIDTH};

/// Save the current framebuffer as a PNG file.
///
/// The framebuffer is one byte per pixel, 0 or 1. This expands it to
/// white-on-black RGBA for the PNG encoder.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_screenshot(vm: &Chip8, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, FB_WIDTH as u32, FB_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut rgba = Vec::with_capacity(FB_WIDTH * FB_HEIGHT * 4);
    for &pixel in vm.framebuffer().pixels() {
        let level = if pixel == 1 { 0xFF } else { 0x00 };
        rgba.push(level);
        rgba.push(level);
        rgba.push(level);
        rgba.push(0xFF);
    }

    writer.write_image_data(&rgba)?;
    Ok(())
}
