//! Host keyboard → hex keypad mapping.
//!
//! Maps winit `KeyCode` values to the 16-key CHIP-8 pad:
//! - Numpad 0-9 (or the digit row) → keys 0x0-0x9
//! - A-F → keys 0xA-0xF

use winit::keyboard::KeyCode;

/// Map a host key to a hex pad key.
///
/// Returns `None` for unmapped keys.
#[must_use]
pub fn map_keycode(key: KeyCode) -> Option<u8> {
    match key {
        KeyCode::Numpad0 | KeyCode::Digit0 => Some(0x0),
        KeyCode::Numpad1 | KeyCode::Digit1 => Some(0x1),
        KeyCode::Numpad2 | KeyCode::Digit2 => Some(0x2),
        KeyCode::Numpad3 | KeyCode::Digit3 => Some(0x3),
        KeyCode::Numpad4 | KeyCode::Digit4 => Some(0x4),
        KeyCode::Numpad5 | KeyCode::Digit5 => Some(0x5),
        KeyCode::Numpad6 | KeyCode::Digit6 => Some(0x6),
        KeyCode::Numpad7 | KeyCode::Digit7 => Some(0x7),
        KeyCode::Numpad8 | KeyCode::Digit8 => Some(0x8),
        KeyCode::Numpad9 | KeyCode::Digit9 => Some(0x9),
        KeyCode::KeyA => Some(0xA),
        KeyCode::KeyB => Some(0xB),
        KeyCode::KeyC => Some(0xC),
        KeyCode::KeyD => Some(0xD),
        KeyCode::KeyE => Some(0xE),
        KeyCode::KeyF => Some(0xF),
        _ => None,
    }
}
