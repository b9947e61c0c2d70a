//! Minimal keysym and modifier helpers
//!
//! The emulated keymap is trivial: keys are reported with their keysym as key code, and
//! the modifier mask sent in `wl_keyboard.modifiers` has one bit per modifier, bit `n - 1`
//! standing for the modifier of index `n`.

/// Name of the shift modifier
pub const MOD_NAME_SHIFT: &str = "Shift";
/// Name of the control modifier
pub const MOD_NAME_CTRL: &str = "Control";
/// Name of the alt modifier
pub const MOD_NAME_ALT: &str = "Mod1";

/// Index of the shift modifier
pub const MOD_SHIFT_INDEX: u32 = 1;
/// Index of the alt modifier
pub const MOD_ALT_INDEX: u32 = 2;
/// Index of the control modifier
pub const MOD_CTRL_INDEX: u32 = 3;

/// Keysyms with this bit set carry a Unicode code point in their lower bits
pub const UNICODE_KEYSYM_FLAG: u32 = 0x8000_0000;

const KEY_BACKSPACE: u32 = 0xff08;
const KEY_TAB: u32 = 0xff09;
const KEY_RETURN: u32 = 0xff0d;
const KEY_ESCAPE: u32 = 0xff1b;
const KEY_LEFT: u32 = 0xff51;
const KEY_DOWN: u32 = 0xff54;
const KEY_DELETE: u32 = 0xffff;
const KEY_SHIFT_L: u32 = 0xffe1;
const KEY_CONTROL_L: u32 = 0xffe3;
const KEY_ALT_L: u32 = 0xffe9;

/// The Unicode code point produced by a keysym, `0` if it produces none
pub fn keysym_to_utf32(keysym: u32) -> u32 {
    match keysym {
        k if k & UNICODE_KEYSYM_FLAG != 0 => k & !UNICODE_KEYSYM_FLAG,
        KEY_LEFT..=KEY_DOWN => 0,
        KEY_TAB => 0x09,
        KEY_BACKSPACE => 0x08,
        KEY_RETURN => 0x0d,
        KEY_ESCAPE => 0x1b,
        KEY_DELETE => 0x7f,
        0x20..=0x7f => keysym,
        _ => 0,
    }
}

/// Upper case variant of a keysym
pub fn keysym_to_upper(keysym: u32) -> u32 {
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_lowercase() => c.to_ascii_uppercase() as u32,
        _ => keysym,
    }
}

/// Lower case variant of a keysym
pub fn keysym_to_lower(keysym: u32) -> u32 {
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_uppercase() => c.to_ascii_lowercase() as u32,
        _ => keysym,
    }
}

/// Whether holding the key repeats it
///
/// Modifier keys never repeat.
pub fn key_repeats(key: u32) -> bool {
    !matches!(key, KEY_SHIFT_L | KEY_CONTROL_L | KEY_ALT_L)
}

/// Index of a modifier from its name, `0` if it is unknown
pub fn mod_index(name: &str) -> u32 {
    match name {
        MOD_NAME_SHIFT => MOD_SHIFT_INDEX,
        MOD_NAME_ALT => MOD_ALT_INDEX,
        MOD_NAME_CTRL => MOD_CTRL_INDEX,
        _ => 0,
    }
}

/// Modifier state tracked from `wl_keyboard.modifiers` events
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierState {
    /// Modifiers currently pressed
    pub depressed: u32,
    /// Latched modifiers
    pub latched: u32,
    /// Locked modifiers
    pub locked: u32,
}

impl ModifierState {
    /// Update the state from the content of a `wl_keyboard.modifiers` event
    pub fn update_mask(&mut self, depressed: u32, latched: u32, locked: u32) {
        self.depressed = depressed;
        self.latched = latched;
        self.locked = locked;
    }

    /// Whether the modifier of this index is pressed
    pub fn mod_index_is_active(&self, index: u32) -> bool {
        match index {
            1..=32 => self.depressed & (1 << (index - 1)) != 0,
            _ => false,
        }
    }

    /// Mask with the bit of the given modifier set
    pub fn mask_of(index: u32) -> u32 {
        match index {
            1..=32 => 1 << (index - 1),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keysyms() {
        assert_eq!(keysym_to_utf32('a' as u32), 'a' as u32);
        assert_eq!(keysym_to_utf32(UNICODE_KEYSYM_FLAG | 0xe9), 0xe9);
        assert_eq!(keysym_to_utf32(KEY_RETURN), 0x0d);
        assert_eq!(keysym_to_utf32(KEY_LEFT), 0);
        assert_eq!(keysym_to_utf32(KEY_SHIFT_L), 0);
        assert_eq!(keysym_to_upper('q' as u32), 'Q' as u32);
        assert_eq!(keysym_to_lower('Q' as u32), 'q' as u32);
        assert_eq!(keysym_to_lower('1' as u32), '1' as u32);
        assert!(key_repeats('a' as u32));
        assert!(!key_repeats(KEY_SHIFT_L));
    }

    #[test]
    fn modifiers() {
        let mut state = ModifierState::default();
        let ctrl = mod_index(MOD_NAME_CTRL);
        state.update_mask(ModifierState::mask_of(ctrl), 0, 0);
        assert!(state.mod_index_is_active(ctrl));
        assert!(!state.mod_index_is_active(mod_index(MOD_NAME_SHIFT)));
        assert!(!state.mod_index_is_active(mod_index("Hyper")));
    }
}
