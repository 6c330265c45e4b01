//! Key and modifier resolution.
//!
//! Key codes are macOS virtual key codes (CGKeyCode, u16) per Apple
//! HIToolbox/Events.h. They are physical key positions: the single-character
//! table assumes an ANSI keyboard, same as the system shortcut definitions.
//!
//! Resolution order for `resolve_key`: symbolic name, `0x`-prefixed hex
//! numeral, bare decimal numeral, single-character table. Input is trimmed
//! and lower-cased before matching.

use std::time::Duration;

use crate::error::TriggerError;

/// Virtual key code as understood by the event-posting API.
pub type KeyCode = u16;

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// A named modifier key, as written on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Command,
    Option,
    Control,
    Shift,
    Fn,
}

impl Modifier {
    /// CGEventFlags mask for this modifier.
    fn flag(self) -> u64 {
        match self {
            // kCGEventFlagMaskShift etc., per CoreGraphics CGEventTypes.h.
            Modifier::Shift => 0x0002_0000,
            Modifier::Control => 0x0004_0000,
            Modifier::Option => 0x0008_0000,
            Modifier::Command => 0x0010_0000,
            Modifier::Fn => 0x0080_0000,
        }
    }

    /// Looks up a modifier by its command-line name.
    fn from_name(name: &str) -> Option<Modifier> {
        match name {
            "command" => Some(Modifier::Command),
            "option" => Some(Modifier::Option),
            "control" => Some(Modifier::Control),
            "shift" => Some(Modifier::Shift),
            "fn" => Some(Modifier::Fn),
            _ => None,
        }
    }
}

/// A set of modifier keys, stored as a CGEventFlags bitmask.
///
/// Set semantics: inserting the same modifier twice is a no-op, and two sets
/// built from the same modifiers in any order compare equal. The empty set
/// is a valid value ("press the key with no modifiers held").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierSet(u64);

impl ModifierSet {
    pub const EMPTY: ModifierSet = ModifierSet(0);

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.flag();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Raw CGEventFlags value carried by both posted events of a chord.
    pub fn flags(&self) -> u64 {
        self.0
    }
}

/// Parses a comma-separated modifier list into a `ModifierSet`.
///
/// `"none"` and the empty string both yield the empty set. Tokens are
/// trimmed individually; an unknown token fails with `InvalidArgument`
/// naming it.
pub fn resolve_modifiers(input: &str) -> Result<ModifierSet, TriggerError> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == "none" {
        return Ok(ModifierSet::EMPTY);
    }

    let mut set = ModifierSet::EMPTY;
    for token in trimmed.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let Some(modifier) = Modifier::from_name(token) else {
            return Err(TriggerError::InvalidArgument(format!(
                "unknown modifier: {token}"
            )));
        };
        set.insert(modifier);
    }
    Ok(set)
}

// ---------------------------------------------------------------------------
// Key resolution
// ---------------------------------------------------------------------------

/// Resolves a key named on the command line to a virtual key code.
pub fn resolve_key(input: &str) -> Result<KeyCode, TriggerError> {
    let lower = input.trim().to_lowercase();

    if let Some(code) = symbolic_key_code(&lower) {
        return Ok(code);
    }
    if let Some(hex) = lower.strip_prefix("0x") {
        if let Ok(code) = KeyCode::from_str_radix(hex, 16) {
            return Ok(code);
        }
    }
    if let Ok(code) = lower.parse::<KeyCode>() {
        return Ok(code);
    }
    if let Some(code) = char_key_code(&lower) {
        return Ok(code);
    }

    Err(TriggerError::InvalidArgument(format!(
        "unrecognized key: {input}"
    )))
}

/// Fixed symbolic names for non-printing keys.
fn symbolic_key_code(name: &str) -> Option<KeyCode> {
    match name {
        "space" => Some(0x31),
        "return" | "enter" => Some(0x24),
        "tab" => Some(0x30),
        "escape" | "esc" => Some(0x35),
        // kVK_Delete, the key PC keyboards label Backspace.
        "delete" | "backspace" => Some(0x33),
        "up" => Some(0x7E),
        "down" => Some(0x7D),
        "left" => Some(0x7B),
        "right" => Some(0x7C),
        _ => None,
    }
}

/// Single-character keys (letters, digits, punctuation) to ANSI key codes.
fn char_key_code(key: &str) -> Option<KeyCode> {
    match key {
        "a" => Some(0x00),
        "s" => Some(0x01),
        "d" => Some(0x02),
        "f" => Some(0x03),
        "h" => Some(0x04),
        "g" => Some(0x05),
        "z" => Some(0x06),
        "x" => Some(0x07),
        "c" => Some(0x08),
        "v" => Some(0x09),
        "b" => Some(0x0B),
        "q" => Some(0x0C),
        "w" => Some(0x0D),
        "e" => Some(0x0E),
        "r" => Some(0x0F),
        "y" => Some(0x10),
        "t" => Some(0x11),
        "1" => Some(0x12),
        "2" => Some(0x13),
        "3" => Some(0x14),
        "4" => Some(0x15),
        "6" => Some(0x16),
        "5" => Some(0x17),
        "=" => Some(0x18),
        "9" => Some(0x19),
        "7" => Some(0x1A),
        "-" => Some(0x1B),
        "8" => Some(0x1C),
        "0" => Some(0x1D),
        "]" => Some(0x1E),
        "o" => Some(0x1F),
        "u" => Some(0x20),
        "[" => Some(0x21),
        "i" => Some(0x22),
        "p" => Some(0x23),
        "l" => Some(0x25),
        "j" => Some(0x26),
        "'" => Some(0x27),
        "k" => Some(0x28),
        ";" => Some(0x29),
        "," => Some(0x2B),
        "/" => Some(0x2C),
        "n" => Some(0x2D),
        "m" => Some(0x2E),
        "." => Some(0x2F),
        "`" => Some(0x32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Hotkey
// ---------------------------------------------------------------------------

/// One synthetic chord: key code, modifier flags, and the down-to-up hold.
///
/// Immutable once built by the option parser; at most two exist per run
/// (start, optional stop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub key_code: KeyCode,
    pub modifiers: ModifierSet,
    pub hold: Duration,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbolic_names_are_stable() {
        assert_eq!(resolve_key("space").unwrap(), 0x31);
        assert_eq!(resolve_key("return").unwrap(), 0x24);
        assert_eq!(resolve_key("enter").unwrap(), 0x24);
        assert_eq!(resolve_key("tab").unwrap(), 0x30);
        assert_eq!(resolve_key("escape").unwrap(), 0x35);
        assert_eq!(resolve_key("esc").unwrap(), 0x35);
        assert_eq!(resolve_key("delete").unwrap(), 0x33);
        assert_eq!(resolve_key("backspace").unwrap(), 0x33);
        assert_eq!(resolve_key("up").unwrap(), 0x7E);
        assert_eq!(resolve_key("down").unwrap(), 0x7D);
        assert_eq!(resolve_key("left").unwrap(), 0x7B);
        assert_eq!(resolve_key("right").unwrap(), 0x7C);
    }

    #[test]
    fn hex_decimal_and_name_agree_on_return() {
        let by_name = resolve_key("return").unwrap();
        assert_eq!(resolve_key("0x24").unwrap(), by_name);
        assert_eq!(resolve_key("36").unwrap(), by_name);
        assert_eq!(by_name, 36);
    }

    #[test]
    fn input_is_trimmed_and_case_folded() {
        assert_eq!(resolve_key("  Return \n").unwrap(), 0x24);
        assert_eq!(resolve_key("0X24").unwrap(), 0x24);
        assert_eq!(resolve_key(" A ").unwrap(), 0x00);
    }

    #[test]
    fn char_table_spot_checks() {
        assert_eq!(resolve_key("a").unwrap(), 0x00);
        assert_eq!(resolve_key("s").unwrap(), 0x01);
        assert_eq!(resolve_key("m").unwrap(), 0x2E);
        assert_eq!(resolve_key("`").unwrap(), 0x32);
        assert_eq!(resolve_key(";").unwrap(), 0x29);
        assert_eq!(resolve_key("[").unwrap(), 0x21);
    }

    #[test]
    fn digits_resolve_as_decimal_before_the_char_table() {
        // Bare numerals are raw key codes, not top-row digit keys: "9" is
        // key code 9 (the V key position), not kVK_ANSI_9.
        assert_eq!(resolve_key("9").unwrap(), 9);
        assert_eq!(resolve_key("0").unwrap(), 0);
    }

    #[test]
    fn unknown_key_fails_naming_the_input() {
        let err = resolve_key("holdthedoor").unwrap_err();
        assert!(matches!(err, TriggerError::InvalidArgument(_)));
        assert!(err.to_string().contains("holdthedoor"));
    }

    #[test]
    fn modifier_order_is_irrelevant() {
        let ab = resolve_modifiers("command,option").unwrap();
        let ba = resolve_modifiers("option,command").unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn duplicate_modifiers_collapse() {
        let once = resolve_modifiers("shift").unwrap();
        let twice = resolve_modifiers("shift,shift").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn none_and_empty_yield_the_empty_set() {
        assert_eq!(resolve_modifiers("none").unwrap(), ModifierSet::EMPTY);
        assert_eq!(resolve_modifiers("").unwrap(), ModifierSet::EMPTY);
        assert_eq!(resolve_modifiers("  ").unwrap(), ModifierSet::EMPTY);
        assert!(resolve_modifiers("none").unwrap().is_empty());
    }

    #[test]
    fn unknown_modifier_fails_naming_the_trimmed_token() {
        let err = resolve_modifiers(" bogus ").unwrap_err();
        assert!(matches!(err, TriggerError::InvalidArgument(_)));
        assert!(err.to_string().contains("bogus"));
        assert!(!err.to_string().contains(" bogus "));
    }

    #[test]
    fn tokens_are_trimmed_inside_the_list() {
        let spaced = resolve_modifiers(" command , option ").unwrap();
        let tight = resolve_modifiers("command,option").unwrap();
        assert_eq!(spaced, tight);
    }

    #[test]
    fn all_five_modifiers_resolve() {
        let set = resolve_modifiers("command,option,control,shift,fn").unwrap();
        assert_eq!(
            set.flags(),
            0x0010_0000 | 0x0008_0000 | 0x0004_0000 | 0x0002_0000 | 0x0080_0000
        );
    }
}
