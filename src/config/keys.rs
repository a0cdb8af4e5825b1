//! The fixed set of keys a keyboard macro may press.
//!
//! Key names are matched case-insensitively: `"Q"` and `"q"` are the same key.

use std::fmt;

/// A key a keyboard macro can emit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// A letter `a`-`z` or a digit `0`-`9`, stored lowercase.
    Char(char),
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Up,
    Down,
    Left,
    Right,
}

impl KeyName {
    /// Parse a configured key name. Returns `None` for anything outside the supported set,
    /// including names with surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let mut chars = lower.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return (c.is_ascii_lowercase() || c.is_ascii_digit()).then_some(KeyName::Char(c));
        }
        match lower.as_str() {
            "space" => Some(KeyName::Space),
            "enter" | "return" => Some(KeyName::Enter),
            "tab" => Some(KeyName::Tab),
            "escape" | "esc" => Some(KeyName::Escape),
            "backspace" => Some(KeyName::Backspace),
            "up" => Some(KeyName::Up),
            "down" => Some(KeyName::Down),
            "left" => Some(KeyName::Left),
            "right" => Some(KeyName::Right),
            _ => None,
        }
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyName::Char(c) => write!(f, "{c}"),
            KeyName::Space => f.write_str("space"),
            KeyName::Enter => f.write_str("enter"),
            KeyName::Tab => f.write_str("tab"),
            KeyName::Escape => f.write_str("escape"),
            KeyName::Backspace => f.write_str("backspace"),
            KeyName::Up => f.write_str("up"),
            KeyName::Down => f.write_str("down"),
            KeyName::Left => f.write_str("left"),
            KeyName::Right => f.write_str("right"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_digits_are_case_insensitive() {
        assert_eq!(KeyName::parse("Q"), Some(KeyName::Char('q')));
        assert_eq!(KeyName::parse("q"), Some(KeyName::Char('q')));
        assert_eq!(KeyName::parse("7"), Some(KeyName::Char('7')));
    }

    #[test]
    fn named_keys_and_aliases() {
        assert_eq!(KeyName::parse("Space"), Some(KeyName::Space));
        assert_eq!(KeyName::parse("return"), Some(KeyName::Enter));
        assert_eq!(KeyName::parse("esc"), Some(KeyName::Escape));
        assert_eq!(KeyName::Escape.to_string(), "escape");
    }

    #[test]
    fn unsupported_keys() {
        assert_eq!(KeyName::parse(""), None);
        assert_eq!(KeyName::parse("!"), None);
        assert_eq!(KeyName::parse("é"), None);
        assert_eq!(KeyName::parse("F1"), None);
        assert_eq!(KeyName::parse("ctrl"), None);
    }

    #[test]
    fn surrounding_whitespace_is_not_trimmed() {
        assert_eq!(KeyName::parse(" q"), None);
        assert_eq!(KeyName::parse("space "), None);
    }
}
