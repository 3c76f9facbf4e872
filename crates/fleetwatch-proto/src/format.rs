//! Section-sign formatting code handling.
//!
//! Server text arrives with inline style codes: a `§` followed by one
//! selector character (colors `0-9a-f`, styles `k-o`, reset `r`, and `x` for
//! the start of a hex color run, which is itself spelled as six more `§`
//! pairs). This module strips them.

use std::borrow::Cow;

/// The formatting escape character.
const SECTION: char = '\u{00A7}';

/// Extension trait for handling formatted server strings.
pub trait FormattedStringExt<'a> {
    /// Check if the string contains any formatting codes.
    fn is_formatted(&self) -> bool;

    /// Strip all formatting codes from the string.
    ///
    /// Returns `Cow::Borrowed` if no formatting was present,
    /// or `Cow::Owned` with the stripped string otherwise.
    fn strip_formatting(self) -> Cow<'a, str>;
}

impl<'a> FormattedStringExt<'a> for &'a str {
    fn is_formatted(&self) -> bool {
        self.contains(SECTION)
    }

    fn strip_formatting(self) -> Cow<'a, str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }

        let mut result = String::with_capacity(self.len());
        let mut parser = CodeParser::new();

        for c in self.chars() {
            if parser.consume(c) {
                result.push(c);
            }
        }

        Cow::Owned(result)
    }
}

impl FormattedStringExt<'static> for String {
    fn is_formatted(&self) -> bool {
        self.as_str().is_formatted()
    }

    fn strip_formatting(mut self) -> Cow<'static, str> {
        if !self.is_formatted() {
            return Cow::Owned(self);
        }

        let mut parser = CodeParser::new();
        self.retain(|c| parser.consume(c));
        Cow::Owned(self)
    }
}

fn is_selector(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x')
}

/// Parser state for stripping codes.
enum State {
    /// Normal text
    Text,
    /// Just saw the escape character
    Escape,
}

struct CodeParser {
    state: State,
}

impl CodeParser {
    fn new() -> Self {
        Self { state: State::Text }
    }

    /// Consume a character, returning true if it should be kept.
    fn consume(&mut self, c: char) -> bool {
        match self.state {
            State::Text if c == SECTION => {
                self.state = State::Escape;
                false
            }
            State::Text => true,
            State::Escape if is_selector(c) => {
                self.state = State::Text;
                false
            }
            // A doubled escape keeps waiting for its selector.
            State::Escape if c == SECTION => false,
            // Dangling escape: drop it, keep the character.
            State::Escape => {
                self.state = State::Text;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_formatted() {
        assert!("\u{00A7}ared".is_formatted());
        assert!(!"plain text".is_formatted());
    }

    #[test]
    fn test_strip_colors_and_styles() {
        assert_eq!("\u{00A7}6\u{00A7}lSeason Four".strip_formatting(), "Season Four");
        assert_eq!("\u{00A7}Fwhite\u{00A7}r".strip_formatting(), "white");
    }

    #[test]
    fn test_strip_hex_run() {
        let hex = "\u{00A7}x\u{00A7}f\u{00A7}f\u{00A7}0\u{00A7}0\u{00A7}a\u{00A7}aGold";
        assert_eq!(hex.strip_formatting(), "Gold");
    }

    #[test]
    fn test_dangling_escape_keeps_text() {
        assert_eq!("100\u{00A7} off".strip_formatting(), "100 off");
    }

    #[test]
    fn test_no_formatting() {
        let s = "plain text";
        match s.strip_formatting() {
            Cow::Borrowed(b) => assert_eq!(b, "plain text"),
            Cow::Owned(_) => panic!("expected borrowed"),
        }
    }

    #[test]
    fn test_owned_string() {
        let s = String::from("\u{00A7}cHallo");
        assert_eq!(s.strip_formatting(), "Hallo");
    }
}
