//! Keystroke model for simulated typing.
//!
//! With special-sequence parsing enabled, `{enter}`, `{backspace}` and
//! friends become named keys and `{{}` types a literal `{`. CSS source is
//! typed with parsing disabled so braces reach the field verbatim.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};

/// Named non-character key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialKey {
    /// Enter / Return
    Enter,
    /// Backspace
    Backspace,
    /// Forward delete
    Delete,
    /// Tab
    Tab,
    /// Escape
    Escape,
    /// Select the whole field content
    SelectAll,
    /// Cursor left
    LeftArrow,
    /// Cursor right
    RightArrow,
    /// Cursor to start
    Home,
    /// Cursor to end
    End,
}

impl SpecialKey {
    /// Parse the name used inside `{...}`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "enter" => Some(Self::Enter),
            "backspace" => Some(Self::Backspace),
            "del" | "delete" => Some(Self::Delete),
            "tab" => Some(Self::Tab),
            "esc" | "escape" => Some(Self::Escape),
            "selectall" => Some(Self::SelectAll),
            "leftarrow" => Some(Self::LeftArrow),
            "rightarrow" => Some(Self::RightArrow),
            "home" => Some(Self::Home),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    /// DOM `KeyboardEvent.key` value
    #[must_use]
    pub const fn dom_key(self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Backspace => "Backspace",
            Self::Delete => "Delete",
            Self::Tab => "Tab",
            Self::Escape => "Escape",
            Self::SelectAll => "a",
            Self::LeftArrow => "ArrowLeft",
            Self::RightArrow => "ArrowRight",
            Self::Home => "Home",
            Self::End => "End",
        }
    }
}

/// One simulated key press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keystroke {
    /// A printable character
    Char(char),
    /// A named key
    Key(SpecialKey),
}

/// Options for typing into a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOptions {
    /// Interpret `{name}` sequences as special keys
    pub parse_special_char_sequences: bool,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            parse_special_char_sequences: true,
        }
    }
}

impl TypeOptions {
    /// Type every character verbatim
    #[must_use]
    pub const fn literal() -> Self {
        Self {
            parse_special_char_sequences: false,
        }
    }
}

/// Turn `text` into keystrokes
pub fn parse_sequence(text: &str, options: TypeOptions) -> HarnessResult<Vec<Keystroke>> {
    if !options.parse_special_char_sequences {
        return Ok(text.chars().map(Keystroke::Char).collect());
    }

    let mut keys = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c != '{' {
            keys.push(Keystroke::Char(c));
            rest = &rest[c.len_utf8()..];
            continue;
        }
        // `{{}` is an escaped opening brace
        if let Some(after) = rest.strip_prefix("{{}") {
            keys.push(Keystroke::Char('{'));
            rest = after;
            continue;
        }
        let Some(close) = rest.find('}') else {
            return Err(HarnessError::InputError {
                message: format!("unterminated key sequence in {text:?}"),
            });
        };
        let name = &rest[1..close];
        let key = SpecialKey::from_name(name).ok_or_else(|| HarnessError::InputError {
            message: format!("unknown key sequence {{{name}}}"),
        })?;
        keys.push(Keystroke::Key(key));
        rest = &rest[close + 1..];
    }
    Ok(keys)
}

/// Render keystrokes back to text, ignoring named keys
#[must_use]
pub fn printable_text(keys: &[Keystroke]) -> String {
    keys.iter()
        .filter_map(|k| match k {
            Keystroke::Char(c) => Some(*c),
            Keystroke::Key(_) => None,
        })
        .collect()
}
