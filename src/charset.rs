//! Character sets candidates are drawn from.
//!
//! Lookup is permissive: an unknown id resolves to [`CharsetId::Alnum`]
//! instead of failing, so a typo in the configuration still produces output.

use serde::{Deserialize, Serialize};
use std::fmt;

const DIGITS: &[u8] = b"0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &[u8] = b"!@#$%^&*()-_=+[]{}|;:,.<>?/";
const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ALNUM_SPECIAL: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()-_=+[]{}|;:,.<>?/";

/// Identifier of a registered character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharsetId {
    Digits,
    Letters,
    Special,
    #[default]
    Alnum,
    AlnumSpecial,
}

impl CharsetId {
    pub const ALL: [CharsetId; 5] = [
        CharsetId::Digits,
        CharsetId::Letters,
        CharsetId::Special,
        CharsetId::Alnum,
        CharsetId::AlnumSpecial,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CharsetId::Digits => "digits",
            CharsetId::Letters => "letters",
            CharsetId::Special => "special",
            CharsetId::Alnum => "alnum",
            CharsetId::AlnumSpecial => "alnum_special",
        }
    }

    /// The ordered characters of this set. All of them are ASCII.
    pub fn chars(self) -> &'static [u8] {
        match self {
            CharsetId::Digits => DIGITS,
            CharsetId::Letters => LETTERS,
            CharsetId::Special => SPECIAL,
            CharsetId::Alnum => ALNUM,
            CharsetId::AlnumSpecial => ALNUM_SPECIAL,
        }
    }

    /// Exact lookup by name; `None` for ids that are not registered.
    pub fn lookup(id: &str) -> Option<CharsetId> {
        CharsetId::ALL.into_iter().find(|c| c.name() == id)
    }

    /// Lookup that falls back to `alnum` for unknown ids.
    pub fn resolve(id: &str) -> CharsetId {
        CharsetId::lookup(id).unwrap_or(CharsetId::Alnum)
    }
}

impl fmt::Display for CharsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Characters for `id`, with the `alnum` fallback for unknown ids.
pub fn resolve(id: &str) -> &'static [u8] {
    CharsetId::resolve(id).chars()
}
