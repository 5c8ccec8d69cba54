//! Member display name value object

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

pub const MIN_DISPLAY_NAME_LENGTH: usize = 3;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Pictographic emoji blocks that are not allowed in names
const BLOCKED_EMOJI: RangeInclusive<u32> = 0x1F300..=0x1FAFF;

/// Control and format code points, zero-width characters included
static INVISIBLE_CHARACTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Cc}\p{Cf}]").expect("invisible pattern is valid"));

static VISIBLE_CHARACTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{C}\s]").expect("visible pattern is valid"));

/// A trimmed, visible display name. Compares case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("display name is required"));
        }

        let len = trimmed.chars().count();
        if !(MIN_DISPLAY_NAME_LENGTH..=MAX_DISPLAY_NAME_LENGTH).contains(&len) {
            return Err(Error::validation(format!(
                "display name must be between {MIN_DISPLAY_NAME_LENGTH} and {MAX_DISPLAY_NAME_LENGTH} characters"
            )));
        }

        if INVISIBLE_CHARACTER.is_match(trimmed) || !VISIBLE_CHARACTER.is_match(trimmed) {
            return Err(Error::validation("display name contains invalid characters"));
        }

        if trimmed.chars().any(|c| BLOCKED_EMOJI.contains(&(c as u32))) {
            return Err(Error::validation(
                "display name contains disallowed emoji characters",
            ));
        }

        Ok(Self(trimmed.nfc().collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for DisplayName {
    fn eq(&self, other: &Self) -> bool {
        self.folded() == other.folded()
    }
}

impl Eq for DisplayName {}

impl Hash for DisplayName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded().hash(state);
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> Self {
        name.0
    }
}
