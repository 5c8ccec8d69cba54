//! URL-safe slug value object

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

pub const MIN_SLUG_LENGTH: usize = 3;
pub const MAX_SLUG_LENGTH: usize = 40;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"));

/// Lowercase ASCII identifier with single hyphens between words.
///
/// Input is normalized before validation: diacritics are stripped,
/// whitespace, underscores and hyphens collapse to one hyphen, and any other
/// character is dropped. Equality is exact on the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub fn new(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Err(Error::validation("slug is required"));
        }

        let normalized = normalize(value);
        let len = normalized.len();
        if !(MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&len) {
            return Err(Error::validation(format!(
                "slug must be between {MIN_SLUG_LENGTH} and {MAX_SLUG_LENGTH} characters"
            )));
        }

        if !SLUG_PATTERN.is_match(&normalized) {
            return Err(Error::validation(
                "slug must contain lowercase letters or digits separated by single hyphens",
            ));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for ch in value.nfd() {
        if is_combining_mark(ch) {
            continue;
        }

        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_hyphen = !out.is_empty();
            continue;
        }

        if ch.is_ascii_alphanumeric() {
            if pending_hyphen {
                out.push('-');
                pending_hyphen = false;
            }
            out.push(ch.to_ascii_lowercase());
        }
    }

    out
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}
