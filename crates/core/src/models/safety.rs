//! Content safety classification

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Severity classification, ordered from least to most strict
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ContentSafetyTag {
    #[default]
    Safe = 0,
    Mature = 1,
    Restricted = 2,
}

impl ContentSafetyTag {
    /// Moving to a stricter (or the same) tag is always allowed. Relaxing a
    /// tag needs a moderator's approval.
    pub fn ensure_transition(self, next: ContentSafetyTag, has_moderator_approval: bool) -> Result<()> {
        if next >= self || has_moderator_approval {
            return Ok(());
        }
        Err(Error::invalid(format!(
            "downgrading content safety from {self} to {next} requires moderator approval"
        )))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentSafetyTag::Safe => "safe",
            ContentSafetyTag::Mature => "mature",
            ContentSafetyTag::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for ContentSafetyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ContentSafetyTag::*;

    #[test]
    fn test_ordering() {
        assert!(Safe < Mature);
        assert!(Mature < Restricted);
    }

    #[test]
    fn test_stricter_always_allowed() {
        assert!(Safe.ensure_transition(Mature, false).is_ok());
        assert!(Safe.ensure_transition(Restricted, false).is_ok());
        assert!(Mature.ensure_transition(Mature, false).is_ok());
    }

    #[test]
    fn test_relaxing_requires_approval() {
        assert!(matches!(
            Restricted.ensure_transition(Safe, false),
            Err(Error::InvalidOperation(_))
        ));
        assert!(Restricted.ensure_transition(Safe, true).is_ok());
        assert!(Mature.ensure_transition(Safe, true).is_ok());
    }
}
