//! Photo comments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, Entity};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    id: Uuid,
    photo_id: Uuid,
    weekly_topic_id: Uuid,
    membership_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(
        id: Uuid,
        photo_id: Uuid,
        weekly_topic_id: Uuid,
        membership_id: Uuid,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        require_id(id, "comment_id")?;
        require_id(photo_id, "photo_id")?;
        require_id(weekly_topic_id, "weekly_topic_id")?;
        require_id(membership_id, "membership_id")?;

        Ok(Self {
            id,
            photo_id,
            weekly_topic_id,
            membership_id,
            text: sanitize(text)?,
            created_at,
            deleted_at: None,
        })
    }

    pub fn photo_id(&self) -> Uuid {
        self.photo_id
    }

    pub fn weekly_topic_id(&self) -> Uuid {
        self.weekly_topic_id
    }

    pub fn membership_id(&self) -> Uuid {
        self.membership_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Keeps the first deletion time
    pub fn soft_delete(&mut self, at: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
        }
    }
}

/// Drop control characters except newlines
fn sanitize(text: &str) -> Result<String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();

    if cleaned.trim().is_empty() {
        return Err(Error::validation("comments must include visible content"));
    }
    Ok(cleaned)
}

impl Entity for Comment {
    const KIND: &'static str = "Comment";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> Result<Comment> {
        Comment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            text,
            Utc::now(),
        )
    }

    #[test]
    fn test_sanitizes_text() {
        let c = comment("  nice\u{7} shot\nreally  ").unwrap();
        assert_eq!(c.text(), "nice shot\nreally");
    }

    #[test]
    fn test_rejects_empty_text() {
        assert!(comment("   ").is_err());
        assert!(comment("\u{1}\u{2}").is_err());
    }

    #[test]
    fn test_soft_delete_keeps_first_time() {
        let mut c = comment("hello").unwrap();
        let first = Utc::now();
        c.soft_delete(first);
        c.soft_delete(first + chrono::Duration::hours(1));
        assert!(c.is_deleted());
        assert_eq!(c.deleted_at(), Some(first));
    }
}
