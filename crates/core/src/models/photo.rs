//! Submitted photos

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, Entity};
use super::{Comment, ContentSafetyTag, PhotoLimits};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    id: Uuid,
    weekly_topic_id: Uuid,
    membership_id: Uuid,
    tag: ContentSafetyTag,
    submitted_at: DateTime<Utc>,
    file_size_bytes: u64,
    long_edge_pixels: u32,
    likes: BTreeSet<Uuid>,
    comments: Vec<Comment>,
}

impl Photo {
    /// Validates the upload against `limits`; only weekly topics create photos
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Uuid,
        weekly_topic_id: Uuid,
        membership_id: Uuid,
        tag: ContentSafetyTag,
        submitted_at: DateTime<Utc>,
        file_size_bytes: u64,
        long_edge_pixels: u32,
        limits: &PhotoLimits,
    ) -> Result<Self> {
        require_id(id, "photo_id")?;
        require_id(weekly_topic_id, "weekly_topic_id")?;
        require_id(membership_id, "membership_id")?;

        if file_size_bytes == 0 {
            return Err(Error::validation("file size must be greater than zero"));
        }
        if long_edge_pixels == 0 {
            return Err(Error::validation("long edge must be greater than zero"));
        }

        if file_size_bytes > limits.max_file_size_bytes() {
            return Err(Error::invalid(format!(
                "photo is {file_size_bytes} bytes; the limit is {}",
                limits.max_file_size_bytes()
            )));
        }
        if long_edge_pixels > limits.max_long_edge_pixels() {
            return Err(Error::invalid(format!(
                "photo long edge is {long_edge_pixels}px; the limit is {}px",
                limits.max_long_edge_pixels()
            )));
        }

        Ok(Self {
            id,
            weekly_topic_id,
            membership_id,
            tag,
            submitted_at,
            file_size_bytes,
            long_edge_pixels,
            likes: BTreeSet::new(),
            comments: Vec::new(),
        })
    }

    pub fn weekly_topic_id(&self) -> Uuid {
        self.weekly_topic_id
    }

    pub fn membership_id(&self) -> Uuid {
        self.membership_id
    }

    pub fn tag(&self) -> ContentSafetyTag {
        self.tag
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    pub fn long_edge_pixels(&self) -> u32 {
        self.long_edge_pixels
    }

    pub fn likes(&self) -> &BTreeSet<Uuid> {
        &self.likes
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Returns false when this membership already liked the photo
    pub fn try_like(&mut self, membership_id: Uuid) -> Result<bool> {
        require_id(membership_id, "membership_id")?;
        Ok(self.likes.insert(membership_id))
    }

    pub fn add_comment(&mut self, comment: Comment) -> Result<()> {
        if comment.weekly_topic_id() != self.weekly_topic_id {
            return Err(Error::invalid(
                "comments must belong to the same topic as the photo",
            ));
        }
        if comment.photo_id() != self.id {
            return Err(Error::invalid("comment refers to a different photo"));
        }
        self.comments.push(comment);
        Ok(())
    }

    pub(crate) fn comment_mut(&mut self, comment_id: Uuid) -> Result<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|c| c.id() == comment_id)
            .ok_or_else(|| Error::not_found(Comment::KIND, comment_id))
    }

    pub fn change_safety_tag(&mut self, next: ContentSafetyTag, has_moderator_approval: bool) -> Result<()> {
        self.tag.ensure_transition(next, has_moderator_approval)?;
        self.tag = next;
        Ok(())
    }
}

impl Entity for Photo {
    const KIND: &'static str = "Photo";

    fn id(&self) -> Uuid {
        self.id
    }
}
