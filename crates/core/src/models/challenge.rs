//! Challenge proposal lifecycle

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, require_text, Entity};
use super::Slug;
use crate::error::{Error, Result};

/// Strictly linear: Proposed → Approved → Scheduled → Used → Archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Proposed,
    Approved,
    Scheduled,
    Used,
    Archived,
}

impl ChallengeStatus {
    /// The only status a challenge may move to from here
    pub fn successor(self) -> Option<ChallengeStatus> {
        match self {
            ChallengeStatus::Proposed => Some(ChallengeStatus::Approved),
            ChallengeStatus::Approved => Some(ChallengeStatus::Scheduled),
            ChallengeStatus::Scheduled => Some(ChallengeStatus::Used),
            ChallengeStatus::Used => Some(ChallengeStatus::Archived),
            ChallengeStatus::Archived => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    id: Uuid,
    group_id: Uuid,
    title: String,
    slug: Slug,
    status: ChallengeStatus,
}

impl Challenge {
    pub fn propose(id: Uuid, group_id: Uuid, title: &str, slug: Slug) -> Result<Self> {
        require_id(id, "challenge_id")?;
        require_id(group_id, "group_id")?;
        let title = require_text(title, "title")?;

        Ok(Self {
            id,
            group_id,
            title,
            slug,
            status: ChallengeStatus::Proposed,
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    pub fn approve(&mut self) -> Result<()> {
        self.advance(ChallengeStatus::Proposed)
    }

    pub fn schedule(&mut self) -> Result<()> {
        self.advance(ChallengeStatus::Approved)
    }

    pub fn mark_used(&mut self) -> Result<()> {
        self.advance(ChallengeStatus::Scheduled)
    }

    pub fn archive(&mut self) -> Result<()> {
        self.advance(ChallengeStatus::Used)
    }

    fn advance(&mut self, expected: ChallengeStatus) -> Result<()> {
        match self.status.successor() {
            Some(next) if self.status == expected => {
                self.status = next;
                Ok(())
            }
            _ => Err(Error::invalid(format!(
                "challenge {} is {:?}; only {:?} challenges can move on",
                self.id, self.status, expected
            ))),
        }
    }
}

impl Entity for Challenge {
    const KIND: &'static str = "Challenge";

    fn id(&self) -> Uuid {
        self.id
    }
}
