//! Domain events raised by the Group aggregate
//!
//! Events carry ids and plain values only, never references into the
//! aggregate, so they can be serialized into the outbox and handed to
//! downstream consumers after the group is saved.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ContentSafetyTag, Period};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSent {
    pub group_id: Uuid,
    pub invite_id: Uuid,
    pub inviter_membership_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotosSubmitted {
    pub group_id: Uuid,
    pub weekly_topic_id: Uuid,
    pub photo_id: Uuid,
    pub membership_id: Uuid,
    pub tag: ContentSafetyTag,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStarted {
    pub group_id: Uuid,
    pub weekly_topic_id: Uuid,
    pub challenge_id: Uuid,
    pub active_period: Period,
    pub occurred_on: DateTime<Utc>,
}

/// Vote totals are keyed by photo id and passed through as supplied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingClosed {
    pub group_id: Uuid,
    pub weekly_topic_id: Uuid,
    pub voting_period: Period,
    pub vote_totals: BTreeMap<Uuid, u32>,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    InviteSent(InviteSent),
    PhotosSubmitted(PhotosSubmitted),
    TopicStarted(TopicStarted),
    VotingClosed(VotingClosed),
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::InviteSent(_) => "invite_sent",
            DomainEvent::PhotosSubmitted(_) => "photos_submitted",
            DomainEvent::TopicStarted(_) => "topic_started",
            DomainEvent::VotingClosed(_) => "voting_closed",
        }
    }

    pub fn group_id(&self) -> Uuid {
        match self {
            DomainEvent::InviteSent(e) => e.group_id,
            DomainEvent::PhotosSubmitted(e) => e.group_id,
            DomainEvent::TopicStarted(e) => e.group_id,
            DomainEvent::VotingClosed(e) => e.group_id,
        }
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::InviteSent(e) => e.occurred_on,
            DomainEvent::PhotosSubmitted(e) => e.occurred_on,
            DomainEvent::TopicStarted(e) => e.occurred_on,
            DomainEvent::VotingClosed(e) => e.occurred_on,
        }
    }
}

impl From<InviteSent> for DomainEvent {
    fn from(event: InviteSent) -> Self {
        DomainEvent::InviteSent(event)
    }
}

impl From<PhotosSubmitted> for DomainEvent {
    fn from(event: PhotosSubmitted) -> Self {
        DomainEvent::PhotosSubmitted(event)
    }
}

impl From<TopicStarted> for DomainEvent {
    fn from(event: TopicStarted) -> Self {
        DomainEvent::TopicStarted(event)
    }
}

impl From<VotingClosed> for DomainEvent {
    fn from(event: VotingClosed) -> Self {
        DomainEvent::VotingClosed(event)
    }
}
