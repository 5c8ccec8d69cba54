//! Weekly topic: one round of submissions followed by a voting window

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{ensure_vacant, lookup, lookup_mut, require_id, Entity};
use super::events::{PhotosSubmitted, TopicStarted, VotingClosed};
use super::{
    Challenge, ChallengeStatus, ContentSafetyTag, Period, Photo, PhotoLimits, SideQuest, Slug,
    Vote,
};
use crate::error::{Error, Result};

/// Scheduled → Active → Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicState {
    Scheduled,
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTopic {
    id: Uuid,
    group_id: Uuid,
    challenge_id: Uuid,
    active_period: Period,
    voting_period: Period,
    state: TopicState,
    /// Photos submitted so far, per membership
    submissions: HashMap<Uuid, u32>,
    side_quests: HashMap<Uuid, SideQuest>,
    /// Keyed by membership id: one vote per member
    votes: HashMap<Uuid, Vote>,
    photos: HashMap<Uuid, Photo>,
}

impl WeeklyTopic {
    /// Build a topic for `challenge`, which must be Approved or already
    /// Scheduled. Advancing the challenge is left to the caller so nothing
    /// changes if the topic is rejected.
    pub fn schedule(
        id: Uuid,
        group_id: Uuid,
        challenge: &Challenge,
        active_period: Period,
        voting_period: Period,
    ) -> Result<Self> {
        require_id(id, "weekly_topic_id")?;
        require_id(group_id, "group_id")?;

        if !matches!(
            challenge.status(),
            ChallengeStatus::Approved | ChallengeStatus::Scheduled
        ) {
            return Err(Error::invalid(format!(
                "weekly topics need an approved challenge; {} is {:?}",
                challenge.id(),
                challenge.status()
            )));
        }

        if voting_period.start() < active_period.end() {
            return Err(Error::validation(
                "voting must open no earlier than the end of the active period",
            ));
        }

        Ok(Self {
            id,
            group_id,
            challenge_id: challenge.id(),
            active_period,
            voting_period,
            state: TopicState::Scheduled,
            submissions: HashMap::new(),
            side_quests: HashMap::new(),
            votes: HashMap::new(),
            photos: HashMap::new(),
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn challenge_id(&self) -> Uuid {
        self.challenge_id
    }

    pub fn active_period(&self) -> &Period {
        &self.active_period
    }

    pub fn voting_period(&self) -> &Period {
        &self.voting_period
    }

    pub fn state(&self) -> TopicState {
        self.state
    }

    pub fn submissions_by(&self, membership_id: Uuid) -> u32 {
        self.submissions.get(&membership_id).copied().unwrap_or(0)
    }

    pub fn side_quests(&self) -> impl Iterator<Item = &SideQuest> {
        self.side_quests.values()
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn vote_of(&self, membership_id: Uuid) -> Option<&Vote> {
        self.votes.get(&membership_id)
    }

    pub fn photos(&self) -> impl Iterator<Item = &Photo> {
        self.photos.values()
    }

    pub fn photo(&self, photo_id: Uuid) -> Result<&Photo> {
        lookup(&self.photos, photo_id)
    }

    pub(crate) fn photo_mut(&mut self, photo_id: Uuid) -> Result<&mut Photo> {
        lookup_mut(&mut self.photos, photo_id)
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<TopicStarted> {
        if self.state != TopicState::Scheduled {
            return Err(Error::invalid(format!(
                "only scheduled topics can be started; topic {} is {:?}",
                self.id, self.state
            )));
        }
        if !self.active_period.contains(at) {
            return Err(Error::invalid(
                "topics may only start within their active period",
            ));
        }

        self.state = TopicState::Active;
        Ok(TopicStarted {
            group_id: self.group_id,
            weekly_topic_id: self.id,
            challenge_id: self.challenge_id,
            active_period: self.active_period,
            occurred_on: at,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit_photo(
        &mut self,
        photo_id: Uuid,
        membership_id: Uuid,
        tag: ContentSafetyTag,
        limits: &PhotoLimits,
        submitted_at: DateTime<Utc>,
        file_size_bytes: u64,
        long_edge_pixels: u32,
    ) -> Result<(&Photo, PhotosSubmitted)> {
        if self.state != TopicState::Active {
            return Err(Error::invalid(
                "photos may only be submitted while the topic is active",
            ));
        }
        if !self.active_period.contains(submitted_at) {
            return Err(Error::invalid(
                "submissions must occur within the active period",
            ));
        }

        let count = self.submissions_by(membership_id);
        if count >= limits.max_submissions_per_member() {
            return Err(Error::invalid(format!(
                "member has reached the limit of {} submissions for this topic",
                limits.max_submissions_per_member()
            )));
        }

        ensure_vacant(&self.photos, photo_id)?;
        let photo = Photo::new(
            photo_id,
            self.id,
            membership_id,
            tag,
            submitted_at,
            file_size_bytes,
            long_edge_pixels,
            limits,
        )?;

        self.submissions.insert(membership_id, count + 1);
        let event = PhotosSubmitted {
            group_id: self.group_id,
            weekly_topic_id: self.id,
            photo_id,
            membership_id,
            tag,
            occurred_on: submitted_at,
        };
        let photo = self.photos.entry(photo_id).or_insert(photo);
        Ok((photo, event))
    }

    pub fn close_voting(
        &mut self,
        closed_at: DateTime<Utc>,
        vote_totals: BTreeMap<Uuid, u32>,
    ) -> Result<VotingClosed> {
        if self.state != TopicState::Active {
            return Err(Error::invalid(format!(
                "only active topics can close voting; topic {} is {:?}",
                self.id, self.state
            )));
        }
        if !self.voting_period.contains(closed_at) {
            return Err(Error::invalid(
                "voting can only close within the voting window",
            ));
        }

        self.state = TopicState::Closed;
        Ok(VotingClosed {
            group_id: self.group_id,
            weekly_topic_id: self.id,
            voting_period: self.voting_period,
            vote_totals,
            occurred_on: closed_at,
        })
    }

    pub fn add_side_quest(&mut self, quest_id: Uuid, slug: Slug, title: &str) -> Result<&SideQuest> {
        ensure_vacant(&self.side_quests, quest_id)?;
        if self.side_quests.values().any(|q| q.slug() == &slug) {
            return Err(Error::invalid(format!(
                "side quest slug '{slug}' is already used in this topic"
            )));
        }

        let quest = SideQuest::new(quest_id, self.id, slug, title)?;
        Ok(self.side_quests.entry(quest_id).or_insert(quest))
    }

    /// A member's second vote replaces the first in place
    pub fn cast_vote(
        &mut self,
        vote_id: Uuid,
        membership_id: Uuid,
        photo_id: Uuid,
        cast_at: DateTime<Utc>,
    ) -> Result<&Vote> {
        if self.state != TopicState::Active {
            return Err(Error::invalid(
                "voting is only permitted while the topic is active",
            ));
        }
        if !self.voting_period.contains(cast_at) {
            return Err(Error::invalid(
                "votes must be cast within the voting window",
            ));
        }
        lookup(&self.photos, photo_id)?;

        if !self.votes.contains_key(&membership_id) {
            if self.votes.values().any(|v| v.id() == vote_id) {
                return Err(Error::invalid(format!("Vote {vote_id} already exists")));
            }
            let vote = Vote::new(vote_id, self.id, membership_id, photo_id, cast_at)?;
            return Ok(self.votes.entry(membership_id).or_insert(vote));
        }

        let existing = lookup_mut(&mut self.votes, membership_id)?;
        existing.replace_candidate(photo_id, cast_at)?;
        Ok(existing)
    }
}

impl Entity for WeeklyTopic {
    const KIND: &'static str = "WeeklyTopic";

    fn id(&self) -> Uuid {
        self.id
    }
}
