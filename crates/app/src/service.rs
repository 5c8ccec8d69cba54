//! Group application service
//!
//! Every command follows the same cycle: load the group, run exactly one
//! aggregate operation, save, then drain and dispatch the raised events.
//! A save that loses an optimistic-concurrency race is retried from a fresh
//! load. Ids and timestamps are fixed before the first attempt, so a retry
//! replays the same command.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shutterclub_core::events::{TopicStarted, VotingClosed};
use shutterclub_core::{
    ContentSafetyTag, DomainEvent, Entity, Error as CoreError, Group, GroupRepository,
    MembershipRole, Period, PhotoLimits, Result as CoreResult, Slug,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::{Clock, IdGenerator};
use crate::error::Result;
use crate::events::EventDispatcher;
use crate::tally::tally_votes;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What a caller needs to deliver a freshly issued invite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvite {
    pub group_id: Uuid,
    pub invite_id: Uuid,
    pub token: String,
    pub email: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct GroupService<R> {
    repo: R,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    dispatcher: Arc<dyn EventDispatcher>,
    max_attempts: u32,
}

impl<R: GroupRepository> GroupService<R> {
    pub fn new(
        repo: R,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            repo,
            clock,
            ids,
            dispatcher,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn group(&self, group_id: Uuid) -> Result<Group> {
        Ok(self.repo.load(group_id)?)
    }

    #[instrument(skip(self))]
    pub fn create_group(&self, slug: &str, limits: Option<PhotoLimits>) -> Result<Uuid> {
        let slug = Slug::new(slug)?;
        let mut group = Group::create(self.ids.new_id(), slug, limits)?;
        self.repo.save(&mut group)?;

        info!(group_id = %group.id(), slug = %group.slug(), "group created");
        self.publish(group.take_domain_events());
        Ok(group.id())
    }

    #[instrument(skip(self))]
    pub fn add_member(&self, group_id: Uuid, user_id: Uuid, role: MembershipRole) -> Result<Uuid> {
        let membership_id = self.ids.new_id();
        self.execute(group_id, "add_membership", |group| {
            group.add_membership(membership_id, user_id, role).map(Entity::id)
        })
    }

    #[instrument(skip(self))]
    pub fn suspend_member(&self, group_id: Uuid, membership_id: Uuid) -> Result<()> {
        self.execute(group_id, "suspend_membership", |group| {
            group.suspend_membership(membership_id)
        })
    }

    #[instrument(skip(self))]
    pub fn reinstate_member(&self, group_id: Uuid, membership_id: Uuid) -> Result<()> {
        self.execute(group_id, "reinstate_membership", |group| {
            group.reinstate_membership(membership_id)
        })
    }

    #[instrument(skip(self))]
    pub fn promote_member(&self, group_id: Uuid, membership_id: Uuid) -> Result<()> {
        self.execute(group_id, "promote_membership", |group| {
            group.promote_membership(membership_id)
        })
    }

    /// Issue an invite valid from now for `valid_for`
    #[instrument(skip(self, token))]
    pub fn issue_invite(
        &self,
        group_id: Uuid,
        inviter_membership_id: Uuid,
        email: &str,
        token: &str,
        valid_for: Duration,
    ) -> Result<IssuedInvite> {
        if valid_for <= Duration::zero() {
            return Err(CoreError::Validation("invite validity must be positive".into()).into());
        }
        let invite_id = self.ids.new_id();
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(valid_for)
            .ok_or_else(|| CoreError::Validation("invite validity is out of range".into()))?;
        let period = Period::new(issued_at, expires_at)?;

        self.execute(group_id, "issue_invite", |group| {
            let invite = group.issue_invite(invite_id, token, email, inviter_membership_id, period, issued_at)?;
            Ok(IssuedInvite {
                group_id,
                invite_id,
                token: invite.token().to_string(),
                email: invite.email().to_string(),
                issued_at,
                expires_at: invite.expires_at(),
            })
        })
    }

    #[instrument(skip(self, token))]
    pub fn accept_invite(&self, group_id: Uuid, token: &str, user_id: Uuid) -> Result<Uuid> {
        let membership_id = self.ids.new_id();
        let accepted_at = self.clock.now();
        self.execute(group_id, "accept_invite", |group| {
            group
                .accept_invite(token, membership_id, user_id, accepted_at)
                .map(Entity::id)
        })
    }

    #[instrument(skip(self))]
    pub fn expire_invite(&self, group_id: Uuid, invite_id: Uuid, expired_at: DateTime<Utc>) -> Result<()> {
        self.execute(group_id, "expire_invite", |group| {
            group.expire_invite(invite_id, expired_at)
        })
    }

    #[instrument(skip(self))]
    pub fn propose_challenge(&self, group_id: Uuid, title: &str, slug: &str) -> Result<Uuid> {
        let challenge_id = self.ids.new_id();
        let slug = Slug::new(slug)?;
        self.execute(group_id, "propose_challenge", |group| {
            group
                .propose_challenge(challenge_id, title, slug.clone())
                .map(Entity::id)
        })
    }

    #[instrument(skip(self))]
    pub fn approve_challenge(&self, group_id: Uuid, challenge_id: Uuid) -> Result<()> {
        self.execute(group_id, "approve_challenge", |group| {
            group.approve_challenge(challenge_id)
        })
    }

    #[instrument(skip(self))]
    pub fn schedule_topic(
        &self,
        group_id: Uuid,
        challenge_id: Uuid,
        active: Period,
        voting: Period,
    ) -> Result<Uuid> {
        let topic_id = self.ids.new_id();
        self.execute(group_id, "schedule_weekly_topic", |group| {
            group
                .schedule_weekly_topic(topic_id, challenge_id, active, voting)
                .map(Entity::id)
        })
    }

    #[instrument(skip(self))]
    pub fn start_topic(&self, group_id: Uuid, topic_id: Uuid) -> Result<TopicStarted> {
        let started_at = self.clock.now();
        self.execute(group_id, "start_topic", |group| group.start_topic(topic_id, started_at))
    }

    #[instrument(skip(self))]
    pub fn submit_photo(
        &self,
        group_id: Uuid,
        topic_id: Uuid,
        membership_id: Uuid,
        tag: ContentSafetyTag,
        file_size_bytes: u64,
        long_edge_pixels: u32,
    ) -> Result<Uuid> {
        let photo_id = self.ids.new_id();
        let submitted_at = self.clock.now();
        self.execute(group_id, "submit_photo", |group| {
            group
                .submit_photo(
                    topic_id,
                    photo_id,
                    membership_id,
                    tag,
                    submitted_at,
                    file_size_bytes,
                    long_edge_pixels,
                )
                .map(Entity::id)
        })
    }

    #[instrument(skip(self))]
    pub fn cast_vote(&self, group_id: Uuid, topic_id: Uuid, membership_id: Uuid, photo_id: Uuid) -> Result<Uuid> {
        let vote_id = self.ids.new_id();
        let cast_at = self.clock.now();
        self.execute(group_id, "cast_vote", |group| {
            group
                .cast_vote(topic_id, vote_id, membership_id, photo_id, cast_at)
                .map(Entity::id)
        })
    }

    /// Tally the topic's votes and close it
    #[instrument(skip(self))]
    pub fn close_topic(&self, group_id: Uuid, topic_id: Uuid) -> Result<VotingClosed> {
        let closed_at = self.clock.now();
        self.execute(group_id, "close_topic", |group| {
            let totals = tally_votes(group.topic(topic_id)?);
            group.close_topic(topic_id, closed_at, totals)
        })
    }

    #[instrument(skip(self))]
    pub fn record_event(&self, group_id: Uuid, description: &str) -> Result<Uuid> {
        let event_id = self.ids.new_id();
        let at = self.clock.now();
        self.execute(group_id, "record_event", |group| {
            group.record_event(event_id, description, at).map(Entity::id)
        })
    }

    fn execute<T>(
        &self,
        group_id: Uuid,
        operation: &'static str,
        mut op: impl FnMut(&mut Group) -> CoreResult<T>,
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            let mut group = self.repo.load(group_id)?;
            let value = op(&mut group).inspect_err(|e| {
                warn!(%group_id, operation, error = %e, "operation rejected");
            })?;

            match self.repo.save(&mut group) {
                Ok(()) => {
                    info!(%group_id, operation, version = group.version(), "group updated");
                    self.publish(group.take_domain_events());
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(%group_id, operation, attempt, error = %e, "save conflicted, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn publish(&self, events: Vec<DomainEvent>) {
        for event in &events {
            if let Err(e) = self.dispatcher.dispatch(event) {
                warn!(event = event.name(), error = %e, "event dispatch failed");
            }
        }
    }
}
