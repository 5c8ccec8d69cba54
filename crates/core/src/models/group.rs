//! Group aggregate root
//!
//! A Group owns every membership, invite, challenge, weekly topic and event
//! log entry that belongs to it. All mutations go through the methods here,
//! and each one validates completely before touching any state, so a failed
//! call leaves the aggregate exactly as it was.
//!
//! Domain events raised by successful operations are buffered on the group
//! and drained with [`Group::take_domain_events`] once the group is saved.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::entity::{ensure_vacant, lookup, lookup_mut, require_id, Entity};
use super::events::{DomainEvent, InviteSent, TopicStarted, VotingClosed};
use super::invite::normalize_token;
use super::{
    Challenge, ChallengeStatus, Comment, ContentSafetyTag, EventItem, Invite, Membership,
    MembershipRole, Period, Photo, PhotoLimits, SideQuest, Slug, Vote, WeeklyTopic,
};
use crate::error::{Error, Result};
use crate::invariants::assert_group_invariants;
use crate::permissions::{GroupAction, PermissionMatrix};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    id: Uuid,
    slug: Slug,
    photo_limits: PhotoLimits,
    active_topic_id: Option<Uuid>,
    memberships: HashMap<Uuid, Membership>,
    challenges: HashMap<Uuid, Challenge>,
    topics: HashMap<Uuid, WeeklyTopic>,
    /// Keyed by normalized token
    invites: HashMap<String, Invite>,
    events: Vec<EventItem>,
    /// Users holding an active membership; rebuilt by `reindex` after load
    #[serde(skip)]
    active_users: HashSet<Uuid>,
    /// Stored version this instance was loaded at; owned by the repository
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    domain_events: Vec<DomainEvent>,
}

impl Group {
    pub fn create(id: Uuid, slug: Slug, limits: Option<PhotoLimits>) -> Result<Self> {
        require_id(id, "group_id")?;

        Ok(Self {
            id,
            slug,
            photo_limits: limits.unwrap_or_default(),
            active_topic_id: None,
            memberships: HashMap::new(),
            challenges: HashMap::new(),
            topics: HashMap::new(),
            invites: HashMap::new(),
            events: Vec::new(),
            active_users: HashSet::new(),
            version: 0,
            domain_events: Vec::new(),
        })
    }

    // ---- reads ----

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn photo_limits(&self) -> PhotoLimits {
        self.photo_limits
    }

    pub fn active_topic_id(&self) -> Option<Uuid> {
        self.active_topic_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn memberships(&self) -> impl Iterator<Item = &Membership> {
        self.memberships.values()
    }

    pub fn membership(&self, membership_id: Uuid) -> Result<&Membership> {
        lookup(&self.memberships, membership_id)
    }

    /// The user's active membership, if any
    pub fn active_membership_of(&self, user_id: Uuid) -> Option<&Membership> {
        self.memberships
            .values()
            .find(|m| m.user_id() == user_id && m.is_active())
    }

    pub fn challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.values()
    }

    pub fn challenge(&self, challenge_id: Uuid) -> Result<&Challenge> {
        lookup(&self.challenges, challenge_id)
    }

    pub fn topics(&self) -> impl Iterator<Item = &WeeklyTopic> {
        self.topics.values()
    }

    pub fn topic(&self, topic_id: Uuid) -> Result<&WeeklyTopic> {
        lookup(&self.topics, topic_id)
    }

    pub fn invites(&self) -> impl Iterator<Item = &Invite> {
        self.invites.values()
    }

    pub fn invite(&self, invite_id: Uuid) -> Result<&Invite> {
        self.invites
            .values()
            .find(|i| i.id() == invite_id)
            .ok_or_else(|| Error::not_found(Invite::KIND, invite_id))
    }

    /// Tokens compare case-insensitively
    pub fn invite_by_token(&self, token: &str) -> Result<&Invite> {
        let key = normalize_token(token);
        self.invites
            .get(&key)
            .ok_or_else(|| Error::not_found(Invite::KIND, key))
    }

    pub fn events(&self) -> &[EventItem] {
        &self.events
    }

    pub fn domain_events(&self) -> &[DomainEvent] {
        &self.domain_events
    }

    /// Drain buffered domain events; call once the group has been saved
    pub fn take_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.domain_events)
    }

    // ---- memberships ----

    pub fn add_membership(
        &mut self,
        membership_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<&Membership> {
        ensure_vacant(&self.memberships, membership_id)?;
        self.ensure_can_join(user_id)?;
        let membership = Membership::new(membership_id, self.id, user_id, role)?;

        debug!(group_id = %self.id, %membership_id, %user_id, %role, "membership added");
        Ok(self.insert_membership(membership))
    }

    /// Suspending an already suspended membership is a no-op
    pub fn suspend_membership(&mut self, membership_id: Uuid) -> Result<()> {
        let membership = lookup_mut(&mut self.memberships, membership_id)?;
        if membership.is_active() {
            membership.suspend();
            self.active_users.remove(&membership.user_id());
            debug!(group_id = %self.id, %membership_id, "membership suspended");
        }
        self.check_invariants();
        Ok(())
    }

    /// Reinstating an active membership is a no-op. Fails when the user has
    /// since joined again under another membership.
    pub fn reinstate_membership(&mut self, membership_id: Uuid) -> Result<()> {
        let membership = lookup(&self.memberships, membership_id)?;
        if membership.is_active() {
            return Ok(());
        }
        let user_id = membership.user_id();
        self.ensure_can_join(user_id)?;

        lookup_mut(&mut self.memberships, membership_id)?.reinstate();
        self.active_users.insert(user_id);
        debug!(group_id = %self.id, %membership_id, "membership reinstated");
        self.check_invariants();
        Ok(())
    }

    pub fn promote_membership(&mut self, membership_id: Uuid) -> Result<()> {
        lookup_mut(&mut self.memberships, membership_id)?.promote_to_owner();
        debug!(group_id = %self.id, %membership_id, "membership promoted to owner");
        Ok(())
    }

    // ---- invites ----

    pub fn issue_invite(
        &mut self,
        invite_id: Uuid,
        token: &str,
        email: &str,
        inviter_membership_id: Uuid,
        valid_for: Period,
        issued_at: DateTime<Utc>,
    ) -> Result<&Invite> {
        self.authorize(inviter_membership_id, GroupAction::IssueInvite)?;
        if self.invites.values().any(|i| i.id() == invite_id) {
            return Err(Error::invalid(format!("Invite {invite_id} already exists")));
        }

        let invite = Invite::new(
            invite_id,
            self.id,
            inviter_membership_id,
            token,
            email,
            valid_for,
            issued_at,
        )?;
        if self.invites.contains_key(invite.token()) {
            return Err(Error::invalid("invite token is already in use"));
        }

        self.raise(InviteSent {
            group_id: self.id,
            invite_id,
            inviter_membership_id,
            email: invite.email().to_string(),
            expires_at: invite.expires_at(),
            occurred_on: issued_at,
        });
        debug!(group_id = %self.id, %invite_id, "invite issued");

        let key = invite.token().to_string();
        Ok(self.invites.entry(key).or_insert(invite))
    }

    /// Accept a pending invite and create a Member membership for the user.
    /// Both the invite and the new membership are checked before either
    /// changes.
    pub fn accept_invite(
        &mut self,
        token: &str,
        membership_id: Uuid,
        user_id: Uuid,
        accepted_at: DateTime<Utc>,
    ) -> Result<&Membership> {
        let key = normalize_token(token);
        lookup_invite(&self.invites, &key)?.ensure_acceptable(accepted_at)?;
        ensure_vacant(&self.memberships, membership_id)?;
        self.ensure_can_join(user_id)?;
        let membership = Membership::new(membership_id, self.id, user_id, MembershipRole::Member)?;

        let invite = self
            .invites
            .get_mut(&key)
            .ok_or_else(|| Error::not_found(Invite::KIND, &key))?;
        invite.accept(accepted_at)?;

        debug!(group_id = %self.id, invite_id = %invite.id(), %membership_id, "invite accepted");
        Ok(self.insert_membership(membership))
    }

    pub fn expire_invite(&mut self, invite_id: Uuid, expired_at: DateTime<Utc>) -> Result<()> {
        let invite = self
            .invites
            .values_mut()
            .find(|i| i.id() == invite_id)
            .ok_or_else(|| Error::not_found(Invite::KIND, invite_id))?;
        invite.expire(expired_at)?;
        debug!(group_id = %self.id, %invite_id, status = ?invite.status(), "invite expiry processed");
        Ok(())
    }

    // ---- challenges ----

    pub fn propose_challenge(&mut self, challenge_id: Uuid, title: &str, slug: Slug) -> Result<&Challenge> {
        ensure_vacant(&self.challenges, challenge_id)?;
        if self.challenges.values().any(|c| c.slug() == &slug) {
            return Err(Error::invalid(format!(
                "challenge slug '{slug}' is already used in this group"
            )));
        }
        let challenge = Challenge::propose(challenge_id, self.id, title, slug)?;

        debug!(group_id = %self.id, %challenge_id, "challenge proposed");
        Ok(self.challenges.entry(challenge_id).or_insert(challenge))
    }

    pub fn approve_challenge(&mut self, challenge_id: Uuid) -> Result<()> {
        lookup_mut(&mut self.challenges, challenge_id)?.approve()
    }

    pub fn mark_challenge_used(&mut self, challenge_id: Uuid) -> Result<()> {
        lookup_mut(&mut self.challenges, challenge_id)?.mark_used()
    }

    pub fn archive_challenge(&mut self, challenge_id: Uuid) -> Result<()> {
        lookup_mut(&mut self.challenges, challenge_id)?.archive()
    }

    // ---- weekly topics ----

    /// Schedule a topic for an Approved or Scheduled challenge. An Approved
    /// challenge moves to Scheduled once the topic is accepted.
    pub fn schedule_weekly_topic(
        &mut self,
        topic_id: Uuid,
        challenge_id: Uuid,
        active_period: Period,
        voting_period: Period,
    ) -> Result<&WeeklyTopic> {
        ensure_vacant(&self.topics, topic_id)?;
        let challenge = lookup(&self.challenges, challenge_id)?;
        active_period.ensure_does_not_overlap(self.topics.values().map(WeeklyTopic::active_period))?;
        let topic = WeeklyTopic::schedule(topic_id, self.id, challenge, active_period, voting_period)?;

        if challenge.status() == ChallengeStatus::Approved {
            lookup_mut(&mut self.challenges, challenge_id)?.schedule()?;
        }

        debug!(group_id = %self.id, %topic_id, %challenge_id, period = %active_period, "weekly topic scheduled");
        self.topics.insert(topic_id, topic);
        self.check_invariants();
        self.topic(topic_id)
    }

    pub fn start_topic(&mut self, topic_id: Uuid, started_at: DateTime<Utc>) -> Result<TopicStarted> {
        if let Some(active) = self.active_topic_id.filter(|active| *active != topic_id) {
            return Err(Error::invalid(format!(
                "topic {active} is already active; close it first"
            )));
        }

        let event = lookup_mut(&mut self.topics, topic_id)?.start(started_at)?;
        self.active_topic_id = Some(topic_id);
        self.raise(event.clone());
        debug!(group_id = %self.id, %topic_id, "topic started");
        self.check_invariants();
        Ok(event)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit_photo(
        &mut self,
        topic_id: Uuid,
        photo_id: Uuid,
        membership_id: Uuid,
        tag: ContentSafetyTag,
        submitted_at: DateTime<Utc>,
        file_size_bytes: u64,
        long_edge_pixels: u32,
    ) -> Result<&Photo> {
        self.authorize(membership_id, GroupAction::SubmitPhotos)?;
        let limits = self.photo_limits;

        let (_, event) = lookup_mut(&mut self.topics, topic_id)?.submit_photo(
            photo_id,
            membership_id,
            tag,
            &limits,
            submitted_at,
            file_size_bytes,
            long_edge_pixels,
        )?;
        self.raise(event);
        debug!(group_id = %self.id, %topic_id, %photo_id, %membership_id, "photo submitted");

        self.topic(topic_id)?.photo(photo_id)
    }

    /// Close voting with totals computed by the caller
    pub fn close_topic(
        &mut self,
        topic_id: Uuid,
        closed_at: DateTime<Utc>,
        vote_totals: BTreeMap<Uuid, u32>,
    ) -> Result<VotingClosed> {
        let event = lookup_mut(&mut self.topics, topic_id)?.close_voting(closed_at, vote_totals)?;
        if self.active_topic_id == Some(topic_id) {
            self.active_topic_id = None;
        }
        self.raise(event.clone());
        debug!(group_id = %self.id, %topic_id, "voting closed");
        self.check_invariants();
        Ok(event)
    }

    pub fn cast_vote(
        &mut self,
        topic_id: Uuid,
        vote_id: Uuid,
        membership_id: Uuid,
        photo_id: Uuid,
        cast_at: DateTime<Utc>,
    ) -> Result<&Vote> {
        self.authorize(membership_id, GroupAction::CastVotes)?;
        let vote = lookup_mut(&mut self.topics, topic_id)?.cast_vote(vote_id, membership_id, photo_id, cast_at)?;
        debug!(group_id = %self.id, %topic_id, %membership_id, %photo_id, "vote cast");
        Ok(vote)
    }

    pub fn add_side_quest(
        &mut self,
        topic_id: Uuid,
        quest_id: Uuid,
        slug: Slug,
        title: &str,
    ) -> Result<&SideQuest> {
        lookup_mut(&mut self.topics, topic_id)?.add_side_quest(quest_id, slug, title)
    }

    // ---- photo interactions ----

    /// Returns false when the membership had already liked the photo
    pub fn like_photo(&mut self, topic_id: Uuid, photo_id: Uuid, membership_id: Uuid) -> Result<bool> {
        self.authorize(membership_id, GroupAction::LikePhotos)?;
        self.photo_mut(topic_id, photo_id)?.try_like(membership_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comment_on_photo(
        &mut self,
        topic_id: Uuid,
        photo_id: Uuid,
        comment_id: Uuid,
        membership_id: Uuid,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.authorize(membership_id, GroupAction::Comment)?;
        let comment = Comment::new(comment_id, photo_id, topic_id, membership_id, text, at)?;

        let photo = self.photo_mut(topic_id, photo_id)?;
        if photo.comments().iter().any(|c| c.id() == comment_id) {
            return Err(Error::invalid(format!("Comment {comment_id} already exists")));
        }
        photo.add_comment(comment)
    }

    /// Authors may remove their own comments; moderators may remove any
    pub fn delete_comment(
        &mut self,
        topic_id: Uuid,
        photo_id: Uuid,
        comment_id: Uuid,
        membership_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let author = self
            .topic(topic_id)?
            .photo(photo_id)?
            .comments()
            .iter()
            .find(|c| c.id() == comment_id)
            .map(Comment::membership_id)
            .ok_or_else(|| Error::not_found(Comment::KIND, comment_id))?;

        let action = if author == membership_id {
            GroupAction::DeleteOwnComments
        } else {
            GroupAction::DeleteOtherComments
        };
        self.authorize(membership_id, action)?;

        self.photo_mut(topic_id, photo_id)?
            .comment_mut(comment_id)?
            .soft_delete(at);
        Ok(())
    }

    /// Relaxing a tag needs `approver` to name an active membership allowed
    /// to moderate content
    pub fn change_photo_safety_tag(
        &mut self,
        topic_id: Uuid,
        photo_id: Uuid,
        next: ContentSafetyTag,
        approver: Option<Uuid>,
    ) -> Result<()> {
        let approved = match approver {
            Some(approver_id) => {
                let membership = lookup(&self.memberships, approver_id)?;
                membership.is_active()
                    && PermissionMatrix::can_perform(membership.role(), GroupAction::ModerateContent)
            }
            None => false,
        };

        self.photo_mut(topic_id, photo_id)?.change_safety_tag(next, approved)?;
        debug!(group_id = %self.id, %photo_id, tag = %next, approved, "photo safety tag changed");
        Ok(())
    }

    // ---- group-level ----

    /// Append to the event log; timestamps never go backwards
    pub fn record_event(
        &mut self,
        event_id: Uuid,
        description: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<&EventItem> {
        if self.events.iter().any(|e| e.id() == event_id) {
            return Err(Error::invalid(format!("EventItem {event_id} already exists")));
        }
        let last = self.events.last().map(EventItem::timestamp);
        let item = EventItem::new(event_id, self.id, description, timestamp, last)?;

        self.events.push(item);
        self.check_invariants();
        self.events
            .last()
            .ok_or_else(|| Error::not_found(EventItem::KIND, event_id))
    }

    /// Applies to later submissions only; accepted photos stay as they are
    pub fn update_photo_limits(&mut self, limits: PhotoLimits) {
        debug!(group_id = %self.id, ?limits, "photo limits updated");
        self.photo_limits = limits;
    }

    // ---- repository support ----

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Rebuild derived state after deserialization
    pub(crate) fn reindex(&mut self) {
        self.active_users = self
            .memberships
            .values()
            .filter(|m| m.is_active())
            .map(Membership::user_id)
            .collect();
        self.check_invariants();
    }

    // ---- helpers ----

    fn ensure_can_join(&self, user_id: Uuid) -> Result<()> {
        require_id(user_id, "user_id")?;
        if self.active_users.contains(&user_id) {
            return Err(Error::invalid(format!(
                "user {user_id} already has an active membership in this group"
            )));
        }
        Ok(())
    }

    fn insert_membership(&mut self, membership: Membership) -> &Membership {
        self.active_users.insert(membership.user_id());
        let id = membership.id();
        self.memberships.entry(id).or_insert(membership)
    }

    /// Membership must exist, be active, and hold a role allowed to act
    fn authorize(&self, membership_id: Uuid, action: GroupAction) -> Result<&Membership> {
        let membership = lookup(&self.memberships, membership_id)?;
        if !membership.is_active() {
            return Err(Error::invalid(format!(
                "membership {membership_id} is suspended"
            )));
        }
        if !PermissionMatrix::can_perform(membership.role(), action) {
            return Err(Error::invalid(format!(
                "{} memberships may not perform {action:?}",
                membership.role()
            )));
        }
        Ok(membership)
    }

    fn photo_mut(&mut self, topic_id: Uuid, photo_id: Uuid) -> Result<&mut Photo> {
        lookup_mut(&mut self.topics, topic_id)?.photo_mut(photo_id)
    }

    fn raise(&mut self, event: impl Into<DomainEvent>) {
        self.domain_events.push(event.into());
    }

    fn check_invariants(&self) {
        assert_group_invariants(self);
    }
}

fn lookup_invite<'a>(invites: &'a HashMap<String, Invite>, key: &str) -> Result<&'a Invite> {
    invites
        .get(key)
        .ok_or_else(|| Error::not_found(Invite::KIND, key))
}

impl Entity for Group {
    const KIND: &'static str = "Group";

    fn id(&self) -> Uuid {
        self.id
    }
}
