//! End-to-end scenarios against the Group aggregate and its repositories

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use shutterclub_core::{
    Challenge, ChallengeStatus, ContentSafetyTag, Database, DomainEvent, Entity, Error, EventItem,
    Group, GroupRepository, InMemoryGroupRepository, InviteStatus, MembershipRole, Period,
    PhotoLimits, Slug, TopicState,
};
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn family_group(limits: Option<PhotoLimits>) -> (Group, Uuid) {
    let mut group = Group::create(Uuid::new_v4(), Slug::new("family-group").unwrap(), limits).unwrap();
    let owner = Uuid::new_v4();
    group
        .add_membership(owner, Uuid::new_v4(), MembershipRole::Owner)
        .unwrap();
    (group, owner)
}

/// Approved challenge plus an active topic spanning [t0, t0+7d], voting [t0+7d, t0+8d]
fn group_with_active_topic(limits: Option<PhotoLimits>) -> (Group, Uuid, Uuid) {
    let (mut group, owner) = family_group(limits);
    let challenge = Uuid::new_v4();
    group
        .propose_challenge(challenge, "Challenge", Slug::new("challenge-1").unwrap())
        .unwrap();
    group.approve_challenge(challenge).unwrap();

    let topic = Uuid::new_v4();
    group
        .schedule_weekly_topic(
            topic,
            challenge,
            Period::new(t0(), t0() + Duration::days(7)).unwrap(),
            Period::new(t0() + Duration::days(7), t0() + Duration::days(8)).unwrap(),
        )
        .unwrap();
    group.start_topic(topic, t0() + Duration::minutes(1)).unwrap();
    (group, owner, topic)
}

#[test]
fn scenario_a_issue_invite_raises_invite_sent() {
    let (mut group, owner) = family_group(None);

    let invite = group
        .issue_invite(
            Uuid::new_v4(),
            "token-123",
            "child@example.com",
            owner,
            Period::new(t0(), t0() + Duration::days(3)).unwrap(),
            t0(),
        )
        .unwrap();
    assert_eq!(invite.status(), InviteStatus::Pending);
    assert_eq!(invite.valid_for().end(), t0() + Duration::days(3));

    let events = group.domain_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        DomainEvent::InviteSent(sent) => {
            assert_eq!(sent.email, "child@example.com");
            assert_eq!(sent.expires_at, t0() + Duration::days(3));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn scenario_b_schedule_and_start_topic() {
    let (mut group, _, topic) = group_with_active_topic(None);
    assert_eq!(group.topic(topic).unwrap().state(), TopicState::Active);
    assert_eq!(group.active_topic_id(), Some(topic));

    let other = Uuid::new_v4();
    group
        .propose_challenge(other, "Another", Slug::new("challenge-2").unwrap())
        .unwrap();
    group.approve_challenge(other).unwrap();

    let overlapping = group.schedule_weekly_topic(
        Uuid::new_v4(),
        other,
        Period::new(t0() + Duration::days(3), t0() + Duration::days(10)).unwrap(),
        Period::new(t0() + Duration::days(10), t0() + Duration::days(11)).unwrap(),
    );
    assert!(matches!(overlapping, Err(Error::InvalidOperation(_))));
    assert_eq!(group.topics().count(), 1);
}

#[test]
fn scenario_c_photo_limits() {
    let limits = PhotoLimits::new(1, 100, 100).unwrap();
    let (mut group, owner, topic) = group_with_active_topic(Some(limits));
    let at = t0() + Duration::hours(2);

    group
        .submit_photo(topic, Uuid::new_v4(), owner, ContentSafetyTag::Safe, at, 50, 50)
        .unwrap();
    let second = group.submit_photo(topic, Uuid::new_v4(), owner, ContentSafetyTag::Safe, at, 50, 50);
    assert!(matches!(second, Err(Error::InvalidOperation(_))));

    let member = Uuid::new_v4();
    group
        .add_membership(member, Uuid::new_v4(), MembershipRole::Member)
        .unwrap();
    let oversized = group.submit_photo(topic, Uuid::new_v4(), member, ContentSafetyTag::Safe, at, 200, 50);
    assert!(matches!(oversized, Err(Error::InvalidOperation(_))));
    assert_eq!(group.topic(topic).unwrap().submissions_by(member), 0);
}

#[test]
fn scenario_d_archive_straight_after_propose_fails() {
    let mut challenge = Challenge::propose(
        Uuid::new_v4(),
        Uuid::new_v4(),
        "Shadows",
        Slug::new("shadows").unwrap(),
    )
    .unwrap();
    assert!(challenge.archive().is_err());
    assert_eq!(challenge.status(), ChallengeStatus::Proposed);
}

#[test]
fn scenario_e_event_items_never_go_backwards() {
    let group_id = Uuid::new_v4();
    let last = t0();

    let earlier = EventItem::new(Uuid::new_v4(), group_id, "late entry", last - Duration::seconds(1), Some(last));
    assert!(earlier.is_err());

    let same = EventItem::new(Uuid::new_v4(), group_id, "same instant", last, Some(last));
    assert!(same.is_ok());
}

#[test]
fn terminal_invites_reject_accept_and_ignore_expire() {
    let (mut group, owner) = family_group(None);
    let invite_id = Uuid::new_v4();
    group
        .issue_invite(
            invite_id,
            "Token-XYZ",
            "  Kid@Example.com ",
            owner,
            Period::new(t0(), t0() + Duration::days(3)).unwrap(),
            t0(),
        )
        .unwrap();
    assert_eq!(group.invite(invite_id).unwrap().email(), "kid@example.com");

    let joined_at = t0() + Duration::hours(5);
    group
        .accept_invite("token-xyz", Uuid::new_v4(), Uuid::new_v4(), joined_at)
        .unwrap();

    let again = group.accept_invite("TOKEN-XYZ", Uuid::new_v4(), Uuid::new_v4(), joined_at);
    assert!(again.is_err());

    group.expire_invite(invite_id, t0() + Duration::days(4)).unwrap();
    assert_eq!(
        group.invite(invite_id).unwrap().status(),
        InviteStatus::Accepted { at: joined_at }
    );
}

#[test]
fn repeated_votes_keep_one_vote_with_latest_choice() {
    let limits = PhotoLimits::new(2, 1000, 1000).unwrap();
    let (mut group, owner, topic) = group_with_active_topic(Some(limits));
    let at = t0() + Duration::hours(1);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    group
        .submit_photo(topic, first, owner, ContentSafetyTag::Safe, at, 10, 10)
        .unwrap();
    group
        .submit_photo(topic, second, owner, ContentSafetyTag::Safe, at, 10, 10)
        .unwrap();

    let voter = Uuid::new_v4();
    group
        .add_membership(voter, Uuid::new_v4(), MembershipRole::Member)
        .unwrap();
    let voting = t0() + Duration::days(7) + Duration::hours(1);
    group.cast_vote(topic, Uuid::new_v4(), voter, first, voting).unwrap();
    group
        .cast_vote(topic, Uuid::new_v4(), voter, second, voting + Duration::minutes(1))
        .unwrap();

    let topic_ref = group.topic(topic).unwrap();
    assert_eq!(topic_ref.votes().count(), 1);
    assert_eq!(topic_ref.vote_of(voter).unwrap().photo_id(), second);
}

#[test]
fn full_week_through_in_memory_repository() {
    let repo = InMemoryGroupRepository::new();
    let (mut group, owner, topic) = group_with_active_topic(None);
    repo.save(&mut group).unwrap();
    assert_eq!(group.take_domain_events().len(), 1);

    let mut loaded = repo.load(group.id()).unwrap();
    let photo = Uuid::new_v4();
    loaded
        .submit_photo(topic, photo, owner, ContentSafetyTag::Mature, t0() + Duration::hours(3), 1024, 1024)
        .unwrap();
    loaded
        .cast_vote(topic, Uuid::new_v4(), owner, photo, t0() + Duration::days(7) + Duration::hours(2))
        .unwrap();
    let closed = loaded
        .close_topic(topic, t0() + Duration::days(8), BTreeMap::from([(photo, 1)]))
        .unwrap();
    assert_eq!(closed.vote_totals.get(&photo), Some(&1));
    repo.save(&mut loaded).unwrap();

    let names: Vec<_> = loaded.take_domain_events().iter().map(DomainEvent::name).collect();
    assert_eq!(names, ["photos_submitted", "voting_closed"]);
    assert_eq!(repo.saved_events().len(), 3);

    let reloaded = repo.load(group.id()).unwrap();
    assert_eq!(reloaded.topic(topic).unwrap().state(), TopicState::Closed);
    assert!(reloaded.domain_events().is_empty());
}

#[test]
fn sqlite_repository_keeps_aggregate_intact() {
    let db = Database::open_in_memory().unwrap();
    let (mut group, owner, topic) = group_with_active_topic(None);
    let photo = Uuid::new_v4();
    group
        .submit_photo(topic, photo, owner, ContentSafetyTag::Restricted, t0() + Duration::hours(4), 2048, 2048)
        .unwrap();
    group.like_photo(topic, photo, owner).unwrap();
    db.save(&mut group).unwrap();

    let loaded = db.load(group.id()).unwrap();
    let stored_photo = loaded.topic(topic).unwrap().photo(photo).unwrap();
    assert_eq!(stored_photo.tag(), ContentSafetyTag::Restricted);
    assert_eq!(stored_photo.likes().len(), 1);
    assert_eq!(loaded.active_topic_id(), Some(topic));
    assert_eq!(db.events_for_group(group.id()).unwrap().len(), 2);
}

proptest! {
    /// However topics are requested, the accepted ones never overlap
    #[test]
    fn accepted_topics_never_overlap(offsets in prop::collection::vec((0i64..60, 1i64..10), 1..12)) {
        let (mut group, _) = family_group(None);
        let challenge = Uuid::new_v4();
        group.propose_challenge(challenge, "Any", Slug::new("any-challenge").unwrap()).unwrap();
        group.approve_challenge(challenge).unwrap();

        for (start, len) in offsets {
            let active = Period::new(t0() + Duration::days(start), t0() + Duration::days(start + len)).unwrap();
            let voting = Period::new(active.end(), active.end() + Duration::days(1)).unwrap();
            let _ = group.schedule_weekly_topic(Uuid::new_v4(), challenge, active, voting);
        }

        let periods: Vec<_> = group.topics().map(|t| *t.active_period()).collect();
        for (i, a) in periods.iter().enumerate() {
            for b in &periods[i + 1..] {
                prop_assert!(!a.overlaps(b));
            }
        }
    }

    /// Whatever sequence of adds, suspends and reinstates runs, each user
    /// keeps at most one active membership
    #[test]
    fn one_active_membership_per_user(ops in prop::collection::vec((0usize..3, 0u8..3), 1..40)) {
        let mut group = Group::create(Uuid::new_v4(), Slug::new("prop-group").unwrap(), None).unwrap();
        let users = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut memberships: Vec<Uuid> = Vec::new();

        for (user, op) in ops {
            match op {
                0 => {
                    let id = Uuid::new_v4();
                    if group.add_membership(id, users[user], MembershipRole::Member).is_ok() {
                        memberships.push(id);
                    }
                }
                1 => {
                    if let Some(id) = memberships.get(user % memberships.len().max(1)) {
                        group.suspend_membership(*id).unwrap();
                    }
                }
                _ => {
                    if let Some(id) = memberships.get(user % memberships.len().max(1)) {
                        let _ = group.reinstate_membership(*id);
                    }
                }
            }
        }

        for user in users {
            let active = group.memberships().filter(|m| m.user_id() == user && m.is_active()).count();
            prop_assert!(active <= 1);
        }
    }
}
