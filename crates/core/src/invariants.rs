//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{Entity, Group, TopicState};

/// Validate that a Group's state is internally consistent
pub fn assert_group_invariants(group: &Group) {
    if cfg!(debug_assertions) {
        assert_memberships_unique(group);
        assert_topics_consistent(group);
        assert_event_log_monotonic(group);
    }
}

/// At most one active membership per user
fn assert_memberships_unique(group: &Group) {
    let mut seen = HashSet::new();
    for membership in group.memberships().filter(|m| m.is_active()) {
        let first = seen.insert(membership.user_id());
        debug_assert!(
            first,
            "Group {} has more than one active membership for user {}",
            group.id(),
            membership.user_id()
        );
    }

    for membership in group.memberships() {
        debug_assert!(
            membership.group_id() == group.id(),
            "Membership {} belongs to group {} but is held by {}",
            membership.id(),
            membership.group_id(),
            group.id()
        );
    }
}

fn assert_topics_consistent(group: &Group) {
    let topics: Vec<_> = group.topics().collect();

    for (i, a) in topics.iter().enumerate() {
        for b in &topics[i + 1..] {
            debug_assert!(
                !a.active_period().overlaps(b.active_period()),
                "Group {} topics {} and {} have overlapping active periods",
                group.id(),
                a.id(),
                b.id()
            );
        }
    }

    let active: Vec<_> = topics
        .iter()
        .filter(|t| t.state() == TopicState::Active)
        .map(|t| t.id())
        .collect();
    debug_assert!(
        active.len() <= 1,
        "Group {} has {} active topics, expected 0 or 1",
        group.id(),
        active.len()
    );
    debug_assert!(
        group.active_topic_id().is_none() || active.first().copied() == group.active_topic_id(),
        "Group {} points at active topic {:?} but {:?} are active",
        group.id(),
        group.active_topic_id(),
        active
    );
}

/// Event log timestamps never decrease
fn assert_event_log_monotonic(group: &Group) {
    for pair in group.events().windows(2) {
        debug_assert!(
            pair[0].timestamp() <= pair[1].timestamp(),
            "Group {} event {} precedes event {}",
            group.id(),
            pair[1].id(),
            pair[0].id()
        );
    }
}
