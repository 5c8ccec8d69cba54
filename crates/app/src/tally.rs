//! Vote counting for a weekly topic

use std::collections::BTreeMap;

use shutterclub_core::{Entity, WeeklyTopic};
use uuid::Uuid;

/// Votes per photo. Every submitted photo appears, with zero if unvoted.
pub fn tally_votes(topic: &WeeklyTopic) -> BTreeMap<Uuid, u32> {
    let mut totals: BTreeMap<Uuid, u32> = topic.photos().map(|p| (p.id(), 0)).collect();
    for vote in topic.votes() {
        *totals.entry(vote.photo_id()).or_insert(0) += 1;
    }
    totals
}

/// Photos sharing the highest non-zero total
pub fn winners(totals: &BTreeMap<Uuid, u32>) -> Vec<Uuid> {
    let best = totals.values().copied().max().unwrap_or(0);
    if best == 0 {
        return Vec::new();
    }
    totals
        .iter()
        .filter(|(_, count)| **count == best)
        .map(|(photo, _)| *photo)
        .collect()
}
