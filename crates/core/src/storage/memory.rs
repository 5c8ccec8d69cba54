//! In-memory group repository for tests and single-process tools

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use super::traits::GroupRepository;
use crate::error::{Error, Result};
use crate::models::{DomainEvent, Entity, Group};

#[derive(Debug)]
struct Stored {
    group: Group,
    version: u64,
}

/// Keeps cloned snapshots keyed by group id, plus every saved event
#[derive(Debug, Default)]
pub struct InMemoryGroupRepository {
    groups: Mutex<HashMap<Uuid, Stored>>,
    outbox: Mutex<Vec<DomainEvent>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written by successful saves, oldest first
    pub fn saved_events(&self) -> Vec<DomainEvent> {
        self.outbox.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.lock().map(|groups| groups.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Io(std::io::Error::other("in-memory repository lock poisoned"))
}

impl GroupRepository for InMemoryGroupRepository {
    fn load(&self, group_id: Uuid) -> Result<Group> {
        let groups = self.groups.lock().map_err(poisoned)?;
        let stored = groups
            .get(&group_id)
            .ok_or_else(|| Error::not_found(Group::KIND, group_id))?;

        let mut group = stored.group.clone();
        group.set_version(stored.version);
        group.reindex();
        Ok(group)
    }

    fn save(&self, group: &mut Group) -> Result<()> {
        let mut groups = self.groups.lock().map_err(poisoned)?;

        let stored_version = groups.get(&group.id()).map(|s| s.version).unwrap_or(0);
        if stored_version != group.version() {
            return Err(Error::Conflict(format!(
                "group {} is at version {stored_version}, not {}",
                group.id(),
                group.version()
            )));
        }
        let slug_taken = groups
            .values()
            .any(|s| s.group.id() != group.id() && s.group.slug() == group.slug());
        if slug_taken {
            return Err(Error::InvalidOperation(format!(
                "slug '{}' is already used by another group",
                group.slug()
            )));
        }

        let next = stored_version + 1;
        let mut snapshot = group.clone();
        snapshot.take_domain_events();
        groups.insert(
            group.id(),
            Stored {
                group: snapshot,
                version: next,
            },
        );
        self.outbox
            .lock()
            .map_err(poisoned)?
            .extend(group.domain_events().iter().cloned());

        group.set_version(next);
        Ok(())
    }
}
