//! Storage repository traits
//!
//! The Group aggregate never talks to storage itself. Application services
//! load a group through this trait, run one operation on it, and save it.

use std::sync::Mutex;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Group;

/// Group repository operations
pub trait GroupRepository {
    /// Load a group by id; `NotFound` when absent
    fn load(&self, group_id: Uuid) -> Result<Group>;

    /// Persist a group with an optimistic version check.
    ///
    /// Fails with `Conflict` when the stored version is not the one the
    /// group was loaded at, or when another group already uses its slug.
    /// On success the group carries the new version. Buffered domain events
    /// are written alongside but left on the group for the caller to drain.
    fn save(&self, group: &mut Group) -> Result<()>;
}

/// Share a non-`Sync` repository (such as a SQLite connection) across threads
impl<R: GroupRepository> GroupRepository for Mutex<R> {
    fn load(&self, group_id: Uuid) -> Result<Group> {
        self.lock()
            .map_err(|_| Error::Io(std::io::Error::other("repository lock poisoned")))?
            .load(group_id)
    }

    fn save(&self, group: &mut Group) -> Result<()> {
        self.lock()
            .map_err(|_| Error::Io(std::io::Error::other("repository lock poisoned")))?
            .save(group)
    }
}
