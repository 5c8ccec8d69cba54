//! SQLite storage layer for Shutterclub

mod groups;
mod memory;
mod migrations;
mod parse;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Entity, Group, Slug};

pub use groups::{GroupStore, GroupSummary, StoredEvent};
pub use memory::InMemoryGroupRepository;
pub use traits::GroupRepository;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    pub fn groups(&self) -> GroupStore<'_> {
        GroupStore::new(&self.conn)
    }

    /// Resolve a group by id, or by any name that normalizes to its slug
    pub fn find_group(&self, id_or_slug: &str) -> Result<Group> {
        let found = match Uuid::parse_str(id_or_slug) {
            Ok(id) => self.groups().find_by_id(id)?,
            Err(_) => match Slug::new(id_or_slug) {
                Ok(slug) => self.groups().find_by_slug(slug.as_str())?,
                Err(_) => None,
            },
        };
        found.ok_or_else(|| Error::not_found(Group::KIND, id_or_slug))
    }

    pub fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        self.groups().list()
    }

    pub fn events_for_group(&self, group_id: Uuid) -> Result<Vec<StoredEvent>> {
        self.groups().events_for_group(group_id)
    }
}

impl GroupRepository for Database {
    fn load(&self, group_id: Uuid) -> Result<Group> {
        self.groups()
            .find_by_id(group_id)?
            .ok_or_else(|| Error::not_found(Group::KIND, group_id))
    }

    fn save(&self, group: &mut Group) -> Result<()> {
        self.groups().save(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MembershipRole, Slug};

    #[test]
    fn test_open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shutterclub.db");
        let mut group = Group::create(Uuid::new_v4(), Slug::new("on-disk").unwrap(), None).unwrap();

        {
            let db = Database::open(&path).unwrap();
            group
                .add_membership(Uuid::new_v4(), Uuid::new_v4(), MembershipRole::Owner)
                .unwrap();
            db.save(&mut group).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let loaded = db.load(group.id()).unwrap();
        assert_eq!(loaded.memberships().count(), 1);
        assert_eq!(db.find_group("on-disk").unwrap().id(), group.id());
        assert_eq!(db.find_group(&group.id().to_string()).unwrap().version(), 1);
    }

    #[test]
    fn test_load_missing_group() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.load(Uuid::new_v4()),
            Err(Error::NotFound { entity: "Group", .. })
        ));
        assert!(db.find_group("nowhere").is_err());
        assert!(matches!(
            db.find_group("!!"),
            Err(Error::NotFound { entity: "Group", .. })
        ));
    }

    #[test]
    fn test_find_group_by_unnormalized_name() {
        let db = Database::open_in_memory().unwrap();
        let mut group = Group::create(Uuid::new_v4(), Slug::new("Family Group").unwrap(), None).unwrap();
        db.save(&mut group).unwrap();

        assert_eq!(db.find_group("Family Group").unwrap().id(), group.id());
        assert_eq!(db.find_group("  family-group ").unwrap().id(), group.id());
    }
}
