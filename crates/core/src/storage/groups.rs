//! Group snapshot storage and event outbox

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::parse::{parse_datetime, parse_json, parse_uuid, parse_version, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{DomainEvent, Entity, Group};

/// Row-level view of a stored group, without decoding the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: Uuid,
    pub slug: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// A domain event as written to the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub sequence: i64,
    pub group_version: u64,
    pub event: DomainEvent,
}

pub struct GroupStore<'a> {
    conn: &'a Connection,
}

impl<'a> GroupStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Group>> {
        let row = self
            .conn
            .query_row(
                "SELECT version, snapshot FROM groups WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(version, snapshot)| decode(version, &snapshot))
            .transpose()
    }

    /// Slugs are matched in their normalized form
    #[instrument(skip(self))]
    pub fn find_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let row = self
            .conn
            .query_row(
                "SELECT version, snapshot FROM groups WHERE slug = ?1",
                params![slug],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(version, snapshot)| decode(version, &snapshot))
            .transpose()
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<GroupSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, slug, version, updated_at FROM groups ORDER BY slug")?;

        let groups = stmt
            .query_map([], |row| {
                Ok(GroupSummary {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    slug: row.get(1)?,
                    version: parse_version(row.get(2)?)?,
                    updated_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// Insert or update the snapshot and append buffered events in one
    /// transaction. Version 0 means the group has never been stored.
    #[instrument(skip(self, group), fields(group_id = %group.id(), version = group.version()))]
    pub fn save(&self, group: &mut Group) -> Result<()> {
        let id = group.id().to_string();
        let expected = group.version();
        let next = expected + 1;
        let snapshot = serde_json::to_string(&*group)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;

        let slug_owner: Option<String> = tx
            .query_row(
                "SELECT id FROM groups WHERE slug = ?1 AND id <> ?2",
                params![group.slug().as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        if slug_owner.is_some() {
            return Err(Error::InvalidOperation(format!(
                "slug '{}' is already used by another group",
                group.slug()
            )));
        }

        let written = if expected == 0 {
            tx.execute(
                "INSERT INTO groups (id, slug, version, snapshot, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, group.slug().as_str(), to_sql_version(next)?, snapshot, now],
            )
        } else {
            tx.execute(
                "UPDATE groups SET slug = ?1, version = ?2, snapshot = ?3, updated_at = ?4
                 WHERE id = ?5 AND version = ?6",
                params![
                    group.slug().as_str(),
                    to_sql_version(next)?,
                    snapshot,
                    now,
                    id,
                    to_sql_version(expected)?
                ],
            )
        }
        .map_err(|e| constraint_to_conflict(e, group))?;

        if written == 0 {
            return Err(Error::Conflict(format!(
                "group {} was modified since version {expected}",
                group.id()
            )));
        }

        for event in group.domain_events() {
            tx.execute(
                "INSERT INTO group_events (group_id, group_version, event_type, payload, occurred_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    to_sql_version(next)?,
                    event.name(),
                    serde_json::to_string(event)?,
                    event.occurred_on().to_rfc3339()
                ],
            )?;
        }

        tx.commit()?;
        group.set_version(next);
        debug!(version = next, events = group.domain_events().len(), "group saved");
        Ok(())
    }

    /// Outbox entries for a group, oldest first
    #[instrument(skip(self))]
    pub fn events_for_group(&self, group_id: Uuid) -> Result<Vec<StoredEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence, group_version, payload FROM group_events
             WHERE group_id = ?1 ORDER BY sequence",
        )?;

        let events = stmt
            .query_map(params![group_id.to_string()], |row| {
                Ok(StoredEvent {
                    sequence: row.get(0)?,
                    group_version: parse_version(row.get(1)?)?,
                    event: parse_json(&row.get::<_, String>(2)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

fn decode(version: i64, snapshot: &str) -> Result<Group> {
    let mut group: Group = serde_json::from_str(snapshot)?;
    group.set_version(parse_version(version)?);
    group.reindex();
    Ok(group)
}

fn to_sql_version(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| Error::invalid(format!("group version {version} exceeds storage range")))
}

/// Past the slug check, a constraint hit means a concurrent writer got there first
fn constraint_to_conflict(err: rusqlite::Error, group: &Group) -> Error {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => Error::Conflict(format!(
            "group {} or slug '{}' is already stored",
            group.id(),
            group.slug()
        )),
        _ => Error::Database(err),
    }
}
