//! Append-only group activity log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, require_text, Entity};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventItem {
    id: Uuid,
    group_id: Uuid,
    description: String,
    timestamp: DateTime<Utc>,
}

impl EventItem {
    /// `last_timestamp` is the timestamp of the previous entry in the log;
    /// entries may share a timestamp but never go backwards.
    pub fn new(
        id: Uuid,
        group_id: Uuid,
        description: &str,
        timestamp: DateTime<Utc>,
        last_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        require_id(id, "event_id")?;
        require_id(group_id, "group_id")?;
        let description = require_text(description, "description")?;

        if let Some(last) = last_timestamp {
            if timestamp < last {
                return Err(Error::invalid(format!(
                    "event timestamps must be monotonic: {timestamp} precedes {last}"
                )));
            }
        }

        Ok(Self {
            id,
            group_id,
            description,
            timestamp,
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Entity for EventItem {
    const KIND: &'static str = "EventItem";

    fn id(&self) -> Uuid {
        self.id
    }
}
