//! Member votes within a weekly topic

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, Entity};
use crate::error::Result;

/// One member's current choice. Replacing the candidate keeps no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    id: Uuid,
    weekly_topic_id: Uuid,
    membership_id: Uuid,
    photo_id: Uuid,
    cast_at: DateTime<Utc>,
}

impl Vote {
    pub(crate) fn new(
        id: Uuid,
        weekly_topic_id: Uuid,
        membership_id: Uuid,
        photo_id: Uuid,
        cast_at: DateTime<Utc>,
    ) -> Result<Self> {
        require_id(id, "vote_id")?;
        require_id(weekly_topic_id, "weekly_topic_id")?;
        require_id(membership_id, "membership_id")?;
        require_id(photo_id, "photo_id")?;

        Ok(Self {
            id,
            weekly_topic_id,
            membership_id,
            photo_id,
            cast_at,
        })
    }

    pub fn weekly_topic_id(&self) -> Uuid {
        self.weekly_topic_id
    }

    pub fn membership_id(&self) -> Uuid {
        self.membership_id
    }

    pub fn photo_id(&self) -> Uuid {
        self.photo_id
    }

    pub fn cast_at(&self) -> DateTime<Utc> {
        self.cast_at
    }

    pub(crate) fn replace_candidate(&mut self, photo_id: Uuid, cast_at: DateTime<Utc>) -> Result<()> {
        require_id(photo_id, "photo_id")?;
        self.photo_id = photo_id;
        self.cast_at = cast_at;
        Ok(())
    }
}

impl Entity for Vote {
    const KIND: &'static str = "Vote";

    fn id(&self) -> Uuid {
        self.id
    }
}
