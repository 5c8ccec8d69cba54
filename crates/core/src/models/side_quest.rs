//! Optional side prompts attached to a weekly topic

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, require_text, Entity};
use super::Slug;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideQuest {
    id: Uuid,
    weekly_topic_id: Uuid,
    slug: Slug,
    title: String,
}

impl SideQuest {
    pub(crate) fn new(id: Uuid, weekly_topic_id: Uuid, slug: Slug, title: &str) -> Result<Self> {
        require_id(id, "side_quest_id")?;
        require_id(weekly_topic_id, "weekly_topic_id")?;

        Ok(Self {
            id,
            weekly_topic_id,
            slug,
            title: require_text(title, "title")?,
        })
    }

    pub fn weekly_topic_id(&self) -> Uuid {
        self.weekly_topic_id
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Entity for SideQuest {
    const KIND: &'static str = "SideQuest";

    fn id(&self) -> Uuid {
        self.id
    }
}
