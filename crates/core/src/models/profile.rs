//! User profile, kept apart from any Group

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, Entity};
use super::{ContentSafetyTag, DisplayName};
use crate::error::{Error, Result};

pub const MAX_AVATAR_URL_LENGTH: usize = 2048;
pub const MAX_BIO_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub new_topic: bool,
    pub voting_open: bool,
    pub results: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            new_topic: true,
            voting_open: true,
            results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: Uuid,
    user_id: Uuid,
    display_name: DisplayName,
    avatar_url: Option<String>,
    bio: Option<String>,
    preferred_content_safety: ContentSafetyTag,
    notifications: NotificationPreferences,
}

impl Profile {
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        display_name: DisplayName,
        preferred_content_safety: ContentSafetyTag,
    ) -> Result<Self> {
        require_id(id, "profile_id")?;
        require_id(user_id, "user_id")?;

        Ok(Self {
            id,
            user_id,
            display_name,
            avatar_url: None,
            bio: None,
            preferred_content_safety,
            notifications: NotificationPreferences::default(),
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn preferred_content_safety(&self) -> ContentSafetyTag {
        self.preferred_content_safety
    }

    pub fn notifications(&self) -> NotificationPreferences {
        self.notifications
    }

    pub fn update_display_name(&mut self, display_name: DisplayName) {
        self.display_name = display_name;
    }

    /// `None` or blank clears the avatar
    pub fn update_avatar(&mut self, avatar_url: Option<&str>) -> Result<()> {
        let avatar_url = avatar_url.map(str::trim).filter(|url| !url.is_empty());
        if let Some(url) = avatar_url {
            if url.chars().count() > MAX_AVATAR_URL_LENGTH {
                return Err(Error::validation(format!(
                    "avatar url must be at most {MAX_AVATAR_URL_LENGTH} characters"
                )));
            }
        }
        self.avatar_url = avatar_url.map(str::to_string);
        Ok(())
    }

    pub fn update_bio(&mut self, bio: Option<&str>) -> Result<()> {
        let bio = bio.map(str::trim).filter(|b| !b.is_empty());
        if let Some(text) = bio {
            if text.chars().count() > MAX_BIO_LENGTH {
                return Err(Error::validation(format!(
                    "bio must be at most {MAX_BIO_LENGTH} characters"
                )));
            }
        }
        self.bio = bio.map(str::to_string);
        Ok(())
    }

    pub fn set_notification_preferences(&mut self, notifications: NotificationPreferences) {
        self.notifications = notifications;
    }

    pub fn change_preferred_content_safety(
        &mut self,
        next: ContentSafetyTag,
        has_moderator_approval: bool,
    ) -> Result<()> {
        self.preferred_content_safety
            .ensure_transition(next, has_moderator_approval)?;
        self.preferred_content_safety = next;
        Ok(())
    }
}

impl Entity for Profile {
    const KIND: &'static str = "Profile";

    fn id(&self) -> Uuid {
        self.id
    }
}
