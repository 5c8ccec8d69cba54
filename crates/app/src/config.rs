//! Application configuration
//!
//! Loaded from `shutterclub.toml`, either at an explicit path or in the
//! platform config directory. Every field has a default, so an empty or
//! missing file yields a working configuration.

use std::path::{Path, PathBuf};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use shutterclub_core::PhotoLimits;

pub const CONFIG_FILE_NAME: &str = "shutterclub.toml";
pub const DATABASE_FILE_NAME: &str = "shutterclub.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
    #[error("Could not determine platform directories")]
    NoProjectDirs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    pub photos: PhotoConfig,
    pub invites: InviteConfig,
}

/// Limits applied to newly created groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub max_submissions_per_member: u32,
    pub max_file_size_bytes: u64,
    pub max_long_edge_pixels: u32,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        let limits = PhotoLimits::default();
        Self {
            max_submissions_per_member: limits.max_submissions_per_member(),
            max_file_size_bytes: limits.max_file_size_bytes(),
            max_long_edge_pixels: limits.max_long_edge_pixels(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteConfig {
    pub validity_hours: u32,
    /// How long before expiry the reminder goes out
    pub reminder_lead_hours: u32,
    pub token_length: usize,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            validity_hours: 72,
            reminder_lead_hours: 24,
            token_length: 32,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the platform config directory when `None`.
    /// A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => {
                let default_path = project_dirs()?.config_dir().join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_toml(&std::fs::read_to_string(default_path)?)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.photo_limits()?;
        if self.invites.validity_hours == 0 {
            return Err(ConfigError::Invalid("invites.validity_hours must be positive".into()));
        }
        if self.invites.token_length < 16 {
            return Err(ConfigError::Invalid("invites.token_length must be at least 16".into()));
        }
        Ok(())
    }

    pub fn photo_limits(&self) -> Result<PhotoLimits, ConfigError> {
        PhotoLimits::new(
            self.photos.max_submissions_per_member,
            self.photos.max_file_size_bytes,
            self.photos.max_long_edge_pixels,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE_NAME)),
        }
    }

    pub fn invite_validity(&self) -> Duration {
        Duration::hours(i64::from(self.invites.validity_hours))
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::hours(i64::from(self.invites.reminder_lead_hours))
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("club", "shutterclub", "shutterclub").ok_or(ConfigError::NoProjectDirs)
}
