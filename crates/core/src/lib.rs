//! Shutterclub Core Library
//!
//! The Group aggregate for weekly photo challenges: memberships, invites,
//! challenges, weekly topics, photos and votes, with the value objects,
//! permission matrix and storage that support them.

pub mod error;
pub mod invariants;
pub mod models;
pub mod permissions;
pub mod storage;

pub use error::{Error, Result};
pub use models::*;
pub use permissions::*;
pub use storage::{
    Database, GroupRepository, GroupStore, GroupSummary, InMemoryGroupRepository, StoredEvent,
};
