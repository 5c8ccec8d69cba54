//! Domain models for Shutterclub

mod entity;

mod challenge;
mod comment;
mod display_name;
mod event_item;
pub mod events;
mod group;
mod invite;
mod membership;
mod period;
mod photo;
mod photo_limits;
mod profile;
mod safety;
mod side_quest;
mod slug;
mod topic;
mod vote;

pub use entity::Entity;

pub use challenge::*;
pub use comment::*;
pub use display_name::*;
pub use event_item::*;
pub use events::DomainEvent;
pub use group::*;
pub use invite::{Invite, InviteStatus};
pub use membership::*;
pub use period::*;
pub use photo::*;
pub use photo_limits::*;
pub use profile::*;
pub use safety::*;
pub use side_quest::*;
pub use slug::*;
pub use topic::*;
pub use vote::*;
