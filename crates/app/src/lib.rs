//! Shutterclub application layer
//!
//! Loads a group, runs one aggregate operation, saves it and dispatches
//! the events it raised. Also hosts configuration, invite token
//! generation and the invite reminder/expiry workflow.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod invitations;
pub mod service;
pub mod tally;
pub mod tokens;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIdGenerator, SystemClock, UuidGenerator};
pub use config::{AppConfig, ConfigError};
pub use error::{AppError, Result};
pub use events::{CollectingDispatcher, EventDispatcher, TracingDispatcher};
pub use invitations::{
    InvitationRequest, InvitationScheduler, InviteMailer, InviteSender, LoggingMailer,
    LoggingScheduler, ReminderPlan, TokioInvitationScheduler,
};
pub use service::{GroupService, IssuedInvite};
pub use tally::{tally_votes, winners};
pub use tokens::{InviteTokenGenerator, RandomTokenGenerator};
