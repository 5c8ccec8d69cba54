//! Invite token generation

use rand::distributions::Alphanumeric;
use rand::Rng;

pub const DEFAULT_TOKEN_LENGTH: usize = 32;

pub trait InviteTokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random lowercase alphanumeric tokens. Tokens are compared
/// case-insensitively, so generating lowercase keeps stored and shown
/// values identical.
#[derive(Debug, Clone, Copy)]
pub struct RandomTokenGenerator {
    length: usize,
}

impl RandomTokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}

impl InviteTokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    }
}
