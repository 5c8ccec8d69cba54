//! Invite token model

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, require_text, Entity};
use super::Period;
use crate::error::{Error, Result};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

/// Invite lifecycle. Both completed states are terminal and carry the
/// instant they were reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted { at: DateTime<Utc> },
    Expired { at: DateTime<Utc> },
}

impl InviteStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, InviteStatus::Pending)
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            InviteStatus::Pending => None,
            InviteStatus::Accepted { at } | InviteStatus::Expired { at } => Some(*at),
        }
    }
}

/// Token and email are lowercased once here so lookups can compare
/// normalized strings directly.
pub(crate) fn normalize_token(token: &str) -> String {
    token.trim().to_lowercase()
}

/// An invitation to join a Group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    id: Uuid,
    group_id: Uuid,
    inviter_membership_id: Uuid,
    token: String,
    email: String,
    valid_for: Period,
    issued_at: DateTime<Utc>,
    status: InviteStatus,
}

impl Invite {
    pub(crate) fn new(
        id: Uuid,
        group_id: Uuid,
        inviter_membership_id: Uuid,
        token: &str,
        email: &str,
        valid_for: Period,
        issued_at: DateTime<Utc>,
    ) -> Result<Self> {
        require_id(id, "invite_id")?;
        require_id(group_id, "group_id")?;
        require_id(inviter_membership_id, "inviter_membership_id")?;
        require_text(token, "token")?;
        let email = require_text(email, "email")?.to_lowercase();

        if !EMAIL_PATTERN.is_match(&email) {
            return Err(Error::validation("invite email must be valid"));
        }

        Ok(Self {
            id,
            group_id,
            inviter_membership_id,
            token: normalize_token(token),
            email,
            valid_for,
            issued_at,
            status: InviteStatus::Pending,
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn inviter_membership_id(&self) -> Uuid {
        self.inviter_membership_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn valid_for(&self) -> Period {
        self.valid_for
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn status(&self) -> InviteStatus {
        self.status
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.valid_for.end()
    }

    /// Check that `accept(at)` would succeed without changing anything
    pub fn ensure_acceptable(&self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.is_pending() {
            return Err(Error::invalid("invite has already been completed"));
        }
        if !self.valid_for.contains(at) {
            return Err(Error::invalid(
                "invite can only be accepted within its validity period",
            ));
        }
        Ok(())
    }

    pub fn accept(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.ensure_acceptable(at)?;
        self.status = InviteStatus::Accepted { at };
        Ok(())
    }

    /// No-op once the invite is completed. Expiring before the validity
    /// window ends is rejected.
    pub fn expire(&mut self, at: DateTime<Utc>) -> Result<()> {
        if !self.status.is_pending() {
            return Ok(());
        }
        if at < self.valid_for.end() {
            return Err(Error::invalid(
                "an invite may only expire after its period ends",
            ));
        }
        self.status = InviteStatus::Expired { at };
        Ok(())
    }
}

impl Entity for Invite {
    const KIND: &'static str = "Invite";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
    }

    fn invite() -> Invite {
        let period = Period::new(t0(), t0() + Duration::days(3)).unwrap();
        Invite::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Token-ABC",
            " Child@Example.com ",
            period,
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_invite_is_pending_and_normalized() {
        let invite = invite();
        assert_eq!(invite.status(), InviteStatus::Pending);
        assert_eq!(invite.token(), "token-abc");
        assert_eq!(invite.email(), "child@example.com");
        assert_eq!(invite.expires_at(), t0() + Duration::days(3));
    }

    #[test]
    fn test_rejects_bad_email() {
        let period = Period::new(t0(), t0() + Duration::days(1)).unwrap();
        for email in ["not-an-email", "a@b", "two@@example.com", "sp ace@example.com", ""] {
            let result = Invite::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                "token",
                email,
                period,
                t0(),
            );
            assert!(matches!(result, Err(Error::Validation(_))), "{email:?}");
        }
    }

    #[test]
    fn test_accept_within_validity() {
        let mut invite = invite();
        let at = t0() + Duration::hours(1);
        invite.accept(at).unwrap();
        assert_eq!(invite.status(), InviteStatus::Accepted { at });
        assert_eq!(invite.status().completed_at(), Some(at));
    }

    #[test]
    fn test_accept_outside_validity_fails() {
        let mut invite = invite();
        assert!(invite.accept(t0() + Duration::days(4)).is_err());
        assert!(invite.accept(t0() - Duration::seconds(1)).is_err());
        assert!(invite.status().is_pending());
    }

    #[test]
    fn test_terminal_invites() {
        let mut invite = invite();
        invite.accept(t0()).unwrap();

        assert!(invite.accept(t0() + Duration::hours(1)).is_err());
        // expire never fails once completed
        invite.expire(t0() - Duration::days(1)).unwrap();
        invite.expire(t0() + Duration::days(10)).unwrap();
        assert!(matches!(invite.status(), InviteStatus::Accepted { .. }));
    }

    #[test]
    fn test_expire_not_early() {
        let mut invite = invite();
        assert!(matches!(
            invite.expire(t0() + Duration::days(2)),
            Err(Error::InvalidOperation(_))
        ));

        let at = t0() + Duration::days(3);
        invite.expire(at).unwrap();
        assert_eq!(invite.status(), InviteStatus::Expired { at });
        assert!(invite.accept(at).is_err());
    }
}
