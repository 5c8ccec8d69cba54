//! Membership and role models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{require_id, Entity};
use crate::error::Result;

/// Group roles in priority order (highest to lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MembershipRole {
    /// Owner - runs the group, issues invites, moderates
    Owner = 2,
    /// Member - submits photos and votes
    Member = 1,
}

impl MembershipRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "Owner",
            MembershipRole::Member => "Member",
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipState {
    Active,
    Suspended,
}

/// A user's membership in a Group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    id: Uuid,
    group_id: Uuid,
    user_id: Uuid,
    role: MembershipRole,
    state: MembershipState,
}

impl Membership {
    pub(crate) fn new(id: Uuid, group_id: Uuid, user_id: Uuid, role: MembershipRole) -> Result<Self> {
        require_id(id, "membership_id")?;
        require_id(group_id, "group_id")?;
        require_id(user_id, "user_id")?;

        Ok(Self {
            id,
            group_id,
            user_id,
            role,
            state: MembershipState::Active,
        })
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> MembershipRole {
        self.role
    }

    pub fn state(&self) -> MembershipState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MembershipState::Active
    }

    pub(crate) fn suspend(&mut self) {
        self.state = MembershipState::Suspended;
    }

    pub(crate) fn reinstate(&mut self) {
        self.state = MembershipState::Active;
    }

    pub(crate) fn promote_to_owner(&mut self) {
        self.role = MembershipRole::Owner;
    }
}

impl Entity for Membership {
    const KIND: &'static str = "Membership";

    fn id(&self) -> Uuid {
        self.id
    }
}
