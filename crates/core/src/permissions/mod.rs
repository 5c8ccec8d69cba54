//! Permission system for Group operations

use crate::models::MembershipRole;

/// Actions a membership can perform in a Group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    // Onboarding
    IssueInvite,

    // Participation
    SubmitPhotos,
    CastVotes,
    LikePhotos,
    Comment,
    DeleteOwnComments,

    // Moderation
    DeleteOtherComments,
    ModerateContent,
}

/// Permission matrix for Group roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: MembershipRole, action: GroupAction) -> bool {
        match action {
            // Only owners bring new people in
            GroupAction::IssueInvite => role == MembershipRole::Owner,

            GroupAction::SubmitPhotos
            | GroupAction::CastVotes
            | GroupAction::LikePhotos
            | GroupAction::Comment
            | GroupAction::DeleteOwnComments => role >= MembershipRole::Member,

            GroupAction::DeleteOtherComments => role >= MembershipRole::Owner,
            GroupAction::ModerateContent => role >= MembershipRole::Owner,
        }
    }
}
