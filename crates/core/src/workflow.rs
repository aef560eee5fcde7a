//! Approval workflow rules for table series.
//!
//! A series moves through five levels: 0 (expert) up to 4 (finalized).
//! `approval_level` is the current state; `previous_approval_level` is the
//! last level the responsible role has acknowledged. A role may only act
//! when both are equal and match its own level; acknowledging synchronizes
//! the pair for specific adjacent combinations. The review status shown to
//! clients is a pure projection of the two fields and is recomputed on
//! every read, never stored.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;

pub const LEVEL_EXPERT: i16 = 0;
pub const LEVEL_MANAGER: i16 = 1;
pub const LEVEL_DEPUTY: i16 = 2;
pub const LEVEL_BOSS: i16 = 3;

/// Terminal level: the series is frozen for approval purposes and enters
/// the data-collection phase.
pub const LEVEL_FINALIZED: i16 = 4;

/// Direction of a workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Disapprove,
}

/// Derived review status of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewStatus {
    UnderReview,
    Approved,
    Rejected,
}

/// Project the review status from the level pair.
pub fn review_status(level: i16, previous: i16) -> ReviewStatus {
    if level == previous {
        ReviewStatus::UnderReview
    } else if level > previous {
        ReviewStatus::Approved
    } else {
        ReviewStatus::Rejected
    }
}

/// Compute the level a transition would move the series to.
///
/// Fails with `NoAccess` when the role holds no workflow level, when an
/// unacknowledged change is pending (`level != previous`), when the series
/// is not at the role's own level, or on a disapproval at level 0 (there is
/// nothing below "expert" to send the table back to).
pub fn next_level(
    role: Role,
    level: i16,
    previous: i16,
    decision: Decision,
) -> Result<i16, CoreError> {
    let expected = role.approval_level().ok_or(CoreError::NoAccess)?;

    if level != previous || level != expected {
        return Err(CoreError::NoAccess);
    }

    match decision {
        Decision::Approve => Ok(level + 1),
        Decision::Disapprove if level == LEVEL_EXPERT => Err(CoreError::NoAccess),
        Decision::Disapprove => Ok(level - 1),
    }
}

/// Whether `role` may acknowledge the current `(level, previous)` pair,
/// setting `previous_approval_level := approval_level`.
///
/// Only the adjacent pairs that mean "a neighbouring role has acted and
/// this role is now looking at the result" qualify; acknowledging is what
/// unlocks the role's own next approve/disapprove.
pub fn may_acknowledge(role: Role, level: i16, previous: i16) -> bool {
    matches!(
        (role, level, previous),
        (Role::Boss, 3, 2)
            | (Role::Deputy, 2, 1)
            | (Role::Deputy, 2, 3)
            | (Role::Manager, 1, 0)
            | (Role::Manager, 1, 2)
            | (Role::Expert, 0, 1)
    )
}

/// Whether the series is finalized and frozen for approval purposes.
pub fn is_finalized(level: i16) -> bool {
    level >= LEVEL_FINALIZED
}
