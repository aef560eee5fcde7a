//! Authority roles in the organization chart and their permission names.
//!
//! Role values must match the seeded `positions.role` column; permission
//! names must match the strings embedded in access-token claims.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::workflow;

/// Grants table creation, reuse, and schema editing.
pub const PERM_TABLE_CREATE: &str = "tableCreate";

/// Grants read/write access-grant administration for finalized tables.
pub const PERM_TABLE_PERMISSION: &str = "tablePermission";

/// Grants user and position administration.
pub const PERM_USER_EDITING: &str = "userEditing";

/// The role a position (or token bearer) occupies.
///
/// `Boss`/`Deputy`/`Manager`/`Expert` are nodes of the authority tree and
/// participate in the approval workflow. `Supervisor` reviews unit
/// submissions; `Unit` submits data. Neither of the last two holds a
/// workflow level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Boss,
    Deputy,
    Manager,
    Expert,
    Supervisor,
    Unit,
}

impl Role {
    /// The approval level this role acts at, if it participates in the
    /// workflow at all.
    pub fn approval_level(self) -> Option<i16> {
        match self {
            Role::Boss => Some(workflow::LEVEL_BOSS),
            Role::Deputy => Some(workflow::LEVEL_DEPUTY),
            Role::Manager => Some(workflow::LEVEL_MANAGER),
            Role::Expert => Some(workflow::LEVEL_EXPERT),
            Role::Supervisor | Role::Unit => None,
        }
    }

    /// Stable string form, matching the database and token encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Boss => "boss",
            Role::Deputy => "deputy",
            Role::Manager => "manager",
            Role::Expert => "expert",
            Role::Supervisor => "supervisor",
            Role::Unit => "unit",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boss" => Ok(Role::Boss),
            "deputy" => Ok(Role::Deputy),
            "manager" => Ok(Role::Manager),
            "expert" => Ok(Role::Expert),
            "supervisor" => Ok(Role::Supervisor),
            "unit" => Ok(Role::Unit),
            other => Err(CoreError::UnexpectedData(format!("unknown role '{other}'"))),
        }
    }
}

/// Fail with `NoAccess` unless the permission set contains `permission`.
pub fn require_permission(permissions: &[String], permission: &str) -> Result<(), CoreError> {
    if permissions.iter().any(|p| p == permission) {
        Ok(())
    } else {
        Err(CoreError::NoAccess)
    }
}

/// Fail with `NoAccess` unless the caller holds exactly `expected`.
pub fn require_role(role: Role, expected: Role) -> Result<(), CoreError> {
    if role == expected {
        Ok(())
    } else {
        Err(CoreError::NoAccess)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn workflow_roles_map_to_their_levels() {
        assert_eq!(Role::Expert.approval_level(), Some(0));
        assert_eq!(Role::Manager.approval_level(), Some(1));
        assert_eq!(Role::Deputy.approval_level(), Some(2));
        assert_eq!(Role::Boss.approval_level(), Some(3));
    }

    #[test]
    fn non_workflow_roles_have_no_level() {
        assert_eq!(Role::Supervisor.approval_level(), None);
        assert_eq!(Role::Unit.approval_level(), None);
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            Role::Boss,
            Role::Deputy,
            Role::Manager,
            Role::Expert,
            Role::Supervisor,
            Role::Unit,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_matches!("admin".parse::<Role>(), Err(CoreError::UnexpectedData(_)));
    }

    #[test]
    fn missing_permission_is_no_access() {
        let perms = vec![PERM_USER_EDITING.to_string()];
        assert_matches!(
            require_permission(&perms, PERM_TABLE_CREATE),
            Err(CoreError::NoAccess)
        );
        assert!(require_permission(&perms, PERM_USER_EDITING).is_ok());
    }
}
