//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tabulate_core::error::CoreError;
use tabulate_core::roles::{self, Role};
use tabulate_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from a JWT Bearer token in the
/// `Authorization` header.
///
/// Carries the per-request authorization context: user id, bound
/// position, role, and permission set.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The caller's bound position in the authority tree, if any.
    pub position_id: Option<DbId>,
    /// The caller's role.
    pub role: Role,
    /// Named permissions granted to the caller's position.
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// The caller's position id, or `NoAccess` for callers without one.
    pub fn require_position(&self) -> Result<DbId, AppError> {
        self.position_id.ok_or(AppError::Core(CoreError::NoAccess))
    }

    /// Fail with `NoAccess` unless the caller holds `permission`.
    pub fn require_permission(&self, permission: &str) -> Result<(), AppError> {
        roles::require_permission(&self.permissions, permission).map_err(AppError::Core)
    }

    /// Fail with `NoAccess` unless the caller holds exactly `role`.
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        roles::require_role(self.role, role).map_err(AppError::Core)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let role: Role = claims
            .role
            .parse()
            .map_err(|_| AppError::Core(CoreError::Unauthorized("Unknown role in token".into())))?;

        Ok(AuthUser {
            user_id: claims.sub,
            position_id: claims.position_id,
            role,
            permissions: claims.permissions,
        })
    }
}
