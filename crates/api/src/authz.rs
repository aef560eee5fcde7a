//! Authority-scope checks built on the position tree.

use sqlx::PgPool;
use tabulate_core::error::CoreError;
use tabulate_core::types::DbId;
use tabulate_db::repositories::PositionRepo;

use crate::error::{AppError, AppResult};

/// Fail with `NoAccess` unless `ancestor_id` sits above the descendant.
///
/// When `descendant_is_position` is false the second argument is a user
/// id and is mapped to that user's bound position first. A user with no
/// bound position passes by convention: an unbound user has no scoped
/// authority to contest.
pub async fn ensure_ancestor(
    pool: &PgPool,
    ancestor_id: DbId,
    descendant_id: DbId,
    descendant_is_position: bool,
) -> AppResult<()> {
    let descendant_position = if descendant_is_position {
        descendant_id
    } else {
        match PositionRepo::find_for_user(pool, descendant_id).await? {
            Some(position) => position.id,
            None => return Ok(()),
        }
    };

    if PositionRepo::is_ancestor(pool, ancestor_id, descendant_position).await? {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::NoAccess))
    }
}

/// Validate that attaching `node_id` under `new_parent_id` keeps the
/// chart acyclic: a node may not become its own descendant's child.
pub async fn ensure_acyclic_edge(
    pool: &PgPool,
    node_id: DbId,
    new_parent_id: DbId,
) -> AppResult<()> {
    if PositionRepo::is_ancestor(pool, node_id, new_parent_id).await? {
        return Err(AppError::Core(CoreError::UnexpectedData(
            "position edge would create a cycle".to_string(),
        )));
    }
    Ok(())
}
