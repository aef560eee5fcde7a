//! Domain error taxonomy shared by the db and api layers.
//!
//! Business failures carry a stable variant per outcome; the api layer maps
//! each to an HTTP status and wire code. Row-level validation failures from
//! bulk imports are *not* errors — they are a normal business outcome and
//! travel as a structured report instead.

use crate::types::DbId;

/// A domain-level error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Authority, ownership, or state-precondition violation. Covers
    /// workflow-gate failures, ancestor-scope failures, and grant-state
    /// failures alike.
    #[error("no access to the requested operation")]
    NoAccess,

    /// A name or record collision, or a re-submission to a grant that has
    /// already been processed.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The uploaded submission container is malformed.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The operation requires a finalized table (approval level 4).
    #[error("table approval level is not finalized")]
    NotFinalizedTable,

    /// The creator's ancestry lacks a complete manager/deputy/boss chain,
    /// so approvers cannot be resolved.
    #[error("approval flow for this position is incomplete")]
    FlowDefect,

    /// Malformed payload shape or a schema-edit safety violation.
    #[error("unexpected data: {0}")]
    UnexpectedData(String),

    /// A non-finalized series already exists for the table definition.
    #[error("an active series already exists for this definition")]
    ActiveEntryExists,

    /// Missing or invalid authentication.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An unexpected internal failure. Logged with full context at the
    /// boundary and surfaced generically, never leaking detail.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias for domain results.
pub type CoreResult<T> = Result<T, CoreError>;
