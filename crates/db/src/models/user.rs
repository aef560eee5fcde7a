//! Organization member model.

use serde::Serialize;
use sqlx::FromRow;
use tabulate_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub mobile_number: Option<String>,
    pub national_code: Option<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
