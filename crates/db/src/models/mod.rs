//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the requests that mutate it

pub mod access_grant;
pub mod data_row;
pub mod position;
pub mod table;
pub mod unit;
pub mod user;
