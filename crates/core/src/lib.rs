//! Pure domain logic for the tabulate data-collection platform.
//!
//! Everything in this crate is synchronous and storage-free: the approval
//! workflow rules, the position-tree role mapping, the column schema
//! compiler, grant status constants, and the CSV/normalization helpers the
//! import and export paths share. The `db` and `api` crates depend on it;
//! it depends on neither.

pub mod error;
pub mod export;
pub mod grant;
pub mod normalize;
pub mod roles;
pub mod schema;
pub mod types;
pub mod workflow;
