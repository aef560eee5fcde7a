//! Request handlers, grouped by resource.

pub mod grants;
pub mod health;
pub mod positions;
pub mod submissions;
pub mod tables;
