//! Warden Core — domain models, repository traits, and the pure
//! permission-matching primitives shared across all crates.

pub mod error;
pub mod models;
pub mod permission;
pub mod repository;

pub use error::{WardenError, WardenResult};
pub use permission::SUPERADMIN_LEVEL;
