//! Warden Engine — RBAC + ABAC permission evaluation, role-hierarchy
//! enforcement, and startup bootstrap.

pub mod admin;
pub mod bootstrap;
pub mod conditions;
pub mod config;
pub mod error;
pub mod service;

pub use config::EngineConfig;
pub use error::EngineError;
pub use service::{Decision, PermissionService, PermissionSummary};
