//! Engine error types.
//!
//! Note that a permission *denial* is never an error — evaluation
//! returns a [`crate::service::Decision`] value. These errors cover
//! the hierarchy and guard rules enforced by the admin service.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot {action} a role at or above your own level")]
    HierarchyViolation { action: &'static str },

    #[error("cannot remove the last superadmin")]
    LastSuperadmin,

    #[error("system roles cannot be deleted")]
    SystemRoleProtected,
}

impl From<EngineError> for WardenError {
    fn from(err: EngineError) -> Self {
        WardenError::AuthorizationDenied {
            reason: err.to_string(),
        }
    }
}
