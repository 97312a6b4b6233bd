//! User-role assignment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::role::Role;

/// Assignment lifecycle state. Revoked assignments are kept so the
/// `(user_id, role_id)` pair can be reactivated in place instead of
/// inserting a duplicate row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    Active,
    Revoked,
}

/// A user ↔ role binding, unique on `(user_id, role_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    /// Assignments past this instant contribute nothing to permission
    /// aggregation even while `Active`.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
}

impl RoleAssignment {
    /// True when the assignment is active and not past its expiry.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Active
            && self.expires_at.is_none_or(|expires| expires > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An active assignment eager-loaded with its role.
#[derive(Debug, Clone)]
pub struct UserRoleBinding {
    pub assignment: RoleAssignment,
    pub role: Role,
}

/// Result of aggregating a user's role-based grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedPermissions {
    /// Sorted, deduplicated union of all qualifying roles' permissions.
    pub permissions: Vec<String>,
    pub role_names: Vec<String>,
    /// Highest level among qualifying roles; 0 when the user has none.
    pub max_level: u32,
}
