//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Mutating operations flush but
//! do not commit; transaction boundaries belong to the caller.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    assignment::{AggregatedPermissions, AssignRole, RoleAssignment, UserRoleBinding},
    audit::{AuditLogEntry, AuditStatus, CreateAuditLogEntry},
    policy::{AccessPolicy, CreatePolicy, UpdatePolicy},
    role::{CreateRole, Role, UpdateRole},
    user::{CreateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    /// Create a role. Fails with `AlreadyExists` on a duplicate name.
    fn create(&self, input: CreateRole) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Role>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = WardenResult<Role>> + Send;
    /// All roles ordered by level descending.
    fn list(
        &self,
        include_inactive: bool,
    ) -> impl Future<Output = WardenResult<Vec<Role>>> + Send;
    /// Update the provided fields only; protected fields are not part
    /// of [`UpdateRole`].
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Delete a role together with its assignments and policies.
    /// Returns `false` when the role is missing or system-flagged.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;
    /// Count currently active assignments of this role.
    fn count_users(&self, id: Uuid) -> impl Future<Output = WardenResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// User-role assignments
// ---------------------------------------------------------------------------

pub trait RoleAssignmentRepository: Send + Sync {
    /// Active assignments of a user, eager-loaded with their roles.
    fn get_user_roles(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<UserRoleBinding>>> + Send;

    /// Aggregate permissions over active, non-expired assignments whose
    /// role is active. Empty aggregation (`max_level` 0) when the user
    /// has no qualifying assignment.
    fn get_user_permissions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<AggregatedPermissions>> + Send;

    /// Assign a role to a user. An existing `(user_id, role_id)` row —
    /// active or revoked — is reactivated in place.
    fn assign_role(
        &self,
        input: AssignRole,
    ) -> impl Future<Output = WardenResult<RoleAssignment>> + Send;

    /// Soft-revoke an assignment. Returns `false` when the id is
    /// unknown.
    fn revoke_role(&self, assignment_id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;

    fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> impl Future<Output = WardenResult<RoleAssignment>> + Send;

    /// Distinct users holding an active assignment to an active
    /// superadmin-level role.
    fn superadmin_count(&self) -> impl Future<Output = WardenResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Access policies
// ---------------------------------------------------------------------------

pub trait AccessPolicyRepository: Send + Sync {
    /// Active policies ordered by priority descending, optionally
    /// filtered to one role.
    fn get_all(
        &self,
        role_id: Option<Uuid>,
    ) -> impl Future<Output = WardenResult<Vec<AccessPolicy>>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<AccessPolicy>> + Send;
    fn create(
        &self,
        input: CreatePolicy,
    ) -> impl Future<Output = WardenResult<AccessPolicy>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePolicy,
    ) -> impl Future<Output = WardenResult<AccessPolicy>> + Send;
    /// Returns `false` when the id is unknown.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<bool>> + Send;

    /// Candidate set for evaluation: active policies scoped to any of
    /// the given roles OR global, ordered by priority descending
    /// (ties broken by creation time ascending).
    fn policies_for_roles(
        &self,
        role_ids: &[Uuid],
    ) -> impl Future<Output = WardenResult<Vec<AccessPolicy>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit log (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring match on the action.
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub status: Option<AuditStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit row. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = WardenResult<AuditLogEntry>> + Send;

    /// Filtered, newest-first, paginated query with total count.
    fn get_logs(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<AuditLogEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Users (minimal surface for bootstrap and identity lookups)
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> impl Future<Output = WardenResult<Option<User>>> + Send;
    /// Case-insensitive email lookup.
    fn get_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = WardenResult<Option<User>>> + Send;
}
