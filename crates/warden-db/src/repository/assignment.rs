//! SurrealDB implementation of [`RoleAssignmentRepository`].
//!
//! Assignments are never hard-deleted outside of role cascade-delete;
//! revocation flips the status and re-assignment reactivates the same
//! row so the unique `(user_id, role_id)` index is never violated by
//! repeated grant/revoke cycles.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;
use warden_core::SUPERADMIN_LEVEL;
use warden_core::error::WardenResult;
use warden_core::models::assignment::{
    AggregatedPermissions, AssignRole, AssignmentStatus, RoleAssignment, UserRoleBinding,
};
use warden_core::models::role::Role;
use warden_core::repository::RoleAssignmentRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    user_id: String,
    role_id: String,
    assigned_by: Option<String>,
    assigned_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    status: String,
}

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    user_id: String,
    role_id: String,
    assigned_by: Option<String>,
    assigned_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    status: String,
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    level: u32,
    permissions: Vec<String>,
    color: Option<String>,
    icon: Option<String>,
    is_system: bool,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AssignmentStatus, DbError> {
    match s {
        "Active" => Ok(AssignmentStatus::Active),
        "Revoked" => Ok(AssignmentStatus::Revoked),
        other => Err(DbError::Migration(format!(
            "unknown assignment status: {other}"
        ))),
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Migration(format!("invalid {field} UUID: {e}")))
}

impl AssignmentRow {
    fn into_assignment(self, id: Uuid) -> Result<RoleAssignment, DbError> {
        Ok(RoleAssignment {
            id,
            user_id: parse_uuid("user_id", &self.user_id)?,
            role_id: parse_uuid("role_id", &self.role_id)?,
            assigned_by: self
                .assigned_by
                .map(|s| parse_uuid("assigned_by", &s))
                .transpose()?,
            assigned_at: self.assigned_at,
            expires_at: self.expires_at,
            status: parse_status(&self.status)?,
        })
    }
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<RoleAssignment, DbError> {
        let id = parse_uuid("record", &self.record_id)?;
        AssignmentRow {
            user_id: self.user_id,
            role_id: self.role_id,
            assigned_by: self.assigned_by,
            assigned_at: self.assigned_at,
            expires_at: self.expires_at,
            status: self.status,
        }
        .into_assignment(id)
    }
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid("record", &self.record_id)?,
            name: self.name,
            description: self.description,
            level: self.level,
            permissions: self.permissions,
            color: self.color,
            icon: self.icon,
            is_system: self.is_system,
            is_active: self.is_active,
            created_by: self
                .created_by
                .map(|s| parse_uuid("created_by", &s))
                .transpose()?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the role-assignment repository.
#[derive(Clone)]
pub struct SurrealRoleAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Fetch the roles referenced by `role_ids`, keyed by id.
    async fn fetch_roles(&self, role_ids: Vec<String>) -> Result<HashMap<Uuid, Role>, DbError> {
        if role_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE meta::id(id) IN $role_ids",
            )
            .bind(("role_ids", role_ids))
            .await?;

        let rows: Vec<RoleRowWithId> = result.take(0)?;
        let mut roles = HashMap::new();
        for row in rows {
            let role = row.try_into_role()?;
            roles.insert(role.id, role);
        }
        Ok(roles)
    }
}

impl<C: Connection> RoleAssignmentRepository for SurrealRoleAssignmentRepository<C> {
    async fn get_user_roles(&self, user_id: Uuid) -> WardenResult<Vec<UserRoleBinding>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_role \
                 WHERE user_id = $user_id AND status = 'Active'",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;
        let role_ids: Vec<String> = rows.iter().map(|r| r.role_id.clone()).collect();
        let mut roles = self.fetch_roles(role_ids).await?;

        let mut bindings = Vec::new();
        for row in rows {
            let assignment = row.try_into_assignment()?;
            // A dangling role_id means the role row was removed out of
            // band; skip rather than fail the whole aggregation.
            if let Some(role) = roles.remove(&assignment.role_id) {
                bindings.push(UserRoleBinding { assignment, role });
            }
        }

        Ok(bindings)
    }

    async fn get_user_permissions(&self, user_id: Uuid) -> WardenResult<AggregatedPermissions> {
        let bindings = self.get_user_roles(user_id).await?;
        let now = Utc::now();

        let mut permissions: BTreeSet<String> = BTreeSet::new();
        let mut role_names = Vec::new();
        let mut max_level = 0u32;

        for binding in bindings {
            if !binding.assignment.is_effective(now) {
                continue;
            }
            if !binding.role.is_active {
                continue;
            }
            permissions.extend(binding.role.permissions.iter().cloned());
            role_names.push(binding.role.name.clone());
            max_level = max_level.max(binding.role.level);
        }

        Ok(AggregatedPermissions {
            permissions: permissions.into_iter().collect(),
            role_names,
            max_level,
        })
    }

    async fn assign_role(&self, input: AssignRole) -> WardenResult<RoleAssignment> {
        let user_id_str = input.user_id.to_string();
        let role_id_str = input.role_id.to_string();
        let assigned_by_str = input.assigned_by.map(|u| u.to_string());

        // Check for an existing pair (any status) so repeated grants
        // reactivate instead of tripping the unique index.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_role \
                 WHERE user_id = $user_id AND role_id = $role_id",
            )
            .bind(("user_id", user_id_str.clone()))
            .bind(("role_id", role_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let existing: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        if let Some(row) = existing.into_iter().next() {
            let record_id = row.record_id.clone();
            let mut result = self
                .db
                .query(
                    "UPDATE type::record('user_role', $id) SET \
                     status = 'Active', assigned_by = $assigned_by, \
                     assigned_at = time::now(), expires_at = $expires_at",
                )
                .bind(("id", record_id.clone()))
                .bind(("assigned_by", assigned_by_str))
                .bind(("expires_at", input.expires_at))
                .await
                .map_err(DbError::from)?;

            let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
            let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
                entity: "user_role".into(),
                id: record_id.clone(),
            })?;

            let assignment = row.into_assignment(parse_uuid("record", &record_id)?)?;
            info!(
                assignment_id = %assignment.id,
                user_id = %input.user_id,
                role_id = %input.role_id,
                "Reactivated role assignment"
            );
            return Ok(assignment);
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user_role', $id) SET \
                 user_id = $user_id, role_id = $role_id, \
                 assigned_by = $assigned_by, expires_at = $expires_at, \
                 status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", user_id_str))
            .bind(("role_id", role_id_str))
            .bind(("assigned_by", input.assigned_by.map(|u| u.to_string())))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_role".into(),
            id: id_str,
        })?;

        info!(
            assignment_id = %id,
            user_id = %input.user_id,
            role_id = %input.role_id,
            "Assigned role to user"
        );
        Ok(row.into_assignment(id)?)
    }

    async fn revoke_role(&self, assignment_id: Uuid) -> WardenResult<bool> {
        let mut result = self
            .db
            .query("UPDATE type::record('user_role', $id) SET status = 'Revoked'")
            .bind(("id", assignment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Ok(false);
        }

        info!(assignment_id = %assignment_id, "Revoked role assignment");
        Ok(true)
    }

    async fn get_assignment(&self, assignment_id: Uuid) -> WardenResult<RoleAssignment> {
        let id_str = assignment_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user_role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_role".into(),
            id: id_str,
        })?;

        Ok(row.into_assignment(assignment_id)?)
    }

    async fn superadmin_count(&self) -> WardenResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE level = $level AND is_active = true",
            )
            .bind(("level", SUPERADMIN_LEVEL))
            .await
            .map_err(DbError::from)?;
        let roles: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        if roles.is_empty() {
            return Ok(0);
        }

        let role_ids: Vec<String> = roles.into_iter().map(|r| r.record_id).collect();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_role \
                 WHERE role_id IN $role_ids AND status = 'Active'",
            )
            .bind(("role_ids", role_ids))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let users: HashSet<String> = rows.into_iter().map(|r| r.user_id).collect();
        Ok(users.len() as u64)
    }
}
