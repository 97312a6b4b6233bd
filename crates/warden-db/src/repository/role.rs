//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{info, warn};
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::repository::RoleRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
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

fn parse_created_by(created_by: Option<String>) -> Result<Option<Uuid>, DbError> {
    created_by
        .map(|s| {
            Uuid::parse_str(&s)
                .map_err(|e| DbError::Migration(format!("invalid created_by UUID: {e}")))
        })
        .transpose()
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            level: self.level,
            permissions: self.permissions,
            color: self.color,
            icon: self.icon,
            is_system: self.is_system,
            is_active: self.is_active,
            created_by: parse_created_by(self.created_by)?,
            created_at: self.created_at,
        })
    }
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            level: self.level,
            permissions: self.permissions,
            color: self.color,
            icon: self.icon,
            is_system: self.is_system,
            is_active: self.is_active,
            created_by: parse_created_by(self.created_by)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> WardenResult<Role> {
        // The unique index on name backstops this check under races.
        let mut existing = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role WHERE name = $name")
            .bind(("name", input.name.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RoleRowWithId> = existing.take(0).map_err(DbError::from)?;
        if !rows.is_empty() {
            return Err(DbError::Conflict {
                entity: format!("role '{}'", input.name),
            }
            .into());
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, \
                 level = $level, permissions = $permissions, \
                 color = $color, icon = $icon, \
                 is_system = $is_system, created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description))
            .bind(("level", input.level))
            .bind(("permissions", input.permissions))
            .bind(("color", input.color))
            .bind(("icon", input.icon))
            .bind(("is_system", input.is_system))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        info!(role_id = %id, name = %input.name, level = input.level, "Created role");
        Ok(row.into_role(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_name(&self, name: &str) -> WardenResult<Role> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM role WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: name.to_string(),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn list(&self, include_inactive: bool) -> WardenResult<Vec<Role>> {
        let query = if include_inactive {
            "SELECT meta::id(id) AS record_id, * FROM role \
             ORDER BY level DESC"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE is_active = true ORDER BY level DESC"
        };

        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let roles = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(roles)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> WardenResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        match &input.description {
            Some(Some(_)) => sets.push("description = $description"),
            Some(None) => sets.push("description = NONE"),
            None => {}
        }
        if input.level.is_some() {
            sets.push("level = $level");
        }
        if input.permissions.is_some() {
            sets.push("permissions = $permissions");
        }
        match &input.color {
            Some(Some(_)) => sets.push("color = $color"),
            Some(None) => sets.push("color = NONE"),
            None => {}
        }
        match &input.icon {
            Some(Some(_)) => sets.push("icon = $icon"),
            Some(None) => sets.push("icon = NONE"),
            None => {}
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }

        if sets.is_empty() {
            warn!(role_id = %id, "Role update with no updatable fields");
            return self.get_by_id(id).await;
        }

        let query = format!("UPDATE type::record('role', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(Some(description)) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(level) = input.level {
            builder = builder.bind(("level", level));
        }
        if let Some(permissions) = input.permissions {
            builder = builder.bind(("permissions", permissions));
        }
        if let Some(Some(color)) = input.color {
            builder = builder.bind(("color", color));
        }
        if let Some(Some(icon)) = input.icon {
            builder = builder.bind(("icon", icon));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        info!(role_id = %id, "Updated role");
        Ok(row.into_role(id)?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<bool> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('role', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(false);
        };

        if row.is_system {
            warn!(role_id = %id, name = %row.name, "Attempted to delete system role");
            return Ok(false);
        }

        // Explicitly cascade to assignments and policies before the
        // role row so the deletion stays auditable and atomic; the
        // statements share one transaction per query call.
        self.db
            .query(
                "DELETE user_role WHERE role_id = $id; \
                 DELETE access_policy WHERE role_id = $id; \
                 DELETE type::record('role', $id);",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!(role_id = %id, name = %row.name, "Deleted role");
        Ok(true)
    }

    async fn count_users(&self, id: Uuid) -> WardenResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user_role \
                 WHERE role_id = $id AND status = 'Active' GROUP ALL",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
