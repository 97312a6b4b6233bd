//! SurrealDB implementation of [`AccessPolicyRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::policy::{
    AccessPolicy, CreatePolicy, PolicyConditions, PolicyEffect, UpdatePolicy,
};
use warden_core::repository::AccessPolicyRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PolicyRow {
    name: String,
    description: Option<String>,
    role_id: Option<String>,
    priority: u32,
    effect: String,
    resource: String,
    actions: Vec<String>,
    conditions: serde_json::Value,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct PolicyRowWithId {
    record_id: String,
    name: String,
    description: Option<String>,
    role_id: Option<String>,
    priority: u32,
    effect: String,
    resource: String,
    actions: Vec<String>,
    conditions: serde_json::Value,
    is_active: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_effect(s: &str) -> Result<PolicyEffect, DbError> {
    match s {
        "Allow" => Ok(PolicyEffect::Allow),
        "Deny" => Ok(PolicyEffect::Deny),
        other => Err(DbError::Migration(format!("unknown policy effect: {other}"))),
    }
}

fn effect_to_string(effect: PolicyEffect) -> &'static str {
    match effect {
        PolicyEffect::Allow => "Allow",
        PolicyEffect::Deny => "Deny",
    }
}

fn parse_opt_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>, DbError> {
    value
        .map(|s| {
            Uuid::parse_str(&s).map_err(|e| DbError::Migration(format!("invalid {field} UUID: {e}")))
        })
        .transpose()
}

/// Unknown condition keys are dropped here; the conditions struct only
/// keeps the fields evaluation understands.
fn parse_conditions(value: serde_json::Value) -> Result<PolicyConditions, DbError> {
    serde_json::from_value(value)
        .map_err(|e| DbError::Migration(format!("invalid policy conditions: {e}")))
}

fn conditions_to_value(conditions: &PolicyConditions) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(conditions)
        .map_err(|e| DbError::Migration(format!("unserializable policy conditions: {e}")))
}

impl PolicyRow {
    fn into_policy(self, id: Uuid) -> Result<AccessPolicy, DbError> {
        Ok(AccessPolicy {
            id,
            name: self.name,
            description: self.description,
            role_id: parse_opt_uuid("role_id", self.role_id)?,
            priority: self.priority,
            effect: parse_effect(&self.effect)?,
            resource: self.resource,
            actions: self.actions,
            conditions: parse_conditions(self.conditions)?,
            is_active: self.is_active,
            created_by: parse_opt_uuid("created_by", self.created_by)?,
            created_at: self.created_at,
        })
    }
}

impl PolicyRowWithId {
    fn try_into_policy(self) -> Result<AccessPolicy, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        PolicyRow {
            name: self.name,
            description: self.description,
            role_id: self.role_id,
            priority: self.priority,
            effect: self.effect,
            resource: self.resource,
            actions: self.actions,
            conditions: self.conditions,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: self.created_at,
        }
        .into_policy(id)
    }
}

/// SurrealDB implementation of the access-policy repository.
#[derive(Clone)]
pub struct SurrealAccessPolicyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccessPolicyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AccessPolicyRepository for SurrealAccessPolicyRepository<C> {
    async fn get_all(&self, role_id: Option<Uuid>) -> WardenResult<Vec<AccessPolicy>> {
        let mut result = match role_id {
            Some(role_id) => {
                self.db
                    .query(
                        "SELECT meta::id(id) AS record_id, * FROM access_policy \
                         WHERE is_active = true AND role_id = $role_id \
                         ORDER BY priority DESC, created_at ASC",
                    )
                    .bind(("role_id", role_id.to_string()))
                    .await
            }
            None => {
                self.db
                    .query(
                        "SELECT meta::id(id) AS record_id, * FROM access_policy \
                         WHERE is_active = true \
                         ORDER BY priority DESC, created_at ASC",
                    )
                    .await
            }
        }
        .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;
        let policies = rows
            .into_iter()
            .map(|row| row.try_into_policy())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(policies)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<AccessPolicy> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('access_policy', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "access_policy".into(),
            id: id_str,
        })?;

        Ok(row.into_policy(id)?)
    }

    async fn create(&self, input: CreatePolicy) -> WardenResult<AccessPolicy> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let conditions = conditions_to_value(&input.conditions)?;

        let result = self
            .db
            .query(
                "CREATE type::record('access_policy', $id) SET \
                 name = $name, description = $description, \
                 role_id = $role_id, priority = $priority, \
                 effect = $effect, resource = $resource, \
                 actions = $actions, conditions = $conditions, \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description))
            .bind(("role_id", input.role_id.map(|u| u.to_string())))
            .bind(("priority", input.priority))
            .bind(("effect", effect_to_string(input.effect)))
            .bind(("resource", input.resource))
            .bind(("actions", input.actions))
            .bind(("conditions", conditions))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "access_policy".into(),
            id: id_str,
        })?;

        info!(
            policy_id = %id,
            name = %input.name,
            effect = effect_to_string(input.effect),
            "Created access policy"
        );
        Ok(row.into_policy(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdatePolicy) -> WardenResult<AccessPolicy> {
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
        match &input.role_id {
            Some(Some(_)) => sets.push("role_id = $role_id"),
            Some(None) => sets.push("role_id = NONE"),
            None => {}
        }
        if input.priority.is_some() {
            sets.push("priority = $priority");
        }
        if input.effect.is_some() {
            sets.push("effect = $effect");
        }
        if input.resource.is_some() {
            sets.push("resource = $resource");
        }
        if input.actions.is_some() {
            sets.push("actions = $actions");
        }
        if input.conditions.is_some() {
            sets.push("conditions = $conditions");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE type::record('access_policy', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(Some(description)) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(Some(role_id)) = input.role_id {
            builder = builder.bind(("role_id", role_id.to_string()));
        }
        if let Some(priority) = input.priority {
            builder = builder.bind(("priority", priority));
        }
        if let Some(effect) = input.effect {
            builder = builder.bind(("effect", effect_to_string(effect)));
        }
        if let Some(resource) = input.resource {
            builder = builder.bind(("resource", resource));
        }
        if let Some(actions) = input.actions {
            builder = builder.bind(("actions", actions));
        }
        if let Some(conditions) = &input.conditions {
            builder = builder.bind(("conditions", conditions_to_value(conditions)?));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "access_policy".into(),
            id: id_str,
        })?;

        info!(policy_id = %id, "Updated access policy");
        Ok(row.into_policy(id)?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<bool> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('access_policy', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<PolicyRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(false);
        };

        self.db
            .query("DELETE type::record('access_policy', $id)")
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        info!(policy_id = %id, name = %row.name, "Deleted access policy");
        Ok(true)
    }

    async fn policies_for_roles(&self, role_ids: &[Uuid]) -> WardenResult<Vec<AccessPolicy>> {
        // Global policies (role_id = NONE) always belong to the
        // candidate set; role-scoped ones only for the given roles.
        let mut result = if role_ids.is_empty() {
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM access_policy \
                     WHERE is_active = true AND role_id = NONE \
                     ORDER BY priority DESC, created_at ASC",
                )
                .await
        } else {
            let ids: Vec<String> = role_ids.iter().map(|u| u.to_string()).collect();
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM access_policy \
                     WHERE is_active = true \
                     AND (role_id = NONE OR role_id IN $role_ids) \
                     ORDER BY priority DESC, created_at ASC",
                )
                .bind(("role_ids", ids))
                .await
        }
        .map_err(DbError::from)?;

        let rows: Vec<PolicyRowWithId> = result.take(0).map_err(DbError::from)?;
        let policies = rows
            .into_iter()
            .map(|row| row.try_into_policy())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(policies)
    }
}
