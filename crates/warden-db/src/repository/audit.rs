//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The `audit_log` table is append-only: schema-level permissions
//! forbid UPDATE and DELETE, and this repository exposes neither.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::audit::{AuditLogEntry, AuditStatus, CreateAuditLogEntry};
use warden_core::repository::{AuditLogFilter, AuditLogRepository, PaginatedResult, Pagination};

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    user_id: String,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    details: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    status: String,
    request_method: Option<String>,
    request_path: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    user_id: String,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    details: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    status: String,
    request_method: Option<String>,
    request_path: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<AuditStatus, DbError> {
    match s {
        "Success" => Ok(AuditStatus::Success),
        "Denied" => Ok(AuditStatus::Denied),
        other => Err(DbError::Migration(format!("unknown audit status: {other}"))),
    }
}

fn status_to_string(status: AuditStatus) -> &'static str {
    match status {
        AuditStatus::Success => "Success",
        AuditStatus::Denied => "Denied",
    }
}

impl AuditRow {
    fn into_entry(self, id: Uuid) -> Result<AuditLogEntry, DbError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        Ok(AuditLogEntry {
            id,
            user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            status: parse_status(&self.status)?,
            request_method: self.request_method,
            request_path: self.request_path,
            created_at: self.created_at,
        })
    }
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        AuditRow {
            user_id: self.user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            status: self.status,
            request_method: self.request_method,
            request_path: self.request_path,
            created_at: self.created_at,
        }
        .into_entry(id)
    }
}

/// SurrealDB implementation of the audit-log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> WardenResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 user_id = $user_id, action = $action, \
                 resource_type = $resource_type, \
                 resource_id = $resource_id, details = $details, \
                 ip_address = $ip_address, user_agent = $user_agent, \
                 status = $status, request_method = $request_method, \
                 request_path = $request_path",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("action", input.action.clone()))
            .bind(("resource_type", input.resource_type))
            .bind(("resource_id", input.resource_id))
            .bind(("details", input.details))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("status", status_to_string(input.status)))
            .bind(("request_method", input.request_method))
            .bind(("request_path", input.request_path))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        debug!(
            audit_id = %id,
            user_id = %input.user_id,
            action = %input.action,
            status = status_to_string(input.status),
            "Audit log created"
        );
        Ok(row.into_entry(id)?)
    }

    async fn get_logs(
        &self,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<AuditLogEntry>> {
        let mut clauses: Vec<&str> = Vec::new();
        if filter.user_id.is_some() {
            clauses.push("user_id = $user_id");
        }
        if filter.action.is_some() {
            clauses.push("string::contains(string::lowercase(action), string::lowercase($action))");
        }
        if filter.resource_type.is_some() {
            clauses.push("resource_type = $resource_type");
        }
        if filter.status.is_some() {
            clauses.push("status = $status");
        }
        if filter.date_from.is_some() {
            clauses.push("created_at >= $date_from");
        }
        if filter.date_to.is_some() {
            clauses.push("created_at <= $date_to");
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", clauses.join(" AND "))
        };

        let count_query = format!(
            "SELECT count() AS total FROM audit_log {}GROUP ALL",
            where_clause
        );
        let page_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log {}\
             ORDER BY created_at DESC LIMIT $limit START $offset",
            where_clause
        );

        let mut count_builder = self.db.query(&count_query);
        if let Some(user_id) = filter.user_id {
            count_builder = count_builder.bind(("user_id", user_id.to_string()));
        }
        if let Some(action) = filter.action.clone() {
            count_builder = count_builder.bind(("action", action));
        }
        if let Some(resource_type) = filter.resource_type.clone() {
            count_builder = count_builder.bind(("resource_type", resource_type));
        }
        if let Some(status) = filter.status {
            count_builder = count_builder.bind(("status", status_to_string(status)));
        }
        if let Some(date_from) = filter.date_from {
            count_builder = count_builder.bind(("date_from", date_from));
        }
        if let Some(date_to) = filter.date_to {
            count_builder = count_builder.bind(("date_to", date_to));
        }

        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut page_builder = self
            .db
            .query(&page_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(user_id) = filter.user_id {
            page_builder = page_builder.bind(("user_id", user_id.to_string()));
        }
        if let Some(action) = filter.action {
            page_builder = page_builder.bind(("action", action));
        }
        if let Some(resource_type) = filter.resource_type {
            page_builder = page_builder.bind(("resource_type", resource_type));
        }
        if let Some(status) = filter.status {
            page_builder = page_builder.bind(("status", status_to_string(status)));
        }
        if let Some(date_from) = filter.date_from {
            page_builder = page_builder.bind(("date_from", date_from));
        }
        if let Some(date_to) = filter.date_to {
            page_builder = page_builder.bind(("date_to", date_to));
        }

        let mut result = page_builder.await.map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
