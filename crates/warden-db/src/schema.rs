//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (minimal identity surface)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD telegram_id ON TABLE user TYPE option<int>;
DEFINE FIELD email ON TABLE user TYPE option<string>;
DEFINE FIELD email_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_telegram ON TABLE user COLUMNS telegram_id;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email;

-- =======================================================================
-- Admin roles
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE option<string>;
DEFINE FIELD level ON TABLE role TYPE int \
    ASSERT $value >= 0 AND $value <= 999;
DEFINE FIELD permissions ON TABLE role TYPE array DEFAULT [];
DEFINE FIELD permissions.* ON TABLE role TYPE string;
DEFINE FIELD color ON TABLE role TYPE option<string>;
DEFINE FIELD icon ON TABLE role TYPE option<string>;
DEFINE FIELD is_system ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD is_active ON TABLE role TYPE bool DEFAULT true;
DEFINE FIELD created_by ON TABLE role TYPE option<string>;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

-- =======================================================================
-- User-role assignments (soft-revoked, reactivated in place)
-- =======================================================================
DEFINE TABLE user_role SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_role TYPE string;
DEFINE FIELD role_id ON TABLE user_role TYPE string;
DEFINE FIELD assigned_by ON TABLE user_role TYPE option<string>;
DEFINE FIELD assigned_at ON TABLE user_role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD expires_at ON TABLE user_role TYPE option<datetime>;
DEFINE FIELD status ON TABLE user_role TYPE string \
    DEFAULT 'Active' ASSERT $value IN ['Active', 'Revoked'];
DEFINE INDEX idx_user_role_pair ON TABLE user_role \
    COLUMNS user_id, role_id UNIQUE;
DEFINE INDEX idx_user_role_user ON TABLE user_role COLUMNS user_id;
DEFINE INDEX idx_user_role_role ON TABLE user_role COLUMNS role_id;

-- =======================================================================
-- Access policies (ABAC)
-- =======================================================================
DEFINE TABLE access_policy SCHEMAFULL;
DEFINE FIELD name ON TABLE access_policy TYPE string;
DEFINE FIELD description ON TABLE access_policy TYPE option<string>;
DEFINE FIELD role_id ON TABLE access_policy TYPE option<string>;
DEFINE FIELD priority ON TABLE access_policy TYPE int \
    ASSERT $value >= 0 AND $value <= 1000;
DEFINE FIELD effect ON TABLE access_policy TYPE string \
    ASSERT $value IN ['Allow', 'Deny'];
DEFINE FIELD resource ON TABLE access_policy TYPE string;
DEFINE FIELD actions ON TABLE access_policy TYPE array DEFAULT [];
DEFINE FIELD actions.* ON TABLE access_policy TYPE string;
DEFINE FIELD conditions ON TABLE access_policy TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD is_active ON TABLE access_policy TYPE bool DEFAULT true;
DEFINE FIELD created_by ON TABLE access_policy TYPE option<string>;
DEFINE FIELD created_at ON TABLE access_policy TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_policy_role ON TABLE access_policy COLUMNS role_id;
DEFINE INDEX idx_policy_priority ON TABLE access_policy \
    COLUMNS priority;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD user_id ON TABLE audit_log TYPE string;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD resource_type ON TABLE audit_log TYPE option<string>;
DEFINE FIELD resource_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD details ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD ip_address ON TABLE audit_log TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_log TYPE option<string>;
DEFINE FIELD status ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Denied'];
DEFINE FIELD request_method ON TABLE audit_log TYPE option<string>;
DEFINE FIELD request_path ON TABLE audit_log TYPE option<string>;
DEFINE FIELD created_at ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_time ON TABLE audit_log COLUMNS created_at;
DEFINE INDEX idx_audit_user ON TABLE audit_log COLUMNS user_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn audit_log_is_append_only() {
        assert!(SCHEMA_V1.contains("FOR update NONE"));
        assert!(SCHEMA_V1.contains("FOR delete NONE"));
    }
}
