//! Warden Server — application entry point.
//!
//! Boots the storage layer and seeds the permission system: connect,
//! migrate, bootstrap system roles and configured superadmins. The
//! HTTP surface consuming the engine is mounted separately.

use tracing_subscriber::EnvFilter;
use warden_db::repository::{
    SurrealRoleAssignmentRepository, SurrealRoleRepository, SurrealUserRepository,
};
use warden_db::{DbConfig, DbManager};
use warden_engine::EngineConfig;
use warden_engine::bootstrap::bootstrap_superadmins;

/// Comma-separated admin identity lists, e.g.
/// `WARDEN_ADMIN_TELEGRAM_IDS=123,456` and
/// `WARDEN_ADMIN_EMAILS=ops@example.com`.
fn engine_config_from_env() -> EngineConfig {
    let env = |key: &str| std::env::var(key).unwrap_or_default();
    let admin_telegram_ids = env("WARDEN_ADMIN_TELEGRAM_IDS")
        .split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect();
    let admin_emails = env("WARDEN_ADMIN_EMAILS")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    EngineConfig {
        admin_telegram_ids,
        admin_emails,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("warden=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Warden server...");

    let db_config = DbConfig::from_env();
    let manager = match DbManager::connect(&db_config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = warden_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    let engine_config = engine_config_from_env();
    let roles = SurrealRoleRepository::new(manager.client().clone());
    let assignments = SurrealRoleAssignmentRepository::new(manager.client().clone());
    let users = SurrealUserRepository::new(manager.client().clone());

    // Bootstrap failure is logged but never blocks startup; the
    // legacy-admin config still guarantees operator access.
    if let Err(e) = bootstrap_superadmins(&roles, &assignments, &users, &engine_config).await {
        tracing::error!(error = %e, "Failed to bootstrap superadmins, continuing startup");
    }

    tracing::info!("Warden permission system ready.");
}
