//! Minimal user identity consumed by the permission engine.
//!
//! Full account management lives outside this core; the engine only
//! needs the identity fields used by the legacy-admin check and the
//! bootstrap lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: Option<i64>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub telegram_id: Option<i64>,
    pub email: Option<String>,
    pub email_verified: bool,
}
