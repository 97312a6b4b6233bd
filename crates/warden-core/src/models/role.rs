//! Admin role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named admin role carrying a set of wildcard-capable permissions
/// and an authority level (0–999, higher = more powerful).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Authority rank. 999 is reserved for superadmins.
    pub level: u32,
    /// Permission strings, each `section:action` or a wildcard pattern
    /// such as `users:*` or `*:*`.
    pub permissions: Vec<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// System roles are seeded at bootstrap and cannot be deleted.
    pub is_system: bool,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    pub level: u32,
    pub permissions: Vec<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_system: bool,
    pub created_by: Option<Uuid>,
}

/// Updatable fields only. `id`, `is_system`, `created_by` and
/// `created_at` are deliberately absent so a generic update can never
/// touch them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub level: Option<u32>,
    pub permissions: Option<Vec<String>>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub is_active: Option<bool>,
}
