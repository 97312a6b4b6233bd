//! Attribute-based access policy domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicyEffect {
    Allow,
    Deny,
}

/// Time-of-day window. Stored as raw `"HH:MM"` strings so malformed
/// values surface at evaluation time and fail closed rather than
/// poisoning deserialization of the whole policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// Structured ABAC conditions. All present keys must pass (AND).
/// Unknown keys in stored data are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConditions {
    pub time_range: Option<TimeRange>,
    /// CIDR networks or bare host addresses.
    pub ip_whitelist: Option<Vec<String>>,
    /// Reserved for rate limiting. Currently always passes.
    pub max_actions_per_hour: Option<u32>,
}

impl PolicyConditions {
    pub fn is_empty(&self) -> bool {
        self.time_range.is_none()
            && self.ip_whitelist.is_none()
            && self.max_actions_per_hour.is_none()
    }
}

/// An ABAC rule scoped to one role or global (`role_id = None`).
/// Evaluated in priority-descending order; deny is decisive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub role_id: Option<Uuid>,
    /// 0–1000; higher priority policies are evaluated first.
    pub priority: u32,
    pub effect: PolicyEffect,
    /// Section pattern, e.g. `users` or `*`.
    pub resource: String,
    /// Action patterns, e.g. `["read", "*"]`.
    pub actions: Vec<String>,
    pub conditions: PolicyConditions,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicy {
    pub name: String,
    pub description: Option<String>,
    pub role_id: Option<Uuid>,
    pub priority: u32,
    pub effect: PolicyEffect,
    pub resource: String,
    pub actions: Vec<String>,
    pub conditions: PolicyConditions,
    pub created_by: Option<Uuid>,
}

/// Updatable fields only; `id`, `created_by` and `created_at` are not
/// reachable through update.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePolicy {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub role_id: Option<Option<Uuid>>,
    pub priority: Option<u32>,
    pub effect: Option<PolicyEffect>,
    pub resource: Option<String>,
    pub actions: Option<Vec<String>>,
    pub conditions: Option<PolicyConditions>,
    pub is_active: Option<bool>,
}
