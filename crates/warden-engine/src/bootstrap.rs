//! Startup bootstrap: seeds the system roles and ensures every
//! config-listed admin identity holds an active Superadmin
//! assignment. Idempotent; safe to run on every startup.

use tracing::{debug, info};
use uuid::Uuid;
use warden_core::SUPERADMIN_LEVEL;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::assignment::AssignRole;
use warden_core::models::role::{CreateRole, Role};
use warden_core::repository::{RoleAssignmentRepository, RoleRepository, UserRepository};

use crate::config::EngineConfig;

pub const SUPERADMIN_ROLE_NAME: &str = "Superadmin";

struct PresetRole {
    name: &'static str,
    description: &'static str,
    level: u32,
    permissions: &'static [&'static str],
    color: &'static str,
    icon: &'static str,
}

const PRESET_ROLES: &[PresetRole] = &[
    PresetRole {
        name: SUPERADMIN_ROLE_NAME,
        description: "Full system access",
        level: SUPERADMIN_LEVEL,
        permissions: &["*:*"],
        color: "#EF4444",
        icon: "shield",
    },
    PresetRole {
        name: "Admin",
        description: "Administrative access",
        level: 100,
        permissions: &[
            "users:*",
            "tickets:*",
            "stats:*",
            "broadcasts:*",
            "tariffs:*",
            "promocodes:*",
            "promo_groups:*",
            "promo_offers:*",
            "campaigns:*",
            "partners:*",
            "withdrawals:*",
            "payments:*",
            "payment_methods:*",
            "servers:*",
            "traffic:*",
            "settings:*",
            "roles:read",
            "roles:create",
            "roles:edit",
            "roles:assign",
            "audit_log:*",
            "channels:*",
            "ban_system:*",
            "apps:*",
            "email_templates:*",
            "updates:*",
        ],
        color: "#F59E0B",
        icon: "crown",
    },
    PresetRole {
        name: "Moderator",
        description: "User and ticket management",
        level: 50,
        permissions: &[
            "users:read",
            "users:edit",
            "users:block",
            "tickets:*",
            "ban_system:*",
        ],
        color: "#3B82F6",
        icon: "user-shield",
    },
    PresetRole {
        name: "Marketer",
        description: "Marketing tools access",
        level: 30,
        permissions: &[
            "campaigns:*",
            "broadcasts:*",
            "promocodes:*",
            "promo_offers:*",
            "promo_groups:*",
            "stats:read",
        ],
        color: "#8B5CF6",
        icon: "megaphone",
    },
    PresetRole {
        name: "Support",
        description: "Ticket support access",
        level: 20,
        permissions: &["tickets:read", "tickets:reply", "users:read"],
        color: "#10B981",
        icon: "headset",
    },
];

/// Seed preset roles that don't exist yet. Returns the Superadmin
/// role.
pub async fn ensure_preset_roles<R: RoleRepository>(roles: &R) -> WardenResult<Role> {
    let mut superadmin = None;

    for preset in PRESET_ROLES {
        let role = match roles.get_by_name(preset.name).await {
            Ok(existing) => existing,
            Err(WardenError::NotFound { .. }) => {
                let role = roles
                    .create(CreateRole {
                        name: preset.name.to_string(),
                        description: Some(preset.description.to_string()),
                        level: preset.level,
                        permissions: preset.permissions.iter().map(|s| s.to_string()).collect(),
                        color: Some(preset.color.to_string()),
                        icon: Some(preset.icon.to_string()),
                        is_system: true,
                        created_by: None,
                    })
                    .await?;
                info!(role_name = preset.name, role_id = %role.id, "Seeded preset role");
                role
            }
            Err(e) => return Err(e),
        };

        if preset.name == SUPERADMIN_ROLE_NAME {
            superadmin = Some(role);
        }
    }

    superadmin.ok_or_else(|| {
        WardenError::Internal("failed to resolve Superadmin role after seeding".into())
    })
}

/// Ensure every identity from the admin allow-lists holds an active
/// Superadmin assignment. Users not yet registered are skipped.
pub async fn bootstrap_superadmins<R, A, U>(
    roles: &R,
    assignments: &A,
    users: &U,
    config: &EngineConfig,
) -> WardenResult<()>
where
    R: RoleRepository,
    A: RoleAssignmentRepository,
    U: UserRepository,
{
    let superadmin = ensure_preset_roles(roles).await?;

    if config.admin_telegram_ids.is_empty() && config.admin_emails.is_empty() {
        debug!("No admin IDs or emails configured, skipping superadmin assignment");
        return Ok(());
    }

    let mut assigned_count = 0u32;

    for telegram_id in &config.admin_telegram_ids {
        let Some(user) = users.get_by_telegram_id(*telegram_id).await? else {
            debug!(telegram_id = *telegram_id, "Admin user not yet registered, skipping");
            continue;
        };
        if ensure_assignment(assignments, user.id, &superadmin).await? {
            assigned_count += 1;
        }
    }

    for email in &config.admin_emails {
        let Some(user) = users.get_by_email(email).await? else {
            debug!(email = %email, "Admin user (email) not yet registered, skipping");
            continue;
        };
        if ensure_assignment(assignments, user.id, &superadmin).await? {
            assigned_count += 1;
        }
    }

    if assigned_count > 0 {
        info!(assigned_count, role_id = %superadmin.id, "Superadmin bootstrap completed");
    } else {
        debug!("Superadmin bootstrap: no new assignments needed");
    }

    Ok(())
}

/// Assign the Superadmin role unless the user already holds it
/// actively. A previously revoked pair is reactivated in place by the
/// assignment store. Returns true when anything changed.
async fn ensure_assignment<A: RoleAssignmentRepository>(
    assignments: &A,
    user_id: Uuid,
    superadmin: &Role,
) -> WardenResult<bool> {
    let bindings = assignments.get_user_roles(user_id).await?;
    if bindings.iter().any(|b| b.role.id == superadmin.id) {
        debug!(%user_id, "User already has Superadmin role");
        return Ok(false);
    }

    let assignment = assignments
        .assign_role(AssignRole {
            user_id,
            role_id: superadmin.id,
            assigned_by: None,
            expires_at: None,
        })
        .await?;

    info!(
        %user_id,
        assignment_id = %assignment.id,
        "Assigned Superadmin role to user"
    );
    Ok(true)
}
