//! Permission evaluation service — hybrid RBAC + ABAC.
//!
//! Role-based grants are necessary but not sufficient: a request must
//! first clear the aggregated wildcard permissions, after which the
//! applicable access policies are scanned in priority order with
//! deny-overrides-allow semantics.

use tracing::debug;
use uuid::Uuid;
use warden_core::SUPERADMIN_LEVEL;
use warden_core::error::WardenResult;
use warden_core::models::audit::CreateAuditLogEntry;
use warden_core::models::policy::PolicyEffect;
use warden_core::models::user::User;
use warden_core::permission::{permission_matches, policy_applies};
use warden_core::repository::{
    AccessPolicyRepository, AuditLogRepository, RoleAssignmentRepository,
};

use crate::conditions::conditions_met;
use crate::config::EngineConfig;

/// Outcome of a permission check. Denial is a value, not an error;
/// errors are reserved for infrastructure failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: String,
}

impl Decision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Aggregated permission info for display and hierarchy checks.
#[derive(Debug, Clone)]
pub struct PermissionSummary {
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
    pub role_level: u32,
}

/// Stateless permission engine combining RBAC + ABAC evaluation.
///
/// Generic over repository implementations so the engine has no
/// dependency on the database crate. The evaluator performs only
/// reads; cancellation mid-check persists nothing.
pub struct PermissionService<A, P, L>
where
    A: RoleAssignmentRepository,
    P: AccessPolicyRepository,
    L: AuditLogRepository,
{
    assignments: A,
    policies: P,
    audit: L,
    config: EngineConfig,
}

impl<A, P, L> PermissionService<A, P, L>
where
    A: RoleAssignmentRepository,
    P: AccessPolicyRepository,
    L: AuditLogRepository,
{
    pub fn new(assignments: A, policies: P, audit: L, config: EngineConfig) -> Self {
        Self {
            assignments,
            policies,
            audit,
            config,
        }
    }

    /// Evaluate whether `user` may perform `required_permission`
    /// (a `section:action` string).
    ///
    /// Algorithm:
    /// 1. Legacy config-based admins are granted immediately.
    /// 2. Aggregate RBAC grants; no qualifying roles denies outright.
    /// 3. Wildcard-match the requirement against the aggregated
    ///    grants; a miss denies without consulting ABAC.
    /// 4. Scan applicable policies highest priority first. The first
    ///    matching deny is final. An allow never short-circuits —
    ///    RBAC already granted, so only a deny can change the
    ///    outcome.
    pub async fn check_permission(
        &self,
        user: &User,
        required_permission: &str,
        ip_address: Option<&str>,
    ) -> WardenResult<Decision> {
        if self.config.is_legacy_admin(user) {
            return Ok(Decision::allow("granted by legacy admin config"));
        }

        let aggregated = self.assignments.get_user_permissions(user.id).await?;

        if aggregated.permissions.is_empty() {
            debug!(
                user_id = %user.id,
                required = required_permission,
                "Permission denied: no active roles"
            );
            return Ok(Decision::deny("no active roles assigned"));
        }

        let rbac_granted = aggregated
            .permissions
            .iter()
            .any(|perm| permission_matches(perm, required_permission));

        if !rbac_granted {
            debug!(
                user_id = %user.id,
                required = required_permission,
                "Permission denied: RBAC mismatch"
            );
            return Ok(Decision::deny("permission not granted by any role"));
        }

        let bindings = self.assignments.get_user_roles(user.id).await?;
        let role_ids: Vec<Uuid> = bindings.iter().map(|b| b.assignment.role_id).collect();
        let policies = self.policies.policies_for_roles(&role_ids).await?;

        if policies.is_empty() {
            return Ok(Decision::allow("granted by RBAC"));
        }

        // Candidates arrive ordered by priority descending.
        for policy in &policies {
            if !policy_applies(&policy.resource, &policy.actions, required_permission) {
                continue;
            }
            if !conditions_met(&policy.conditions, ip_address) {
                // Conditions gate applicability, not the request.
                continue;
            }

            match policy.effect {
                PolicyEffect::Deny => {
                    debug!(
                        user_id = %user.id,
                        required = required_permission,
                        policy_id = %policy.id,
                        policy_name = %policy.name,
                        "Permission denied by policy"
                    );
                    return Ok(Decision::deny(format!("denied by policy: {}", policy.name)));
                }
                PolicyEffect::Allow => {
                    // Keep scanning: a lower-priority deny must still
                    // be honored, and absence of any deny already
                    // implies allow.
                }
            }
        }

        Ok(Decision::allow("granted by RBAC + ABAC"))
    }

    /// Check several permissions; all must pass. Returns the first
    /// denial, otherwise the last decision.
    pub async fn check_permissions(
        &self,
        user: &User,
        required_permissions: &[&str],
        ip_address: Option<&str>,
    ) -> WardenResult<Decision> {
        let mut last = Decision::allow("granted by RBAC");
        for required in required_permissions {
            let decision = self.check_permission(user, required, ip_address).await?;
            if !decision.allowed {
                return Ok(decision);
            }
            last = decision;
        }
        Ok(last)
    }

    /// Aggregated permission info for a user.
    ///
    /// Legacy config-based admins with no role grants report full
    /// superadmin permissions at level `SUPERADMIN_LEVEL + 1` so they
    /// can manage every role including level-999 ones.
    pub async fn get_user_permissions(&self, user: &User) -> WardenResult<PermissionSummary> {
        let aggregated = self.assignments.get_user_permissions(user.id).await?;

        if aggregated.permissions.is_empty() && self.config.is_legacy_admin(user) {
            return Ok(PermissionSummary {
                permissions: vec!["*:*".into()],
                roles: vec!["superadmin".into()],
                role_level: SUPERADMIN_LEVEL + 1,
            });
        }

        Ok(PermissionSummary {
            permissions: aggregated.permissions,
            roles: aggregated.role_names,
            role_level: aggregated.max_level,
        })
    }

    /// Persist an audit log entry. Fire-and-forget from the request
    /// perspective; the caller owns the surrounding transaction.
    pub async fn log_action(&self, input: CreateAuditLogEntry) -> WardenResult<()> {
        self.audit.append(input).await?;
        Ok(())
    }
}
