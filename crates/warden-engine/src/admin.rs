//! Role administration with hierarchy enforcement.
//!
//! The evaluator only answers "may this user do X"; the rules that
//! keep the role graph safe live here, layered on top of the generic
//! stores: no admin may create, edit, delete, assign, or revoke a
//! role at or above their own maximum level, and the last superadmin
//! assignment can never be removed.

use tracing::info;
use uuid::Uuid;
use warden_core::SUPERADMIN_LEVEL;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::assignment::{AssignRole, RoleAssignment};
use warden_core::models::role::{CreateRole, Role, UpdateRole};
use warden_core::models::user::User;
use warden_core::repository::{RoleAssignmentRepository, RoleRepository};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Highest level a role may be created or updated to through the
/// admin surface; the superadmin level itself is reserved for the
/// seeded system role.
const MAX_ASSIGNABLE_LEVEL: u32 = SUPERADMIN_LEVEL - 1;

/// Role management operations gated by the acting admin's level.
pub struct RoleAdminService<R, A>
where
    R: RoleRepository,
    A: RoleAssignmentRepository,
{
    roles: R,
    assignments: A,
    config: EngineConfig,
}

impl<R, A> RoleAdminService<R, A>
where
    R: RoleRepository,
    A: RoleAssignmentRepository,
{
    pub fn new(roles: R, assignments: A, config: EngineConfig) -> Self {
        Self {
            roles,
            assignments,
            config,
        }
    }

    /// The acting admin's maximum role level. Legacy config-based
    /// admins always rank above level 999 so they can manage every
    /// role, superadmins included.
    async fn actor_level(&self, actor: &User) -> WardenResult<u32> {
        let aggregated = self.assignments.get_user_permissions(actor.id).await?;
        let mut level = aggregated.max_level;
        if self.config.is_legacy_admin(actor) {
            level = level.max(SUPERADMIN_LEVEL + 1);
        }
        Ok(level)
    }

    fn check_level(&self, level: u32) -> WardenResult<()> {
        if level > MAX_ASSIGNABLE_LEVEL {
            return Err(WardenError::Validation {
                message: format!("role level must be at most {MAX_ASSIGNABLE_LEVEL}"),
            });
        }
        Ok(())
    }

    /// Create a role below the actor's own level.
    pub async fn create_role(&self, actor: &User, input: CreateRole) -> WardenResult<Role> {
        self.check_level(input.level)?;

        let actor_level = self.actor_level(actor).await?;
        if input.level >= actor_level {
            return Err(EngineError::HierarchyViolation { action: "create" }.into());
        }

        let role = self.roles.create(input).await?;
        info!(admin_id = %actor.id, role_id = %role.id, name = %role.name, "Admin created role");
        Ok(role)
    }

    /// Update a role below the actor's own level. A level change must
    /// also stay below the actor's level.
    pub async fn update_role(
        &self,
        actor: &User,
        role_id: Uuid,
        input: UpdateRole,
    ) -> WardenResult<Role> {
        let role = self.roles.get_by_id(role_id).await?;
        let actor_level = self.actor_level(actor).await?;

        if role.level >= actor_level {
            return Err(EngineError::HierarchyViolation { action: "edit" }.into());
        }
        if let Some(new_level) = input.level {
            self.check_level(new_level)?;
            if new_level >= actor_level {
                return Err(EngineError::HierarchyViolation { action: "edit" }.into());
            }
        }

        let role = self.roles.update(role_id, input).await?;
        info!(admin_id = %actor.id, role_id = %role_id, "Admin updated role");
        Ok(role)
    }

    /// Delete a non-system role below the actor's own level, together
    /// with its assignments and policies.
    pub async fn delete_role(&self, actor: &User, role_id: Uuid) -> WardenResult<()> {
        let role = self.roles.get_by_id(role_id).await?;
        let actor_level = self.actor_level(actor).await?;

        if role.level >= actor_level {
            return Err(EngineError::HierarchyViolation { action: "delete" }.into());
        }
        if role.is_system {
            return Err(EngineError::SystemRoleProtected.into());
        }

        let deleted = self.roles.delete(role_id).await?;
        if !deleted {
            return Err(WardenError::NotFound {
                entity: "role".into(),
                id: role_id.to_string(),
            });
        }

        info!(admin_id = %actor.id, role_id = %role_id, name = %role.name, "Admin deleted role");
        Ok(())
    }

    /// Assign a role below the actor's own level to a user.
    pub async fn assign_role(
        &self,
        actor: &User,
        input: AssignRole,
    ) -> WardenResult<RoleAssignment> {
        let role = self.roles.get_by_id(input.role_id).await?;
        let actor_level = self.actor_level(actor).await?;

        if role.level >= actor_level {
            return Err(EngineError::HierarchyViolation { action: "assign" }.into());
        }

        let assignment = self.assignments.assign_role(input).await?;
        info!(
            admin_id = %actor.id,
            assignment_id = %assignment.id,
            target_user_id = %assignment.user_id,
            role_name = %role.name,
            "Admin assigned role"
        );
        Ok(assignment)
    }

    /// Revoke an assignment of a role below the actor's own level.
    /// The sole remaining superadmin assignment is protected.
    pub async fn revoke_role(&self, actor: &User, assignment_id: Uuid) -> WardenResult<bool> {
        let assignment = self.assignments.get_assignment(assignment_id).await?;
        let role = self.roles.get_by_id(assignment.role_id).await?;
        let actor_level = self.actor_level(actor).await?;

        if role.level >= actor_level {
            return Err(EngineError::HierarchyViolation { action: "revoke" }.into());
        }

        if role.level == SUPERADMIN_LEVEL && self.assignments.superadmin_count().await? <= 1 {
            return Err(EngineError::LastSuperadmin.into());
        }

        let revoked = self.assignments.revoke_role(assignment_id).await?;
        if revoked {
            info!(
                admin_id = %actor.id,
                assignment_id = %assignment_id,
                target_user_id = %assignment.user_id,
                role_name = %role.name,
                "Admin revoked role assignment"
            );
        }
        Ok(revoked)
    }
}
