//! Integration tests for the permission evaluation service against
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::models::assignment::AssignRole;
use warden_core::models::audit::{AuditStatus, CreateAuditLogEntry};
use warden_core::models::policy::{CreatePolicy, PolicyConditions, PolicyEffect};
use warden_core::models::role::CreateRole;
use warden_core::models::user::{CreateUser, User};
use warden_core::repository::{
    AuditLogFilter, AuditLogRepository, Pagination, RoleAssignmentRepository, RoleRepository,
    UserRepository,
};
use warden_db::repository::{
    SurrealAccessPolicyRepository, SurrealAuditLogRepository, SurrealRoleAssignmentRepository,
    SurrealRoleRepository, SurrealUserRepository,
};
use warden_engine::{EngineConfig, PermissionService};

type Service = PermissionService<
    SurrealRoleAssignmentRepository<Db>,
    SurrealAccessPolicyRepository<Db>,
    SurrealAuditLogRepository<Db>,
>;

fn service(db: &Surreal<Db>, config: EngineConfig) -> Service {
    PermissionService::new(
        SurrealRoleAssignmentRepository::new(db.clone()),
        SurrealAccessPolicyRepository::new(db.clone()),
        SurrealAuditLogRepository::new(db.clone()),
        config,
    )
}

/// Spin up in-memory DB, run migrations, create a user holding the
/// "editor" role (level 20, users:read + users:edit).
async fn setup() -> (Surreal<Db>, User) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let user_repo = SurrealUserRepository::new(db.clone());
    let user = user_repo
        .create(CreateUser {
            telegram_id: Some(2001),
            email: Some("editor@example.com".into()),
            email_verified: true,
        })
        .await
        .unwrap();

    let role_repo = SurrealRoleRepository::new(db.clone());
    let editor = role_repo
        .create(CreateRole {
            name: "editor".into(),
            description: None,
            level: 20,
            permissions: vec!["users:read".into(), "users:edit".into()],
            color: None,
            icon: None,
            is_system: false,
            created_by: None,
        })
        .await
        .unwrap();

    SurrealRoleAssignmentRepository::new(db.clone())
        .assign_role(AssignRole {
            user_id: user.id,
            role_id: editor.id,
            assigned_by: None,
            expires_at: None,
        })
        .await
        .unwrap();

    (db, user)
}

fn deny_policy(name: &str, resource: &str, actions: &[&str], priority: u32) -> CreatePolicy {
    CreatePolicy {
        name: name.into(),
        description: None,
        role_id: None,
        priority,
        effect: PolicyEffect::Deny,
        resource: resource.into(),
        actions: actions.iter().map(|s| s.to_string()).collect(),
        conditions: PolicyConditions::default(),
        created_by: None,
    }
}

fn allow_policy(name: &str, resource: &str, actions: &[&str], priority: u32) -> CreatePolicy {
    CreatePolicy {
        effect: PolicyEffect::Allow,
        ..deny_policy(name, resource, actions, priority)
    }
}

#[tokio::test]
async fn user_without_roles_is_denied_everything() {
    let (db, _) = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let nobody = user_repo
        .create(CreateUser {
            telegram_id: None,
            email: None,
            email_verified: false,
        })
        .await
        .unwrap();

    // Even a global allow policy cannot help without a RBAC grant.
    SurrealAccessPolicyRepository::new(db.clone())
        .create(allow_policy("open-door", "*", &["*"], 1000))
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());
    let decision = svc
        .check_permission(&nobody, "users:read", None)
        .await
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.reason, "no active roles assigned");
}

#[tokio::test]
async fn rbac_mismatch_short_circuits() {
    let (db, user) = setup().await;
    let svc = service(&db, EngineConfig::default());

    let decision = svc
        .check_permission(&user, "users:delete", None)
        .await
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.reason, "permission not granted by any role");
}

#[tokio::test]
async fn granted_by_rbac_without_policies() {
    let (db, user) = setup().await;
    let svc = service(&db, EngineConfig::default());

    let decision = svc
        .check_permission(&user, "users:read", None)
        .await
        .unwrap();

    assert!(decision.allowed);
    assert_eq!(decision.reason, "granted by RBAC");
}

#[tokio::test]
async fn matching_deny_policy_denies_with_its_name() {
    let (db, user) = setup().await;
    SurrealAccessPolicyRepository::new(db.clone())
        .create(deny_policy("edit-freeze", "users", &["edit"], 500))
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());

    let denied = svc
        .check_permission(&user, "users:edit", None)
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.reason, "denied by policy: edit-freeze");

    // Unrelated action passes; policies existed, none applied.
    let allowed = svc
        .check_permission(&user, "users:read", None)
        .await
        .unwrap();
    assert!(allowed.allowed);
    assert_eq!(allowed.reason, "granted by RBAC + ABAC");
}

#[tokio::test]
async fn deny_wins_when_ranked_above_allow() {
    let (db, user) = setup().await;
    let policy_repo = SurrealAccessPolicyRepository::new(db.clone());
    policy_repo
        .create(deny_policy("deny-high", "users", &["edit"], 100))
        .await
        .unwrap();
    policy_repo
        .create(allow_policy("allow-low", "users", &["edit"], 50))
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());
    let decision = svc
        .check_permission(&user, "users:edit", None)
        .await
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.reason, "denied by policy: deny-high");
}

#[tokio::test]
async fn deny_wins_when_ranked_below_allow() {
    let (db, user) = setup().await;
    let policy_repo = SurrealAccessPolicyRepository::new(db.clone());
    policy_repo
        .create(allow_policy("allow-high", "users", &["edit"], 100))
        .await
        .unwrap();
    policy_repo
        .create(deny_policy("deny-low", "users", &["edit"], 50))
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());
    let decision = svc
        .check_permission(&user, "users:edit", None)
        .await
        .unwrap();

    // The allow at priority 100 does not short-circuit; the deny at 50
    // still fires.
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "denied by policy: deny-low");
}

#[tokio::test]
async fn expired_assignment_denies_as_no_roles() {
    let (db, _) = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let user = user_repo
        .create(CreateUser {
            telegram_id: None,
            email: None,
            email_verified: false,
        })
        .await
        .unwrap();

    let role_repo = SurrealRoleRepository::new(db.clone());
    let role = role_repo
        .create(CreateRole {
            name: "expired-role".into(),
            description: None,
            level: 20,
            permissions: vec!["users:read".into()],
            color: None,
            icon: None,
            is_system: false,
            created_by: None,
        })
        .await
        .unwrap();

    SurrealRoleAssignmentRepository::new(db.clone())
        .assign_role(AssignRole {
            user_id: user.id,
            role_id: role.id,
            assigned_by: None,
            expires_at: Some(Utc::now() - Duration::hours(1)),
        })
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());
    let decision = svc
        .check_permission(&user, "users:read", None)
        .await
        .unwrap();

    assert!(!decision.allowed);
    assert_eq!(decision.reason, "no active roles assigned");
}

#[tokio::test]
async fn ip_whitelist_gates_policy_applicability() {
    let (db, user) = setup().await;
    let mut policy = deny_policy("office-only-freeze", "users", &["edit"], 300);
    policy.conditions = PolicyConditions {
        ip_whitelist: Some(vec!["10.0.0.0/24".into()]),
        ..Default::default()
    };
    SurrealAccessPolicyRepository::new(db.clone())
        .create(policy)
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());

    // Inside the whitelist the deny applies.
    let inside = svc
        .check_permission(&user, "users:edit", Some("10.0.0.5"))
        .await
        .unwrap();
    assert!(!inside.allowed);
    assert_eq!(inside.reason, "denied by policy: office-only-freeze");

    // Outside the whitelist the condition is unmet, so the policy is
    // skipped rather than inverting into a denial of the request.
    let outside = svc
        .check_permission(&user, "users:edit", Some("11.0.0.5"))
        .await
        .unwrap();
    assert!(outside.allowed);
    assert_eq!(outside.reason, "granted by RBAC + ABAC");

    // Missing IP: condition fails closed, the deny does not apply.
    let missing = svc
        .check_permission(&user, "users:edit", None)
        .await
        .unwrap();
    assert!(missing.allowed);
}

#[tokio::test]
async fn role_scoped_policy_does_not_affect_other_roles() {
    let (db, user) = setup().await;

    let role_repo = SurrealRoleRepository::new(db.clone());
    let other_role = role_repo
        .create(CreateRole {
            name: "other".into(),
            description: None,
            level: 10,
            permissions: vec![],
            color: None,
            icon: None,
            is_system: false,
            created_by: None,
        })
        .await
        .unwrap();

    let mut policy = deny_policy("scoped-freeze", "users", &["edit"], 500);
    policy.role_id = Some(other_role.id);
    SurrealAccessPolicyRepository::new(db.clone())
        .create(policy)
        .await
        .unwrap();

    let svc = service(&db, EngineConfig::default());
    let decision = svc
        .check_permission(&user, "users:edit", None)
        .await
        .unwrap();

    // The editor does not hold `other`, so the scoped deny is not in
    // the candidate set at all.
    assert!(decision.allowed);
    assert_eq!(decision.reason, "granted by RBAC");
}

#[tokio::test]
async fn legacy_admin_bypasses_rbac_and_abac() {
    let (db, _) = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let ops = user_repo
        .create(CreateUser {
            telegram_id: Some(777),
            email: None,
            email_verified: false,
        })
        .await
        .unwrap();

    // A universal deny that would stop anyone else.
    SurrealAccessPolicyRepository::new(db.clone())
        .create(deny_policy("lockdown", "*", &["*"], 1000))
        .await
        .unwrap();

    let svc = service(
        &db,
        EngineConfig {
            admin_telegram_ids: vec![777],
            admin_emails: vec![],
        },
    );

    let decision = svc
        .check_permission(&ops, "settings:edit", None)
        .await
        .unwrap();

    assert!(decision.allowed);
    assert_eq!(decision.reason, "granted by legacy admin config");
}

#[tokio::test]
async fn check_permissions_requires_all() {
    let (db, user) = setup().await;
    let svc = service(&db, EngineConfig::default());

    let ok = svc
        .check_permissions(&user, &["users:read", "users:edit"], None)
        .await
        .unwrap();
    assert!(ok.allowed);

    let denied = svc
        .check_permissions(&user, &["users:read", "users:delete"], None)
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.reason, "permission not granted by any role");
}

#[tokio::test]
async fn summary_reports_roles_and_level() {
    let (db, user) = setup().await;
    let svc = service(&db, EngineConfig::default());

    let summary = svc.get_user_permissions(&user).await.unwrap();
    assert_eq!(summary.roles, vec!["editor"]);
    assert_eq!(summary.role_level, 20);
    assert_eq!(summary.permissions, vec!["users:edit", "users:read"]);
}

#[tokio::test]
async fn summary_grants_legacy_admins_superadmin_level() {
    let (db, _) = setup().await;
    let user_repo = SurrealUserRepository::new(db.clone());
    let ops = user_repo
        .create(CreateUser {
            telegram_id: Some(777),
            email: None,
            email_verified: false,
        })
        .await
        .unwrap();

    let svc = service(
        &db,
        EngineConfig {
            admin_telegram_ids: vec![777],
            admin_emails: vec![],
        },
    );

    let summary = svc.get_user_permissions(&ops).await.unwrap();
    assert_eq!(summary.permissions, vec!["*:*"]);
    assert_eq!(summary.roles, vec!["superadmin"]);
    assert_eq!(summary.role_level, 1000);
}

#[tokio::test]
async fn log_action_appends_an_audit_row() {
    let (db, user) = setup().await;
    let svc = service(&db, EngineConfig::default());

    svc.log_action(CreateAuditLogEntry {
        user_id: user.id,
        action: "users.edit".into(),
        resource_type: Some("user".into()),
        resource_id: Some("42".into()),
        details: serde_json::json!({"field": "email"}),
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
        status: AuditStatus::Success,
        request_method: Some("PATCH".into()),
        request_path: Some("/admin/users/42".into()),
    })
    .await
    .unwrap();

    let logs = SurrealAuditLogRepository::new(db.clone())
        .get_logs(AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(logs.total, 1);
    assert_eq!(logs.items[0].action, "users.edit");
    assert_eq!(logs.items[0].status, AuditStatus::Success);
}
