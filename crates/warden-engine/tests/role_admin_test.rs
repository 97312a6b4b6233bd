//! Integration tests for hierarchy enforcement and bootstrap against
//! in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use warden_core::error::WardenError;
use warden_core::models::assignment::AssignRole;
use warden_core::models::role::{CreateRole, UpdateRole};
use warden_core::models::user::{CreateUser, User};
use warden_core::repository::{RoleAssignmentRepository, RoleRepository, UserRepository};
use warden_db::repository::{
    SurrealRoleAssignmentRepository, SurrealRoleRepository, SurrealUserRepository,
};
use warden_engine::EngineConfig;
use warden_engine::admin::RoleAdminService;
use warden_engine::bootstrap::{bootstrap_superadmins, ensure_preset_roles};

type Admin = RoleAdminService<SurrealRoleRepository<Db>, SurrealRoleAssignmentRepository<Db>>;

fn admin_service(db: &Surreal<Db>, config: EngineConfig) -> Admin {
    RoleAdminService::new(
        SurrealRoleRepository::new(db.clone()),
        SurrealRoleAssignmentRepository::new(db.clone()),
        config,
    )
}

async fn create_user(db: &Surreal<Db>, telegram_id: i64) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            telegram_id: Some(telegram_id),
            email: None,
            email_verified: false,
        })
        .await
        .unwrap()
}

async fn create_role_at_level(db: &Surreal<Db>, name: &str, level: u32) -> Uuid {
    SurrealRoleRepository::new(db.clone())
        .create(CreateRole {
            name: name.into(),
            description: None,
            level,
            permissions: vec![],
            color: None,
            icon: None,
            is_system: false,
            created_by: None,
        })
        .await
        .unwrap()
        .id
}

async fn assign(db: &Surreal<Db>, user_id: Uuid, role_id: Uuid) -> Uuid {
    SurrealRoleAssignmentRepository::new(db.clone())
        .assign_role(AssignRole {
            user_id,
            role_id,
            assigned_by: None,
            expires_at: None,
        })
        .await
        .unwrap()
        .id
}

/// Setup: moderator actor at level 50.
async fn setup() -> (Surreal<Db>, User) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let actor = create_user(&db, 5001).await;
    let moderator = create_role_at_level(&db, "moderator", 50).await;
    assign(&db, actor.id, moderator).await;

    (db, actor)
}

fn new_role(name: &str, level: u32) -> CreateRole {
    CreateRole {
        name: name.into(),
        description: None,
        level,
        permissions: vec![],
        color: None,
        icon: None,
        is_system: false,
        created_by: None,
    }
}

fn assert_denied<T: std::fmt::Debug>(result: Result<T, WardenError>) {
    assert!(
        matches!(result, Err(WardenError::AuthorizationDenied { .. })),
        "expected AuthorizationDenied, got {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Hierarchy enforcement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cannot_create_role_at_or_above_own_level() {
    let (db, actor) = setup().await;
    let svc = admin_service(&db, EngineConfig::default());

    assert_denied(svc.create_role(&actor, new_role("peer", 50)).await);
    assert_denied(svc.create_role(&actor, new_role("boss", 100)).await);

    let below = svc.create_role(&actor, new_role("junior", 49)).await.unwrap();
    assert_eq!(below.level, 49);
}

#[tokio::test]
async fn cannot_create_role_at_superadmin_level() {
    let (db, _) = setup().await;
    let legacy = create_user(&db, 777).await;
    let svc = admin_service(
        &db,
        EngineConfig {
            admin_telegram_ids: vec![777],
            admin_emails: vec![],
        },
    );

    // Even a legacy admin (level 1000) cannot mint a 999 role; that
    // level belongs to the seeded system role.
    let result = svc.create_role(&legacy, new_role("usurper", 999)).await;
    assert!(matches!(result, Err(WardenError::Validation { .. })));

    let high = svc.create_role(&legacy, new_role("deputy", 998)).await.unwrap();
    assert_eq!(high.level, 998);
}

#[tokio::test]
async fn cannot_edit_role_at_or_above_own_level() {
    let (db, actor) = setup().await;
    let peer = create_role_at_level(&db, "peer", 50).await;
    let junior = create_role_at_level(&db, "junior", 10).await;

    let svc = admin_service(&db, EngineConfig::default());

    assert_denied(
        svc.update_role(
            &actor,
            peer,
            UpdateRole {
                name: Some("renamed".into()),
                ..Default::default()
            },
        )
        .await,
    );

    // Raising a junior role to the actor's level is an escalation.
    assert_denied(
        svc.update_role(
            &actor,
            junior,
            UpdateRole {
                level: Some(50),
                ..Default::default()
            },
        )
        .await,
    );

    let updated = svc
        .update_role(
            &actor,
            junior,
            UpdateRole {
                level: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.level, 40);
}

#[tokio::test]
async fn cannot_delete_role_at_or_above_own_level() {
    let (db, actor) = setup().await;
    let peer = create_role_at_level(&db, "peer", 50).await;
    let junior = create_role_at_level(&db, "junior", 10).await;

    let svc = admin_service(&db, EngineConfig::default());

    assert_denied(svc.delete_role(&actor, peer).await);
    svc.delete_role(&actor, junior).await.unwrap();
}

#[tokio::test]
async fn delete_system_role_is_protected() {
    let (db, _) = setup().await;
    let legacy = create_user(&db, 777).await;
    let svc = admin_service(
        &db,
        EngineConfig {
            admin_telegram_ids: vec![777],
            admin_emails: vec![],
        },
    );

    ensure_preset_roles(&SurrealRoleRepository::new(db.clone()))
        .await
        .unwrap();
    let admin_role = SurrealRoleRepository::new(db.clone())
        .get_by_name("Admin")
        .await
        .unwrap();

    // Level clears (100 < 1000) but the system flag blocks it.
    assert_denied(svc.delete_role(&legacy, admin_role.id).await);
    assert!(
        SurrealRoleRepository::new(db.clone())
            .get_by_id(admin_role.id)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn cannot_assign_role_at_or_above_own_level() {
    let (db, actor) = setup().await;
    let target = create_user(&db, 5002).await;
    let peer = create_role_at_level(&db, "peer", 50).await;
    let junior = create_role_at_level(&db, "junior", 10).await;

    let svc = admin_service(&db, EngineConfig::default());

    assert_denied(
        svc.assign_role(
            &actor,
            AssignRole {
                user_id: target.id,
                role_id: peer,
                assigned_by: Some(actor.id),
                expires_at: None,
            },
        )
        .await,
    );

    let assignment = svc
        .assign_role(
            &actor,
            AssignRole {
                user_id: target.id,
                role_id: junior,
                assigned_by: Some(actor.id),
                expires_at: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(assignment.user_id, target.id);
    assert_eq!(assignment.assigned_by, Some(actor.id));
}

#[tokio::test]
async fn cannot_revoke_role_at_or_above_own_level() {
    let (db, actor) = setup().await;
    let target = create_user(&db, 5002).await;
    let peer = create_role_at_level(&db, "peer", 50).await;
    let assignment_id = assign(&db, target.id, peer).await;

    let svc = admin_service(&db, EngineConfig::default());
    assert_denied(svc.revoke_role(&actor, assignment_id).await);
}

// ---------------------------------------------------------------------------
// Last-superadmin guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_superadmin_cannot_be_revoked() {
    let (db, _) = setup().await;
    let legacy = create_user(&db, 777).await;
    let config = EngineConfig {
        admin_telegram_ids: vec![777],
        admin_emails: vec![],
    };

    let superadmin_role = ensure_preset_roles(&SurrealRoleRepository::new(db.clone()))
        .await
        .unwrap();

    let sole = create_user(&db, 6001).await;
    let assignment_id = assign(&db, sole.id, superadmin_role.id).await;

    let svc = admin_service(&db, config.clone());
    assert_denied(svc.revoke_role(&legacy, assignment_id).await);

    // With a second superadmin in place, revocation goes through.
    let backup = create_user(&db, 6002).await;
    assign(&db, backup.id, superadmin_role.id).await;

    assert!(svc.revoke_role(&legacy, assignment_id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bootstrap_seeds_roles_and_assigns_superadmins() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let ops = create_user(&db, 777).await;
    // Listed by email too — matched case-insensitively.
    let mail_admin = SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            telegram_id: None,
            email: Some("Root@Example.com".into()),
            email_verified: true,
        })
        .await
        .unwrap();

    let config = EngineConfig {
        admin_telegram_ids: vec![777, 888], // 888 not registered yet
        admin_emails: vec!["root@example.com".into()],
    };

    let roles = SurrealRoleRepository::new(db.clone());
    let assignments = SurrealRoleAssignmentRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());

    bootstrap_superadmins(&roles, &assignments, &users, &config)
        .await
        .unwrap();

    // All five presets seeded, system-flagged, level-ordered.
    let seeded = roles.list(false).await.unwrap();
    assert_eq!(seeded.len(), 5);
    assert!(seeded.iter().all(|r| r.is_system));
    assert_eq!(seeded[0].name, "Superadmin");
    assert_eq!(seeded[0].level, 999);

    assert_eq!(assignments.superadmin_count().await.unwrap(), 2);

    // Idempotent: re-running changes nothing.
    bootstrap_superadmins(&roles, &assignments, &users, &config)
        .await
        .unwrap();
    assert_eq!(assignments.superadmin_count().await.unwrap(), 2);
    assert_eq!(assignments.get_user_roles(ops.id).await.unwrap().len(), 1);
    assert_eq!(
        assignments.get_user_roles(mail_admin.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn bootstrap_reactivates_revoked_assignment() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();

    let ops = create_user(&db, 777).await;
    let config = EngineConfig {
        admin_telegram_ids: vec![777],
        admin_emails: vec![],
    };

    let roles = SurrealRoleRepository::new(db.clone());
    let assignments = SurrealRoleAssignmentRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());

    bootstrap_superadmins(&roles, &assignments, &users, &config)
        .await
        .unwrap();

    let bindings = assignments.get_user_roles(ops.id).await.unwrap();
    let assignment_id = bindings[0].assignment.id;
    assignments.revoke_role(assignment_id).await.unwrap();

    bootstrap_superadmins(&roles, &assignments, &users, &config)
        .await
        .unwrap();

    let bindings = assignments.get_user_roles(ops.id).await.unwrap();
    assert_eq!(bindings.len(), 1);
    // Same row, reactivated.
    assert_eq!(bindings[0].assignment.id, assignment_id);
}
