use std::sync::Arc;

use serde_json::json;
use tessera_application::{
    AuthorizationService, CreateRoleInput, PermissionLookup, PermissionStore, RoleGrants,
    SecurityAdminRepository, SecurityAdminService, SubtreeDeleteAuthorization,
    SubtreeDeleteResolver,
};
use tessera_core::{AccountId, AppError, PermissionId, RoleId};
use tessera_domain::{
    Action, AuditAction, Permission, PermissionDefinitionInput, PermissionScope, PermissionType,
    Role, RoleRank, StorageAction, SystemResource,
};
use tokio_util::sync::CancellationToken;

use crate::{
    InMemoryAuditRepository, InMemoryObjectLister, InMemoryPermissionSetCache,
    InMemorySecurityCatalog,
};

use super::relevant_to;

struct Harness {
    catalog: Arc<InMemorySecurityCatalog>,
    audit: Arc<InMemoryAuditRepository>,
    lister: Arc<InMemoryObjectLister>,
    authorization: AuthorizationService,
    admin: SecurityAdminService,
    admin_account: AccountId,
}

fn system_grant(resource: SystemResource) -> Permission {
    Permission::new(
        PermissionId::new(),
        format!("{}:*", resource.as_str()),
        None,
        Action::All,
        PermissionScope::System { resource },
    )
    .unwrap_or_else(|error| panic!("invalid system permission: {error}"))
}

fn storage_definition(name: &str, bucket: &str, pattern: &str, action: Action) -> PermissionDefinitionInput {
    PermissionDefinitionInput {
        name: name.to_owned(),
        description: None,
        permission_type: PermissionType::Data,
        action,
        system_resource: None,
        scope: Some(tessera_domain::DataScopeKind::Storage),
        schema_name: None,
        table_name: None,
        column_name: None,
        metadata: Some(json!({ "bucket_name": bucket, "path_pattern": pattern })),
    }
}

async fn harness() -> Harness {
    let catalog = Arc::new(InMemorySecurityCatalog::new());
    let audit = Arc::new(InMemoryAuditRepository::new());
    let lister = Arc::new(InMemoryObjectLister::new());
    let cache = Arc::new(InMemoryPermissionSetCache::new());

    let owner = Role::new(
        RoleId::new(),
        "owner",
        None,
        RoleRank::new(100).unwrap_or_else(|error| panic!("invalid rank: {error}")),
    )
    .unwrap_or_else(|error| panic!("invalid role: {error}"));
    let owner = catalog
        .create_role(owner)
        .await
        .unwrap_or_else(|error| panic!("failed to seed owner role: {error}"));

    let mut permission_ids = Vec::new();
    for resource in [
        SystemResource::Role,
        SystemResource::Permission,
        SystemResource::PermissionGroup,
        SystemResource::Account,
    ] {
        let permission = catalog
            .create_permission(system_grant(resource))
            .await
            .unwrap_or_else(|error| panic!("failed to seed permission: {error}"));
        permission_ids.push(permission.id());
    }

    let seeded = catalog
        .set_role_grants(
            owner.id(),
            RoleGrants {
                permission_ids,
                group_ids: Vec::new(),
            },
        )
        .await;
    assert!(seeded.is_ok());

    let admin_account = AccountId::new();
    let assigned = catalog.assign_role_to_account(admin_account, owner.id()).await;
    assert!(assigned.is_ok());

    let authorization = AuthorizationService::new(catalog.clone(), audit.clone())
        .with_permission_cache(cache.clone());
    let admin = SecurityAdminService::new(authorization.clone(), catalog.clone(), audit.clone())
        .with_permission_cache(cache);

    Harness {
        catalog,
        audit,
        lister,
        authorization,
        admin,
        admin_account,
    }
}

impl Harness {
    async fn role_with(&self, name: &str, rank: i64, definitions: Vec<PermissionDefinitionInput>) -> Role {
        let role = self
            .admin
            .create_role(
                self.admin_account,
                CreateRoleInput {
                    name: name.to_owned(),
                    description: None,
                    rank,
                },
            )
            .await
            .unwrap_or_else(|error| panic!("failed to create role: {error}"));

        let mut permission_ids = Vec::new();
        for definition in definitions {
            let permission = self
                .admin
                .create_permission(self.admin_account, definition)
                .await
                .unwrap_or_else(|error| panic!("failed to create permission: {error}"));
            permission_ids.push(permission.id());
        }

        let granted = self
            .admin
            .set_role_grants(
                self.admin_account,
                role.id(),
                RoleGrants {
                    permission_ids,
                    group_ids: Vec::new(),
                },
            )
            .await;
        assert!(granted.is_ok());

        role
    }

    async fn member_with(&self, role: &Role) -> AccountId {
        let account_id = AccountId::new();
        let assigned = self
            .admin
            .assign_role(self.admin_account, account_id, role.id())
            .await;
        assert!(assigned.is_ok());
        account_id
    }
}

#[tokio::test]
async fn administered_grants_drive_storage_evaluation() {
    let harness = harness().await;
    let viewer = harness
        .role_with(
            "viewer",
            10,
            vec![storage_definition("media-public-read", "media", "public/*", Action::Select)],
        )
        .await;
    let account_id = harness.member_with(&viewer).await;

    let read = harness
        .authorization
        .has_storage_permission(account_id, "media", StorageAction::Read, "public/a.png")
        .await;
    assert!(matches!(read, Ok(true)));

    let upload = harness
        .authorization
        .has_storage_permission(account_id, "media", StorageAction::Upload, "public/a.png")
        .await;
    assert!(matches!(upload, Ok(false)));

    let private = harness
        .authorization
        .has_storage_permission(account_id, "media", StorageAction::Read, "private/a.png")
        .await;
    assert!(matches!(private, Ok(false)));
}

#[tokio::test]
async fn grant_changes_invalidate_cached_permission_sets() {
    let harness = harness().await;
    let viewer = harness
        .role_with(
            "viewer",
            10,
            vec![storage_definition("media-read", "media", "*", Action::Select)],
        )
        .await;
    let account_id = harness.member_with(&viewer).await;

    let upload = harness
        .admin
        .create_permission(
            harness.admin_account,
            storage_definition("media-upload", "media", "inbox/*", Action::Insert),
        )
        .await
        .unwrap_or_else(|error| panic!("failed to create permission: {error}"));

    let before = harness
        .authorization
        .has_storage_permission(account_id, "media", StorageAction::Upload, "inbox/a.png")
        .await;
    assert!(matches!(before, Ok(false)));

    let existing: Vec<PermissionId> = harness
        .catalog
        .load_effective_permissions(
            account_id,
            &PermissionLookup::Storage {
                bucket: "media".to_owned(),
            },
        )
        .await
        .unwrap_or_else(|error| panic!("failed to load permissions: {error}"))
        .iter()
        .map(Permission::id)
        .collect();

    let regranted = harness
        .admin
        .set_role_grants(
            harness.admin_account,
            viewer.id(),
            RoleGrants {
                permission_ids: existing.into_iter().chain([upload.id()]).collect(),
                group_ids: Vec::new(),
            },
        )
        .await;
    assert!(regranted.is_ok());

    let after = harness
        .authorization
        .has_storage_permission(account_id, "media", StorageAction::Upload, "inbox/a.png")
        .await;
    assert!(matches!(after, Ok(true)));
}

#[tokio::test]
async fn folder_delete_enumerates_listed_objects() {
    let harness = harness().await;
    let editor = harness
        .role_with(
            "editor",
            20,
            vec![
                storage_definition("docs-a-delete", "files", "docs/a/*", Action::Delete),
                storage_definition("docs-readme-delete", "files", "docs/readme.md", Action::Delete),
            ],
        )
        .await;
    let account_id = harness.member_with(&editor).await;

    for name in ["docs/readme.md", "docs/a/one.txt", "docs/a/deep/two.txt"] {
        let inserted = harness.lister.insert_object("files", name).await;
        assert!(inserted.is_ok());
    }

    let resolver =
        SubtreeDeleteResolver::new(harness.authorization.clone(), harness.lister.clone());
    let token = CancellationToken::new();

    let allowed = resolver
        .authorize_folder_delete(account_id, "files", "docs", &token)
        .await;
    let Ok(SubtreeDeleteAuthorization::PerObject(paths)) = &allowed else {
        panic!("expected a per-object authorization, got {allowed:?}");
    };
    assert_eq!(paths.len(), 3);

    let inserted = harness.lister.insert_object("files", "docs/b/three.txt").await;
    assert!(inserted.is_ok());

    let denied = resolver
        .authorize_folder_delete(account_id, "files", "docs", &token)
        .await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));
    assert!(
        harness
            .audit
            .events()
            .await
            .iter()
            .any(|event| event.action == AuditAction::AccessDenied && event.actor == account_id)
    );

    let whole = resolver
        .authorize_folder_delete(account_id, "files", "docs/a/", &token)
        .await;
    assert!(matches!(whole, Ok(SubtreeDeleteAuthorization::WholeSubtree)));
}

#[tokio::test]
async fn assigned_roles_cannot_be_deleted() {
    let harness = harness().await;
    let viewer = harness.role_with("viewer", 10, Vec::new()).await;
    let account_id = harness.member_with(&viewer).await;

    let refused = harness.admin.delete_role(harness.admin_account, viewer.id()).await;
    assert!(matches!(refused, Err(AppError::Conflict(_))));

    let unassigned = harness
        .admin
        .unassign_role(harness.admin_account, account_id, viewer.id())
        .await;
    assert!(unassigned.is_ok());

    let deleted = harness.admin.delete_role(harness.admin_account, viewer.id()).await;
    assert!(deleted.is_ok());
    assert!(matches!(harness.catalog.find_role(viewer.id()).await, Ok(None)));
}

#[tokio::test]
async fn lookups_prune_unrelated_rows() {
    let harness = harness().await;
    let mixed = harness
        .role_with(
            "mixed",
            10,
            vec![
                storage_definition("media-read", "media", "*", Action::Select),
                storage_definition("any-bucket-read", "*", "shared/*", Action::Select),
                storage_definition("files-read", "files", "*", Action::Select),
            ],
        )
        .await;
    let account_id = harness.member_with(&mixed).await;

    let media = harness
        .catalog
        .load_effective_permissions(
            account_id,
            &PermissionLookup::Storage {
                bucket: "media".to_owned(),
            },
        )
        .await
        .unwrap_or_else(|error| panic!("failed to load permissions: {error}"));
    let mut names: Vec<&str> = media.iter().map(|permission| permission.name().as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["any-bucket-read", "media-read"]);

    let system = harness
        .catalog
        .load_effective_permissions(account_id, &PermissionLookup::System)
        .await
        .unwrap_or_else(|error| panic!("failed to load permissions: {error}"));
    assert!(system.is_empty());

    assert!(media.iter().all(|permission| relevant_to(
        permission,
        &PermissionLookup::Storage {
            bucket: "media".to_owned()
        }
    )));
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let harness = harness().await;

    let missing_role = harness
        .catalog
        .assign_role_to_account(AccountId::new(), RoleId::new())
        .await;
    assert!(matches!(missing_role, Err(AppError::NotFound(_))));

    let viewer = harness.role_with("viewer", 10, Vec::new()).await;
    let missing_permission = harness
        .catalog
        .set_role_grants(
            viewer.id(),
            RoleGrants {
                permission_ids: vec![PermissionId::new()],
                group_ids: Vec::new(),
            },
        )
        .await;
    assert!(matches!(missing_permission, Err(AppError::NotFound(_))));

    let assignments = harness.catalog.list_role_assignments().await;
    let Ok(assignments) = assignments else {
        panic!("listing assignments failed");
    };
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].role_name, "owner");
    assert!(assignments[0].assigned_at.ends_with('Z'));
}
