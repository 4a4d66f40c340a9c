use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use tessera_application::{RoleAssignment, RoleGrants, SecurityAdminRepository};
use tessera_core::{AccountId, AppError, AppResult, PermissionGroupId, PermissionId, RoleId};
use tessera_domain::{Permission, PermissionGroup, Role, RoleRank};

mod assignments;
mod catalog;
mod roles;


/// PostgreSQL-backed repository for role, permission catalog and assignment administration.
#[derive(Clone)]
pub struct PostgresSecurityAdminRepository {
    pool: PgPool,
}

impl PostgresSecurityAdminRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    rank: i32,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let rank = RoleRank::new(i64::from(self.rank)).map_err(|error| {
            AppError::Internal(format!("invalid stored rank for role '{}': {error}", self.id))
        })?;

        Role::new(RoleId::from_uuid(self.id), self.name, self.description, rank)
    }
}

#[derive(Debug, FromRow)]
struct RoleAssignmentRow {
    account_id: uuid::Uuid,
    role_id: uuid::Uuid,
    role_name: String,
    role_rank: i32,
    assigned_at: String,
}

#[derive(Debug, FromRow)]
struct PermissionGroupRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    permission_ids: Vec<uuid::Uuid>,
}

#[async_trait]
impl SecurityAdminRepository for PostgresSecurityAdminRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.list_roles_impl().await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.find_role_impl(role_id).await
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        self.create_role_impl(role).await
    }

    async fn update_role(&self, role: Role) -> AppResult<Role> {
        self.update_role_impl(role).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn create_permission(&self, permission: Permission) -> AppResult<Permission> {
        self.create_permission_impl(permission).await
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        self.delete_permission_impl(permission_id).await
    }

    async fn list_permission_groups(&self) -> AppResult<Vec<PermissionGroup>> {
        self.list_permission_groups_impl().await
    }

    async fn create_permission_group(&self, group: PermissionGroup) -> AppResult<PermissionGroup> {
        self.create_permission_group_impl(group).await
    }

    async fn set_permission_group_members(
        &self,
        group_id: PermissionGroupId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.set_permission_group_members_impl(group_id, permission_ids)
            .await
    }

    async fn set_role_grants(&self, role_id: RoleId, grants: RoleGrants) -> AppResult<()> {
        self.set_role_grants_impl(role_id, grants).await
    }

    async fn assign_role_to_account(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.assign_role_to_account_impl(account_id, role_id).await
    }

    async fn remove_role_from_account(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.remove_role_from_account_impl(account_id, role_id)
            .await
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        self.list_role_assignments_impl().await
    }

    async fn max_rank_for_account(&self, account_id: AccountId) -> AppResult<Option<RoleRank>> {
        self.max_rank_for_account_impl(account_id).await
    }
}

fn query_failure(context: &str, error: sqlx::Error) -> AppError {
    AppError::QueryFailure(format!("{context}: {error}"))
}

fn map_unique_conflict(error: sqlx::Error, kind: &str, name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("{kind} '{name}' already exists"));
    }

    query_failure(&format!("failed to create {kind}"), error)
}

fn map_missing_reference(error: sqlx::Error, context: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23503")
    {
        return AppError::NotFound(format!("{context}: referenced object does not exist"));
    }

    query_failure(context, error)
}

fn rank_column(rank: RoleRank) -> AppResult<i32> {
    i32::try_from(rank.value())
        .map_err(|error| AppError::Validation(format!("role rank {rank} is out of range: {error}")))
}
