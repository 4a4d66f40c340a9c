use async_trait::async_trait;

use tessera_core::{AccountId, AppResult, PermissionGroupId, PermissionId, RoleId};
use tessera_domain::{Permission, PermissionGroup, Role, RoleRank};

use super::roles::{RoleAssignment, RoleGrants};

/// Repository port for role, permission catalog and assignment administration.
#[async_trait]
pub trait SecurityAdminRepository: Send + Sync {
    /// Lists all roles ordered by descending rank.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds one role.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Persists a new role; fails with `Conflict` when the name is taken.
    async fn create_role(&self, role: Role) -> AppResult<Role>;

    /// Persists a changed role description or rank.
    async fn update_role(&self, role: Role) -> AppResult<Role>;

    /// Deletes a role; fails with `Conflict` while any account holds it.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Lists the permission catalog.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Persists a validated permission.
    async fn create_permission(&self, permission: Permission) -> AppResult<Permission>;

    /// Deletes a permission together with its role and group attachments.
    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()>;

    /// Lists permission groups with their members.
    async fn list_permission_groups(&self) -> AppResult<Vec<PermissionGroup>>;

    /// Persists a new permission group and its members.
    async fn create_permission_group(&self, group: PermissionGroup) -> AppResult<PermissionGroup>;

    /// Replaces the members of a permission group.
    async fn set_permission_group_members(
        &self,
        group_id: PermissionGroupId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;

    /// Replaces a role's direct permissions and permission groups.
    async fn set_role_grants(&self, role_id: RoleId, grants: RoleGrants) -> AppResult<()>;

    /// Makes `role_id` the account's role, replacing any previous assignment.
    async fn assign_role_to_account(&self, account_id: AccountId, role_id: RoleId)
    -> AppResult<()>;

    /// Removes a role assignment from an account.
    async fn remove_role_from_account(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()>;

    /// Lists current role assignments.
    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>>;

    /// Returns the highest rank among the account's roles, or `None` without a role.
    async fn max_rank_for_account(&self, account_id: AccountId) -> AppResult<Option<RoleRank>>;
}
