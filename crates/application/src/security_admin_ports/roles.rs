use tessera_core::{AccountId, PermissionGroupId, PermissionId, RoleId};
use tessera_domain::RoleRank;

/// Assignment projection mapping an account to its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Assigned account.
    pub account_id: AccountId,
    /// Role identifier.
    pub role_id: RoleId,
    /// Role name.
    pub role_name: String,
    /// Role rank at listing time.
    pub role_rank: RoleRank,
    /// Assignment timestamp in RFC3339.
    pub assigned_at: String,
}

/// Input payload for creating roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique role name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Requested rank; validated before use.
    pub rank: i64,
}

/// Input payload for updating roles; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement rank; validated before use.
    pub rank: Option<i64>,
}

/// Input payload for creating permission groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePermissionGroupInput {
    /// Unique group name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Permissions bundled by the group.
    pub permission_ids: Vec<PermissionId>,
}

/// Full replacement of a role's direct permissions and permission groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGrants {
    /// Directly attached permissions.
    pub permission_ids: Vec<PermissionId>,
    /// Attached permission groups.
    pub group_ids: Vec<PermissionGroupId>,
}
