use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by engine and administration use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    SecurityRoleCreated,
    /// Emitted when a role's rank or description changes.
    SecurityRoleUpdated,
    /// Emitted when a role is deleted.
    SecurityRoleDeleted,
    /// Emitted when a permission is defined.
    SecurityPermissionCreated,
    /// Emitted when a permission is removed.
    SecurityPermissionDeleted,
    /// Emitted when a permission group is created.
    SecurityPermissionGroupCreated,
    /// Emitted when a permission group's members change.
    SecurityPermissionGroupUpdated,
    /// Emitted when a role's direct permissions or groups change.
    SecurityRoleGrantsChanged,
    /// Emitted when a role is assigned to an account.
    SecurityRoleAssigned,
    /// Emitted when a role is removed from an account.
    SecurityRoleUnassigned,
    /// Emitted when a mutating request is denied by evaluation.
    AccessDenied,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityRoleCreated => "security.role.created",
            Self::SecurityRoleUpdated => "security.role.updated",
            Self::SecurityRoleDeleted => "security.role.deleted",
            Self::SecurityPermissionCreated => "security.permission.created",
            Self::SecurityPermissionDeleted => "security.permission.deleted",
            Self::SecurityPermissionGroupCreated => "security.permission_group.created",
            Self::SecurityPermissionGroupUpdated => "security.permission_group.updated",
            Self::SecurityRoleGrantsChanged => "security.role.grants_changed",
            Self::SecurityRoleAssigned => "security.role.assigned",
            Self::SecurityRoleUnassigned => "security.role.unassigned",
            Self::AccessDenied => "security.access.denied",
        }
    }
}
