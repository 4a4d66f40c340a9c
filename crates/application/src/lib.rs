//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod authorization_ports;
mod authorization_service;
mod security_admin_ports;
mod security_admin_service;
mod storage_ports;
mod subtree_delete_resolver;

#[cfg(test)]
mod test_support;

pub use audit_ports::{AuditEvent, AuditRepository};
pub use authorization_ports::{PermissionLookup, PermissionSetCache, PermissionStore};
pub use authorization_service::{AuthorizationService, EvaluationConfig};
pub use security_admin_ports::{
    CreatePermissionGroupInput, CreateRoleInput, RoleAssignment, RoleGrants,
    SecurityAdminRepository, UpdateRoleInput,
};
pub use security_admin_service::SecurityAdminService;
pub use storage_ports::{ObjectLister, ObjectListingPage};
pub use subtree_delete_resolver::{
    SubtreeDeleteAuthorization, SubtreeDeleteResolver, SubtreeLimits, SubtreeMembers,
};
