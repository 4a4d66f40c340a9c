//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod permission;
/// Rank comparison guarding role assignment and role rank mutation.
pub mod rank_guard;
mod role;
/// Permission scope matching.
pub mod scope_matcher;
mod security;
mod storage_path;
mod target;

pub use action::{Action, StorageAction};
pub use permission::{
    DataScopeKind, EffectivePermissionSet, NAME_WILDCARD, NamePattern, PROTECTED_SCHEMAS,
    Permission, PermissionDefinitionInput, PermissionScope, PermissionType, SystemResource,
    is_protected_schema,
};
pub use rank_guard::RankAssessment;
pub use role::{PermissionGroup, Role, RoleRank};
pub use security::AuditAction;
pub use storage_path::{PathPattern, STORAGE_PATH_MAX_LENGTH, StoragePath};
pub use target::{AccessRequest, AccessTarget, StorageDecision};
