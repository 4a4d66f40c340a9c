//! Pure decision function relating a permission's declared scope to a concrete request.
//!
//! Matching is allow-only: a `false` never overrides another permission's `true`, and the
//! absence of any matching permission is a denial.

use crate::action::Action;
use crate::permission::{Permission, PermissionScope, is_protected_schema};
use crate::storage_path::StoragePath;
use crate::target::{AccessRequest, AccessTarget};

/// Returns whether `permission` covers `request`.
#[must_use]
pub fn matches(permission: &Permission, request: &AccessRequest) -> bool {
    if !permission.action().satisfies(request.action) {
        return false;
    }

    match (permission.scope(), &request.target) {
        (
            PermissionScope::System { resource },
            AccessTarget::System {
                resource: requested,
            },
        ) => resource == requested,
        (
            PermissionScope::Table {
                schema,
                table,
                column,
            },
            AccessTarget::Table {
                schema: requested_schema,
                table: requested_table,
                column: requested_column,
            },
        ) => {
            // Protected schemas stay read-only even if a stored permission says otherwise.
            if is_protected_schema(requested_schema) && request.action != Action::Select {
                return false;
            }

            let column_covered = match column {
                None => true,
                Some(column) => requested_column.as_deref() == Some(column.as_str()),
            };

            schema.matches(requested_schema) && table.matches(requested_table) && column_covered
        }
        (
            PermissionScope::Storage {
                bucket,
                path_pattern,
            },
            AccessTarget::Storage {
                bucket: requested_bucket,
                path,
            },
        ) => bucket.matches(requested_bucket) && path_pattern.matches(path),
        _ => false,
    }
}

/// Returns whether `permission` grants `action` on `folder` and on every path below it.
///
/// Folder-level shortcuts rely on this rather than on [`matches`]: an exact pattern naming the
/// folder covers the folder entry only, never its descendants.
#[must_use]
pub fn covers_subtree(
    permission: &Permission,
    bucket: &str,
    folder: &StoragePath,
    action: Action,
) -> bool {
    if !permission.action().satisfies(action) {
        return false;
    }

    match permission.scope() {
        PermissionScope::Storage {
            bucket: bucket_pattern,
            path_pattern,
        } => bucket_pattern.matches(bucket) && path_pattern.covers_subtree(folder),
        PermissionScope::System { .. } | PermissionScope::Table { .. } => false,
    }
}
