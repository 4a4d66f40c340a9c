use serde::{Deserialize, Serialize};

use crate::action::{Action, StorageAction};
use crate::permission::SystemResource;
use crate::storage_path::StoragePath;

/// Concrete object a request touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessTarget {
    /// A system object kind.
    System {
        /// Requested resource kind.
        resource: SystemResource,
    },
    /// A table, or one column of it.
    Table {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Column name; absent for table-wide requests.
        column: Option<String>,
    },
    /// A storage object or folder.
    Storage {
        /// Bucket name.
        bucket: String,
        /// Object path within the bucket.
        path: StoragePath,
    },
}

impl AccessTarget {
    /// Returns the namespace (bucket, schema or `system`) used in denial messages.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::Table { schema, .. } => schema.as_str(),
            Self::Storage { bucket, .. } => bucket.as_str(),
        }
    }

    /// Returns the object label used in denial messages.
    #[must_use]
    pub fn object_label(&self) -> String {
        match self {
            Self::System { resource } => resource.as_str().to_owned(),
            Self::Table {
                table,
                column: Some(column),
                ..
            } => format!("{table}.{column}"),
            Self::Table { table, .. } => table.clone(),
            Self::Storage { path, .. } => path.to_string(),
        }
    }
}

/// One action requested against one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Target being accessed.
    pub target: AccessTarget,
    /// Requested action.
    pub action: Action,
}

impl AccessRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(target: AccessTarget, action: Action) -> Self {
        Self { target, action }
    }

    /// Creates a storage request for one path.
    #[must_use]
    pub fn storage(bucket: impl Into<String>, path: StoragePath, action: StorageAction) -> Self {
        Self {
            target: AccessTarget::Storage {
                bucket: bucket.into(),
                path,
            },
            action: action.action(),
        }
    }
}

/// Per-path storage decision reported by bulk evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageDecision {
    /// Read access.
    pub can_read: bool,
    /// Update access.
    pub can_update: bool,
    /// Delete access.
    pub can_delete: bool,
    /// Upload access.
    pub can_upload: bool,
}

impl StorageDecision {
    /// Decision denying every action.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Decision allowing every action.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            can_read: true,
            can_update: true,
            can_delete: true,
            can_upload: true,
        }
    }

    /// Returns whether every action is allowed.
    #[must_use]
    pub fn is_full(&self) -> bool {
        *self == Self::allow_all()
    }

    /// Returns the decision cell for one action.
    #[must_use]
    pub fn allows(&self, action: StorageAction) -> bool {
        match action {
            StorageAction::Read => self.can_read,
            StorageAction::Update => self.can_update,
            StorageAction::Delete => self.can_delete,
            StorageAction::Upload => self.can_upload,
        }
    }

    /// Sets the decision cell for one action.
    pub fn set(&mut self, action: StorageAction, allowed: bool) {
        match action {
            StorageAction::Read => self.can_read = allowed,
            StorageAction::Update => self.can_update = allowed,
            StorageAction::Delete => self.can_delete = allowed,
            StorageAction::Upload => self.can_upload = allowed,
        }
    }
}
