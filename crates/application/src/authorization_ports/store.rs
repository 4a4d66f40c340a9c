use async_trait::async_trait;
use tessera_core::{AccountId, AppResult};
use tessera_domain::{AccessTarget, EffectivePermissionSet};

/// Narrows the permission rows a store loads for one evaluation.
///
/// Lookups only prune rows that can never match; the scope matcher still decides every cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PermissionLookup {
    /// System permissions.
    System,
    /// Table permissions whose schema is `schema` or the wildcard.
    Table {
        /// Requested schema.
        schema: String,
    },
    /// Storage permissions whose bucket is `bucket` or the wildcard.
    Storage {
        /// Requested bucket.
        bucket: String,
    },
}

impl PermissionLookup {
    /// Returns the lookup able to answer requests against `target`.
    #[must_use]
    pub fn for_target(target: &AccessTarget) -> Self {
        match target {
            AccessTarget::System { .. } => Self::System,
            AccessTarget::Table { schema, .. } => Self::Table {
                schema: schema.clone(),
            },
            AccessTarget::Storage { bucket, .. } => Self::Storage {
                bucket: bucket.clone(),
            },
        }
    }
}

/// Repository port for loading raw permission rows.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Loads the effective permission set of an account in one consistent snapshot.
    ///
    /// The set is the account's role permissions plus the permissions of the role's groups,
    /// restricted to rows relevant for `lookup`. Accounts without a role get an empty set.
    async fn load_effective_permissions(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<EffectivePermissionSet>;
}
