use async_trait::async_trait;
use tessera_core::{AccountId, AppResult};
use tessera_domain::EffectivePermissionSet;

use super::store::PermissionLookup;

/// Optional cache port for effective permission sets.
///
/// Entries are invalidated wholesale on every role, permission, group or assignment mutation.
/// Writes carry the generation observed before the store was read so a load racing an
/// invalidation never repopulates the cache with a stale set.
#[async_trait]
pub trait PermissionSetCache: Send + Sync {
    /// Returns the current invalidation generation.
    async fn generation(&self) -> AppResult<u64>;

    /// Returns a cached set for one account and lookup.
    async fn get_permission_set(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<Option<EffectivePermissionSet>>;

    /// Stores a set loaded while `generation` was current.
    async fn set_permission_set(
        &self,
        account_id: AccountId,
        lookup: PermissionLookup,
        permissions: EffectivePermissionSet,
        generation: u64,
    ) -> AppResult<()>;

    /// Drops every cached set and advances the generation.
    async fn invalidate_all(&self) -> AppResult<()>;
}
