use std::collections::HashMap;

use async_trait::async_trait;
use tessera_application::{PermissionLookup, PermissionSetCache};
use tessera_core::{AccountId, AppResult};
use tessera_domain::EffectivePermissionSet;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<(AccountId, PermissionLookup), EffectivePermissionSet>,
}

/// In-memory cache adapter for effective permission sets.
///
/// Entries live until the next `invalidate_all`; there is no expiry. The generation check and
/// the insert happen under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryPermissionSetCache {
    state: RwLock<CacheState>,
}

impl InMemoryPermissionSetCache {
    /// Creates an empty permission set cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionSetCache for InMemoryPermissionSetCache {
    async fn generation(&self) -> AppResult<u64> {
        Ok(self.state.read().await.generation)
    }

    async fn get_permission_set(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<Option<EffectivePermissionSet>> {
        Ok(self
            .state
            .read()
            .await
            .entries
            .get(&(account_id, lookup.clone()))
            .cloned())
    }

    async fn set_permission_set(
        &self,
        account_id: AccountId,
        lookup: PermissionLookup,
        permissions: EffectivePermissionSet,
        generation: u64,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.generation == generation {
            state.entries.insert((account_id, lookup), permissions);
        }

        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();

        Ok(())
    }
}
