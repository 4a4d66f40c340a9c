//! Fakes shared by the service test modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tessera_core::{AccountId, AppError, AppResult, PermissionId};
use tessera_domain::{
    Action, EffectivePermissionSet, NamePattern, PathPattern, Permission, PermissionScope,
    SystemResource,
};
use tokio::sync::Mutex;

use crate::{AuditEvent, AuditRepository, PermissionLookup, PermissionSetCache, PermissionStore};

pub(crate) fn storage_permission(bucket: &str, pattern: &str, action: Action) -> Permission {
    Permission::new(
        PermissionId::new(),
        format!("{bucket}:{pattern}:{}", action.as_str()),
        None,
        action,
        PermissionScope::Storage {
            bucket: NamePattern::parse(bucket)
                .unwrap_or_else(|error| panic!("invalid bucket pattern: {error}")),
            path_pattern: PathPattern::parse(pattern)
                .unwrap_or_else(|error| panic!("invalid path pattern: {error}")),
        },
    )
    .unwrap_or_else(|error| panic!("invalid storage permission: {error}"))
}

pub(crate) fn system_permission(resource: SystemResource, action: Action) -> Permission {
    Permission::new(
        PermissionId::new(),
        format!("{}:{}", resource.as_str(), action.as_str()),
        None,
        action,
        PermissionScope::System { resource },
    )
    .unwrap_or_else(|error| panic!("invalid system permission: {error}"))
}

pub(crate) fn table_permission(schema: &str, table: &str, action: Action) -> Permission {
    Permission::new(
        PermissionId::new(),
        format!("{schema}.{table}:{}", action.as_str()),
        None,
        action,
        PermissionScope::Table {
            schema: NamePattern::parse(schema)
                .unwrap_or_else(|error| panic!("invalid schema pattern: {error}")),
            table: NamePattern::parse(table)
                .unwrap_or_else(|error| panic!("invalid table pattern: {error}")),
            column: None,
        },
    )
    .unwrap_or_else(|error| panic!("invalid table permission: {error}"))
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    pub(crate) events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// How the fake store answers.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) enum StoreBehavior {
    #[default]
    Answer,
    Fail,
    Stall(Duration),
}

#[derive(Default)]
pub(crate) struct FakePermissionStore {
    grants: Mutex<HashMap<AccountId, Vec<Permission>>>,
    behavior: Mutex<StoreBehavior>,
    calls: AtomicUsize,
}

impl FakePermissionStore {
    pub(crate) fn with_grants(grants: impl IntoIterator<Item = (AccountId, Vec<Permission>)>) -> Self {
        Self {
            grants: Mutex::new(grants.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) async fn set_grants(&self, account_id: AccountId, permissions: Vec<Permission>) {
        self.grants.lock().await.insert(account_id, permissions);
    }

    pub(crate) async fn set_behavior(&self, behavior: StoreBehavior) {
        *self.behavior.lock().await = behavior;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionStore for FakePermissionStore {
    async fn load_effective_permissions(
        &self,
        account_id: AccountId,
        _lookup: &PermissionLookup,
    ) -> AppResult<EffectivePermissionSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let behavior = *self.behavior.lock().await;
        match behavior {
            StoreBehavior::Answer => {}
            StoreBehavior::Fail => {
                return Err(AppError::QueryFailure("store unavailable".to_owned()));
            }
            StoreBehavior::Stall(duration) => tokio::time::sleep(duration).await,
        }

        Ok(EffectivePermissionSet::from_permissions(
            self.grants
                .lock()
                .await
                .get(&account_id)
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

#[derive(Default)]
pub(crate) struct FakePermissionSetCache {
    generation: Mutex<u64>,
    entries: Mutex<HashMap<(AccountId, PermissionLookup), EffectivePermissionSet>>,
    pub(crate) invalidations: AtomicUsize,
}

impl FakePermissionSetCache {
    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl PermissionSetCache for FakePermissionSetCache {
    async fn generation(&self) -> AppResult<u64> {
        Ok(*self.generation.lock().await)
    }

    async fn get_permission_set(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<Option<EffectivePermissionSet>> {
        Ok(self
            .entries
            .lock()
            .await
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
        if generation == *self.generation.lock().await {
            self.entries
                .lock()
                .await
                .insert((account_id, lookup), permissions);
        }
        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        *self.generation.lock().await += 1;
        self.entries.lock().await.clear();
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
