use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tessera_core::{AccountId, AppError, AppResult};
use tessera_domain::{Action, AuditAction, StoragePath};
use tokio_util::sync::CancellationToken;

use crate::test_support::{FakeAuditRepository, FakePermissionStore, storage_permission};
use crate::{AuthorizationService, EvaluationConfig, ObjectLister, ObjectListingPage};

use super::{SubtreeDeleteAuthorization, SubtreeDeleteResolver, SubtreeLimits};

/// Lists a fixed tree keyed by folder prefix; entries ending in `/` are folders.
#[derive(Default)]
struct FakeObjectLister {
    tree: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    stuck: HashSet<String>,
    cancel_on_list: Option<CancellationToken>,
    calls: AtomicUsize,
}

impl FakeObjectLister {
    fn with_tree(entries: &[(&str, &[&str])]) -> Self {
        Self {
            tree: entries
                .iter()
                .map(|(folder, children)| {
                    (
                        (*folder).to_owned(),
                        children.iter().map(|child| (*child).to_owned()).collect(),
                    )
                })
                .collect(),
            ..Self::default()
        }
    }

    fn failing_on(mut self, folder: &str) -> Self {
        self.failing.insert(folder.to_owned());
        self
    }

    fn stuck_on(mut self, folder: &str) -> Self {
        self.stuck.insert(folder.to_owned());
        self
    }

    fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_list = Some(token);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectLister for FakeObjectLister {
    async fn list_children(
        &self,
        _bucket: &str,
        folder: &StoragePath,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<ObjectListingPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_list {
            token.cancel();
        }

        let prefix = folder.listing_prefix();
        if self.failing.contains(&prefix) {
            return Err(AppError::QueryFailure(format!("listing '{prefix}' failed")));
        }

        let children = self.tree.get(&prefix).cloned().unwrap_or_default();
        let offset = cursor
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + limit).min(children.len());

        let mut page = ObjectListingPage::default();
        for child in &children[offset..end] {
            let path = StoragePath::parse(&format!("{prefix}{child}"))
                .unwrap_or_else(|error| panic!("invalid fake child: {error}"));
            if path.is_folder() {
                page.folders.push(path);
            } else {
                page.files.push(path);
            }
        }
        if self.stuck.contains(&prefix) {
            page.next_cursor = Some("stuck".to_owned());
        } else if end < children.len() {
            page.next_cursor = Some(end.to_string());
        }

        Ok(page)
    }
}

fn resolver(
    store: FakePermissionStore,
    lister: FakeObjectLister,
) -> (SubtreeDeleteResolver, Arc<FakeObjectLister>, Arc<FakeAuditRepository>) {
    let lister = Arc::new(lister);
    let audit = Arc::new(FakeAuditRepository::default());
    let authorization_service = AuthorizationService::new(Arc::new(store), audit.clone());
    (
        SubtreeDeleteResolver::new(authorization_service, lister.clone()),
        lister,
        audit,
    )
}

fn docs_tree() -> FakeObjectLister {
    FakeObjectLister::with_tree(&[
        ("docs/", &["a.txt", "b.txt", "drafts/", "final/"]),
        ("docs/drafts/", &["c.txt", "old/"]),
        ("docs/drafts/old/", &["d.txt"]),
        ("docs/final/", &["e.txt"]),
    ])
}

fn members(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[tokio::test]
async fn folder_grant_authorizes_without_enumeration() {
    let account = AccountId::new();
    let store = FakePermissionStore::with_grants([(
        account,
        vec![storage_permission("assets", "docs/*", Action::Delete)],
    )]);
    let (resolver, lister, _) = resolver(store, docs_tree());

    let outcome = resolver
        .authorize_folder_delete(account, "assets", "docs", &CancellationToken::new())
        .await
        .unwrap_or_else(|error| panic!("folder delete refused: {error}"));

    assert_eq!(outcome, SubtreeDeleteAuthorization::WholeSubtree);
    assert_eq!(lister.calls(), 0);
}

#[tokio::test]
async fn per_object_grants_authorize_enumerated_members() {
    let account = AccountId::new();
    let store = FakePermissionStore::with_grants([(
        account,
        vec![
            storage_permission("assets", "docs/a.txt", Action::Delete),
            storage_permission("assets", "docs/b.txt", Action::Delete),
            storage_permission("assets", "docs/drafts/c.txt", Action::Delete),
            storage_permission("assets", "docs/drafts/old/d.txt", Action::Delete),
            storage_permission("assets", "docs/final/e.txt", Action::Delete),
        ],
    )]);
    let (resolver, _, _) = resolver(store, docs_tree());

    let outcome = resolver
        .authorize_folder_delete(account, "assets", "docs/", &CancellationToken::new())
        .await
        .unwrap_or_else(|error| panic!("folder delete refused: {error}"));

    let SubtreeDeleteAuthorization::PerObject(files) = outcome else {
        panic!("expected per-object authorization");
    };
    let names: Vec<String> = files.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        members(&[
            "docs/a.txt",
            "docs/b.txt",
            "docs/drafts/c.txt",
            "docs/final/e.txt",
            "docs/drafts/old/d.txt",
        ])
    );
}

#[tokio::test]
async fn one_denied_member_denies_the_whole_subtree() {
    let account = AccountId::new();
    let store = FakePermissionStore::with_grants([(
        account,
        vec![storage_permission("assets", "docs/drafts/*", Action::Delete)],
    )]);
    let (resolver, _, audit) = resolver(store, docs_tree());

    let result = resolver
        .authorize_subtree_delete(
            account,
            "assets",
            "docs/",
            &members(&["docs/drafts/c.txt", "docs/a.txt"]),
        )
        .await;

    assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    let events = audit.events.lock().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::AccessDenied);
}

#[tokio::test]
async fn granted_members_authorize_without_folder_grant() {
    let account = AccountId::new();
    let store = FakePermissionStore::with_grants([(
        account,
        vec![storage_permission("assets", "docs/drafts/*", Action::Delete)],
    )]);
    let (resolver, _, _) = resolver(store, docs_tree());

    let result = resolver
        .authorize_subtree_delete(
            account,
            "assets",
            "docs/drafts",
            &members(&["docs/drafts/c.txt", "docs/drafts/old/d.txt"]),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn empty_member_set_without_folder_grant_is_denied() {
    let account = AccountId::new();
    let (resolver, _, _) = resolver(FakePermissionStore::default(), docs_tree());

    let result = resolver
        .authorize_subtree_delete(account, "assets", "docs/", &[])
        .await;

    assert!(matches!(result, Err(AppError::PermissionDenied(_))));
}

#[tokio::test]
async fn members_outside_folder_are_rejected() {
    let account = AccountId::new();
    let (resolver, _, _) = resolver(FakePermissionStore::default(), docs_tree());

    let result = resolver
        .authorize_subtree_delete(account, "assets", "docs/", &members(&["other/x.txt"]))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn enumeration_pages_through_large_folders() {
    let files: Vec<String> = (0..25).map(|index| format!("f{index}.bin")).collect();
    let file_refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let lister = FakeObjectLister::with_tree(&[("bulk/", file_refs.as_slice())]);
    let (resolver, lister, _) = resolver(FakePermissionStore::default(), lister);
    let resolver = resolver.with_limits(SubtreeLimits {
        listing_batch_size: 10,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("bulk/").unwrap_or_else(|error| panic!("{error}"));

    let found = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await
        .unwrap_or_else(|error| panic!("enumeration failed: {error}"));

    assert_eq!(found.files.len(), 25);
    assert!(found.folders.is_empty());
    assert_eq!(lister.calls(), 3);
}

#[tokio::test]
async fn too_many_files_aborts_with_capacity_error() {
    let (resolver, _, _) = resolver(FakePermissionStore::default(), docs_tree());
    let resolver = resolver.with_limits(SubtreeLimits {
        max_files: 3,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("docs/").unwrap_or_else(|error| panic!("{error}"));

    let result = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
}

#[tokio::test]
async fn too_many_folders_aborts_with_capacity_error() {
    let (resolver, _, _) = resolver(FakePermissionStore::default(), docs_tree());
    let resolver = resolver.with_limits(SubtreeLimits {
        max_folders: 2,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("docs/").unwrap_or_else(|error| panic!("{error}"));

    let result = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
}

#[tokio::test]
async fn wide_folder_stops_listing_once_folder_limit_is_passed() {
    let children: Vec<String> = (0..200).map(|index| format!("sub{index}/")).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    let lister = FakeObjectLister::with_tree(&[("wide/", child_refs.as_slice())]);
    let (resolver, lister, _) = resolver(FakePermissionStore::default(), lister);
    let resolver = resolver.with_limits(SubtreeLimits {
        max_folders: 2,
        listing_batch_size: 1,
        folder_concurrency: 1,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("wide/").unwrap_or_else(|error| panic!("{error}"));

    let result = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
    assert_eq!(lister.calls(), 3);
}

#[tokio::test]
async fn file_limit_counts_files_from_earlier_folders() {
    let lister = FakeObjectLister::with_tree(&[
        ("docs/", &["a.txt", "b.txt", "next/"]),
        ("docs/next/", &["c.txt", "d.txt", "e.txt", "f.txt"]),
    ]);
    let (resolver, lister, _) = resolver(FakePermissionStore::default(), lister);
    let resolver = resolver.with_limits(SubtreeLimits {
        max_files: 3,
        listing_batch_size: 1,
        folder_concurrency: 1,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("docs/").unwrap_or_else(|error| panic!("{error}"));

    let result = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
    assert_eq!(lister.calls(), 5);
}

#[tokio::test]
async fn repeated_listing_cursor_skips_the_folder() {
    let (resolver, _, _) = resolver(
        FakePermissionStore::default(),
        docs_tree().stuck_on("docs/drafts/"),
    );
    let folder = StoragePath::parse("docs/").unwrap_or_else(|error| panic!("{error}"));

    let found = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await
        .unwrap_or_else(|error| panic!("enumeration failed: {error}"));

    let names: Vec<String> = found.files.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        members(&["docs/a.txt", "docs/b.txt", "docs/final/e.txt"])
    );
}

#[tokio::test]
async fn members_beyond_bulk_limit_are_evaluated_in_batches() {
    let account = AccountId::new();
    let files: Vec<String> = (0..5).map(|index| format!("docs/f{index}.txt")).collect();
    let store = Arc::new(FakePermissionStore::with_grants([(
        account,
        files
            .iter()
            .map(|file| storage_permission("assets", file, Action::Delete))
            .collect(),
    )]));
    let authorization_service =
        AuthorizationService::new(store.clone(), Arc::new(FakeAuditRepository::default()))
            .with_config(EvaluationConfig {
                max_bulk_paths: 2,
                ..EvaluationConfig::default()
            });
    let resolver = SubtreeDeleteResolver::new(authorization_service, Arc::new(docs_tree()));

    let allowed = resolver
        .authorize_subtree_delete(account, "assets", "docs/", &files)
        .await;
    assert!(allowed.is_ok());
    assert_eq!(store.calls(), 4);

    let mut with_denied = files.clone();
    with_denied.push("docs/other.txt".to_owned());
    let denied = resolver
        .authorize_subtree_delete(account, "assets", "docs/", &with_denied)
        .await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));
}

#[tokio::test]
async fn cancellation_after_enumeration_refuses_member_evaluation() {
    let account = AccountId::new();
    let token = CancellationToken::new();
    let store = Arc::new(FakePermissionStore::with_grants([(
        account,
        vec![storage_permission("assets", "docs/final/e.txt", Action::Delete)],
    )]));
    let authorization_service =
        AuthorizationService::new(store.clone(), Arc::new(FakeAuditRepository::default()));
    let resolver = SubtreeDeleteResolver::new(
        authorization_service,
        Arc::new(docs_tree().cancelling(token.clone())),
    );

    let result = resolver
        .authorize_folder_delete(account, "assets", "docs/final", &token)
        .await;

    assert!(matches!(result, Err(AppError::QueryFailure(_))));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn failed_folder_listing_is_skipped() {
    let (resolver, _, _) = resolver(
        FakePermissionStore::default(),
        docs_tree().failing_on("docs/drafts/"),
    );
    let resolver = resolver.with_limits(SubtreeLimits {
        folder_concurrency: 1,
        ..SubtreeLimits::default()
    });
    let folder = StoragePath::parse("docs/").unwrap_or_else(|error| panic!("{error}"));

    let found = resolver
        .enumerate_subtree("assets", &folder, &CancellationToken::new())
        .await
        .unwrap_or_else(|error| panic!("enumeration failed: {error}"));

    let names: Vec<String> = found.files.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        members(&["docs/a.txt", "docs/b.txt", "docs/final/e.txt"])
    );
}

#[tokio::test]
async fn cancelled_enumeration_fails_and_folder_delete_is_refused() {
    let account = AccountId::new();
    let (resolver, _, _) = resolver(FakePermissionStore::default(), docs_tree());
    let token = CancellationToken::new();
    token.cancel();

    let result = resolver
        .authorize_folder_delete(account, "assets", "docs/", &token)
        .await;

    assert!(matches!(result, Err(AppError::QueryFailure(_))));
}

#[test]
fn subtree_limits_reject_zero_bounds() {
    assert!(SubtreeLimits::default().validate().is_ok());
    assert!(
        SubtreeLimits {
            folder_concurrency: 0,
            ..SubtreeLimits::default()
        }
        .validate()
        .is_err()
    );
}
