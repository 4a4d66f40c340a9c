use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use async_trait::async_trait;
use tessera_application::{ObjectLister, ObjectListingPage};
use tessera_core::{AppError, AppResult};
use tessera_domain::StoragePath;
use tokio::sync::RwLock;

/// In-memory object listing over a set of object names per bucket.
///
/// Mirrors the PostgreSQL lister: folders are derived from object names and pages are ordered
/// by child name with the last name as cursor.
#[derive(Debug, Default)]
pub struct InMemoryObjectLister {
    buckets: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl InMemoryObjectLister {
    /// Creates an empty lister.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an object name in a bucket.
    pub async fn insert_object(&self, bucket: &str, name: &str) -> AppResult<()> {
        let path = StoragePath::parse(name)?;
        if path.is_root() {
            return Err(AppError::Validation(
                "object name must not be the bucket root".to_owned(),
            ));
        }

        self.buckets
            .write()
            .await
            .entry(bucket.to_owned())
            .or_default()
            .insert(path.to_string());

        Ok(())
    }
}

#[async_trait]
impl ObjectLister for InMemoryObjectLister {
    async fn list_children(
        &self,
        bucket: &str,
        folder: &StoragePath,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<ObjectListingPage> {
        if limit == 0 {
            return Err(AppError::Validation(
                "listing limit must be greater than zero".to_owned(),
            ));
        }

        let prefix = folder.listing_prefix();
        let buckets = self.buckets.read().await;
        let Some(names) = buckets.get(bucket) else {
            return Ok(ObjectListingPage::default());
        };

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for name in names
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|name| name.starts_with(prefix.as_str()))
        {
            let rest = &name[prefix.len()..];
            if rest.is_empty() {
                continue;
            }

            match rest.split_once('/') {
                Some((segment, _)) => {
                    children.insert(format!("{prefix}{segment}/"), true);
                }
                None => {
                    children.insert(name.clone(), false);
                }
            }
        }

        let mut remaining = children
            .into_iter()
            .filter(|(name, _)| cursor.is_none_or(|cursor| name.as_str() > cursor));

        let mut page = ObjectListingPage::default();
        let mut last_name = None;
        for (name, is_folder) in remaining.by_ref().take(limit) {
            let path = StoragePath::parse(name.as_str())?;
            if is_folder {
                page.folders.push(path);
            } else {
                page.files.push(path);
            }
            last_name = Some(name);
        }

        if remaining.next().is_some() {
            page.next_cursor = last_name;
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use tessera_application::ObjectLister;
    use tessera_domain::StoragePath;

    use super::InMemoryObjectLister;

    fn folder(value: &str) -> StoragePath {
        StoragePath::parse(value).unwrap_or_else(|error| panic!("invalid test path: {error}"))
    }

    async fn seeded() -> InMemoryObjectLister {
        let lister = InMemoryObjectLister::new();
        for name in [
            "docs/readme.md",
            "docs/a/one.txt",
            "docs/a/deep/two.txt",
            "docs/b/three.txt",
            "docs/c.txt",
            "other/four.txt",
        ] {
            lister
                .insert_object("files", name)
                .await
                .unwrap_or_else(|error| panic!("failed to seed object: {error}"));
        }
        lister
    }

    #[tokio::test]
    async fn lists_direct_children_only() {
        let lister = seeded().await;

        let page = lister
            .list_children("files", &folder("docs/"), None, 100)
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));

        let files: Vec<String> = page.files.iter().map(ToString::to_string).collect();
        let folders: Vec<String> = page.folders.iter().map(ToString::to_string).collect();
        assert_eq!(files, vec!["docs/c.txt", "docs/readme.md"]);
        assert_eq!(folders, vec!["docs/a/", "docs/b/"]);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn pages_resume_after_cursor() {
        let lister = seeded().await;

        let first = lister
            .list_children("files", &folder("docs/"), None, 3)
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));
        assert_eq!(first.files.len() + first.folders.len(), 3);
        let Some(cursor) = first.next_cursor else {
            panic!("expected a second page");
        };

        let second = lister
            .list_children("files", &folder("docs/"), Some(cursor.as_str()), 3)
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));
        let names: Vec<String> = second.files.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["docs/readme.md"]);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn root_listing_and_unknown_bucket() {
        let lister = seeded().await;

        let root = lister
            .list_children("files", &folder(""), None, 10)
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));
        assert!(root.files.is_empty());
        assert_eq!(root.folders.len(), 2);

        let missing = lister
            .list_children("missing", &folder(""), None, 10)
            .await
            .unwrap_or_else(|error| panic!("listing failed: {error}"));
        assert_eq!(missing, Default::default());
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let lister = seeded().await;
        assert!(
            lister
                .list_children("files", &folder("docs/"), None, 0)
                .await
                .is_err()
        );
    }
}
