use async_trait::async_trait;
use tessera_core::AppResult;
use tessera_domain::StoragePath;

/// One page of direct children below a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListingPage {
    /// Objects directly inside the folder.
    pub files: Vec<StoragePath>,
    /// Sub-folders directly inside the folder.
    pub folders: Vec<StoragePath>,
    /// Cursor for the next page, absent on the last page.
    pub next_cursor: Option<String>,
}

/// Port onto the object storage backend used for subtree enumeration.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Lists up to `limit` direct children of `folder`, resuming after `cursor`.
    async fn list_children(
        &self,
        bucket: &str,
        folder: &StoragePath,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<ObjectListingPage>;
}
