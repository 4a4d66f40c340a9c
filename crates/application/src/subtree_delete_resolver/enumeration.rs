use futures::future::join_all;
use tessera_domain::StoragePath;
use tracing::warn;

use super::*;

/// Files and folders found below a folder, in breadth-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeMembers {
    /// Objects below the folder.
    pub files: Vec<StoragePath>,
    /// Sub-folders below the folder, excluding the folder itself.
    pub folders: Vec<StoragePath>,
}

struct FolderListing {
    files: Vec<StoragePath>,
    folders: Vec<StoragePath>,
}

impl SubtreeDeleteResolver {
    /// Walks the subtree below `folder` breadth-first within the configured limits.
    ///
    /// Sibling folders are listed in bounded concurrent batches. A folder whose listing fails,
    /// or whose lister hands back the same cursor twice, is logged and skipped. Exceeding a limit aborts the walk with `CapacityExceeded`;
    /// cancelling `token` aborts it with `QueryFailure`.
    pub async fn enumerate_subtree(
        &self,
        bucket: &str,
        folder: &StoragePath,
        token: &CancellationToken,
    ) -> AppResult<SubtreeMembers> {
        self.limits.validate()?;

        let mut members = SubtreeMembers::default();
        let mut frontier = vec![folder.clone()];

        while !frontier.is_empty() {
            let mut next_frontier = Vec::new();

            for batch in frontier.chunks(self.limits.folder_concurrency) {
                let (files_before, folders_before) = (members.files.len(), members.folders.len());
                let listings = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(AppError::QueryFailure(format!(
                            "enumeration of '{folder}' in bucket '{bucket}' was cancelled"
                        )));
                    }
                    listings = join_all(batch.iter().map(|current| {
                        self.list_folder(bucket, current, files_before, folders_before)
                    })) => listings,
                };

                for (current, listing) in batch.iter().zip(listings) {
                    let listing = match listing {
                        Ok(listing) => listing,
                        Err(error @ AppError::CapacityExceeded(_)) => return Err(error),
                        Err(error) => {
                            warn!(
                                namespace = %bucket,
                                folder = %current,
                                error = %error,
                                "skipping folder whose listing failed"
                            );
                            continue;
                        }
                    };

                    members.files.extend(listing.files);
                    if members.files.len() > self.limits.max_files {
                        return Err(too_many_files(self.limits.max_files));
                    }

                    members.folders.extend(listing.folders.iter().cloned());
                    if members.folders.len() > self.limits.max_folders {
                        return Err(too_many_folders(self.limits.max_folders));
                    }

                    next_frontier.extend(listing.folders);
                }
            }

            frontier = next_frontier;
        }

        Ok(members)
    }

    /// Lists every page of one folder, aborting as soon as the running totals pass a limit.
    async fn list_folder(
        &self,
        bucket: &str,
        folder: &StoragePath,
        files_before: usize,
        folders_before: usize,
    ) -> AppResult<FolderListing> {
        let mut listing = FolderListing {
            files: Vec::new(),
            folders: Vec::new(),
        };
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .lister
                .list_children(
                    bucket,
                    folder,
                    cursor.as_deref(),
                    self.limits.listing_batch_size,
                )
                .await?;

            listing.files.extend(page.files);
            listing.folders.extend(page.folders);

            if files_before + listing.files.len() > self.limits.max_files {
                return Err(too_many_files(self.limits.max_files));
            }
            if folders_before + listing.folders.len() > self.limits.max_folders {
                return Err(too_many_folders(self.limits.max_folders));
            }

            match page.next_cursor {
                None => break,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(AppError::QueryFailure(format!(
                        "listing of '{folder}' in bucket '{bucket}' repeated cursor '{next}'"
                    )));
                }
                Some(next) => cursor = Some(next),
            }
        }

        Ok(listing)
    }
}

fn too_many_files(max_files: usize) -> AppError {
    AppError::CapacityExceeded(format!(
        "subtree contains more than {max_files} files; delete smaller batches"
    ))
}

fn too_many_folders(max_folders: usize) -> AppError {
    AppError::CapacityExceeded(format!(
        "subtree contains more than {max_folders} folders; delete smaller batches"
    ))
}
