use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use tessera_application::{ObjectLister, ObjectListingPage};
use tessera_core::{AppError, AppResult};
use tessera_domain::StoragePath;


/// PostgreSQL-backed listing of direct folder children from `storage.objects`.
///
/// Folders are not stored rows: a child folder exists whenever some object name continues past
/// the listing prefix with a further delimiter. Children are returned in byte order of their
/// names and the cursor is the last child name of the previous page.
#[derive(Clone)]
pub struct PostgresObjectLister {
    pool: PgPool,
}

impl PostgresObjectLister {
    /// Creates a lister with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChildRow {
    child_name: String,
    is_folder: bool,
}

#[async_trait]
impl ObjectLister for PostgresObjectLister {
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
        let fetch_limit = i64::try_from(limit.saturating_add(1)).map_err(|error| {
            AppError::Validation(format!("listing limit {limit} is out of range: {error}"))
        })?;

        let mut rows = sqlx::query_as::<_, ChildRow>(
            r#"
            WITH children AS (
                SELECT DISTINCT
                    CASE
                        WHEN strpos(substr(objects.name, char_length($2) + 1), '/') > 0
                            THEN $2 || split_part(substr(objects.name, char_length($2) + 1), '/', 1) || '/'
                        ELSE objects.name
                    END AS child_name,
                    strpos(substr(objects.name, char_length($2) + 1), '/') > 0 AS is_folder
                FROM storage.objects AS objects
                WHERE objects.bucket_id = $1
                    AND starts_with(objects.name, $2)
                    AND objects.name <> $2
            )
            SELECT child_name, is_folder
            FROM children
            WHERE $3::text IS NULL OR child_name COLLATE "C" > $3
            ORDER BY child_name COLLATE "C"
            LIMIT $4
            "#,
        )
        .bind(bucket)
        .bind(prefix.as_str())
        .bind(cursor)
        .bind(fetch_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::QueryFailure(format!(
                "failed to list children of '{prefix}' in bucket '{bucket}': {error}"
            ))
        })?;

        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last().map(|row| row.child_name.clone())
        } else {
            None
        };

        let mut page = ObjectListingPage {
            next_cursor,
            ..ObjectListingPage::default()
        };

        for row in rows {
            let path = StoragePath::parse(row.child_name.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "stored object name '{}' is not a valid storage path: {error}",
                    row.child_name
                ))
            })?;

            if row.is_folder {
                page.folders.push(path);
            } else {
                page.files.push(path);
            }
        }

        debug!(
            namespace = %bucket,
            file_count = page.files.len(),
            folder_count = page.folders.len(),
            has_more = page.next_cursor.is_some(),
            "listed folder children"
        );

        Ok(page)
    }
}
