use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use tessera_application::{PermissionLookup, PermissionStore};
use tessera_core::{AccountId, AppError, AppResult};
use tessera_domain::{EffectivePermissionSet, NAME_WILDCARD};

use crate::permission_rows::PermissionRow;


/// PostgreSQL-backed loader of effective permission sets.
///
/// Each load runs one statement inside a `REPEATABLE READ, READ ONLY` transaction, so concurrent
/// catalog edits never show up half-applied in a single evaluation.
#[derive(Clone)]
pub struct PostgresPermissionStore {
    pool: PgPool,
}

impl PostgresPermissionStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn lookup_parameters(lookup: &PermissionLookup) -> (&'static str, Option<&str>) {
    match lookup {
        PermissionLookup::System => ("system", None),
        PermissionLookup::Table { schema } => ("table", Some(schema.as_str())),
        PermissionLookup::Storage { bucket } => ("storage", Some(bucket.as_str())),
    }
}

#[async_trait]
impl PermissionStore for PostgresPermissionStore {
    async fn load_effective_permissions(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<EffectivePermissionSet> {
        let (kind, namespace) = lookup_parameters(lookup);

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::QueryFailure(format!("failed to begin permission snapshot: {error}"))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::QueryFailure(format!("failed to open permission snapshot: {error}"))
            })?;

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            WITH account_role AS (
                SELECT role_id
                FROM rbac_account_roles
                WHERE account_id = $1
            ),
            reachable AS (
                SELECT role_permissions.permission_id
                FROM rbac_role_permissions AS role_permissions
                INNER JOIN account_role
                    ON account_role.role_id = role_permissions.role_id
                UNION
                SELECT members.permission_id
                FROM rbac_role_permission_groups AS role_groups
                INNER JOIN account_role
                    ON account_role.role_id = role_groups.role_id
                INNER JOIN rbac_permission_group_members AS members
                    ON members.group_id = role_groups.group_id
            )
            SELECT
                permissions.id,
                permissions.name,
                permissions.description,
                permissions.permission_type,
                permissions.action,
                permissions.system_resource,
                permissions.scope,
                permissions.schema_name,
                permissions.table_name,
                permissions.column_name,
                permissions.metadata
            FROM rbac_permissions AS permissions
            INNER JOIN reachable
                ON reachable.permission_id = permissions.id
            WHERE ($2 = 'system' AND permissions.permission_type = 'system')
                OR ($2 = 'table'
                    AND permissions.scope = 'table'
                    AND permissions.schema_name IN ($3, $4))
                OR ($2 = 'storage'
                    AND permissions.scope = 'storage'
                    AND permissions.metadata ->> 'bucket_name' IN ($3, $4))
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(kind)
        .bind(namespace)
        .bind(NAME_WILDCARD)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::QueryFailure(format!(
                "failed to load permissions for account '{account_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::QueryFailure(format!("failed to close permission snapshot: {error}"))
        })?;

        let permissions = rows
            .into_iter()
            .map(PermissionRow::into_permission)
            .collect::<AppResult<Vec<_>>>()?;

        debug!(
            account_id = %account_id,
            lookup = kind,
            permission_count = permissions.len(),
            "loaded effective permissions"
        );

        Ok(EffectivePermissionSet::from_permissions(permissions))
    }
}
