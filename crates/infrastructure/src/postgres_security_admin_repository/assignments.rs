use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn assign_role_to_account_impl(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_account_roles (account_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id) DO UPDATE
            SET role_id = EXCLUDED.role_id, created_at = now()
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_missing_reference(error, "failed to assign role"))?;

        Ok(())
    }

    pub(super) async fn remove_role_from_account_impl(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_account_roles
            WHERE account_id = $1 AND role_id = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| query_failure("failed to remove role assignment", error))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role assignment '{account_id}:{role_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn list_role_assignments_impl(&self) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                account_roles.account_id,
                account_roles.role_id,
                roles.name AS role_name,
                roles.rank AS role_rank,
                to_char(account_roles.created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS assigned_at
            FROM rbac_account_roles AS account_roles
            INNER JOIN rbac_roles AS roles
                ON roles.id = account_roles.role_id
            ORDER BY roles.rank DESC, account_roles.account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| query_failure("failed to list role assignments", error))?;

        rows.into_iter()
            .map(|row| {
                Ok(RoleAssignment {
                    account_id: AccountId::from_uuid(row.account_id),
                    role_id: RoleId::from_uuid(row.role_id),
                    role_name: row.role_name,
                    role_rank: RoleRank::new(i64::from(row.role_rank))?,
                    assigned_at: row.assigned_at,
                })
            })
            .collect()
    }

    pub(super) async fn max_rank_for_account_impl(
        &self,
        account_id: AccountId,
    ) -> AppResult<Option<RoleRank>> {
        let rank = sqlx::query_scalar::<_, Option<i32>>(
            r#"
            SELECT MAX(roles.rank)
            FROM rbac_account_roles AS account_roles
            INNER JOIN rbac_roles AS roles
                ON roles.id = account_roles.role_id
            WHERE account_roles.account_id = $1
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| query_failure("failed to resolve account rank", error))?;

        rank.map(|value| RoleRank::new(i64::from(value))).transpose()
    }
}
