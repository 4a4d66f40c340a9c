use tessera_core::RoleId;
use tessera_domain::{AuditAction, RankAssessment, rank_guard};
use tracing::warn;

use crate::security_admin_ports::RoleAssignment;

use super::*;

impl SecurityAdminService {
    /// Assigns a role to an account.
    ///
    /// The actor must hold at least the role's rank and at least the account's current rank.
    /// A [`RankAssessment::SameRank`] result lets callers warn that the grantee now stands
    /// level with the grantor.
    pub async fn assign_role(
        &self,
        actor: AccountId,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<RankAssessment> {
        self.require(actor, SystemResource::Account, Action::Update)
            .await?;

        let role = self.find_role(role_id).await?;
        let actor_rank = self.actor_rank(actor).await?;
        self.guard_target_account(actor_rank, account_id).await?;
        let assessment = rank_guard::assess(actor_rank, role.rank())?;

        self.repository
            .assign_role_to_account(account_id, role_id)
            .await?;

        if assessment.is_same_rank() {
            warn!(
                actor = %actor,
                account_id = %account_id,
                rank = %role.rank(),
                "role assigned at the assigner's own rank"
            );
        }

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleAssigned,
            resource_type: "account_role".to_owned(),
            resource_id: format!("{account_id}:{role_id}"),
            detail: Some(format!(
                "assigned role '{}' (rank {})",
                role.name().as_str(),
                role.rank()
            )),
        })
        .await?;

        Ok(assessment)
    }

    /// Removes a role from an account.
    pub async fn unassign_role(
        &self,
        actor: AccountId,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require(actor, SystemResource::Account, Action::Update)
            .await?;

        let role = self.find_role(role_id).await?;
        let actor_rank = self.actor_rank(actor).await?;
        self.guard_target_account(actor_rank, account_id).await?;
        rank_guard::assess(actor_rank, role.rank())?;

        self.repository
            .remove_role_from_account(account_id, role_id)
            .await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleUnassigned,
            resource_type: "account_role".to_owned(),
            resource_id: format!("{account_id}:{role_id}"),
            detail: Some(format!("removed role '{}'", role.name().as_str())),
        })
        .await
    }

    /// Returns current role assignments.
    pub async fn list_role_assignments(&self, actor: AccountId) -> AppResult<Vec<RoleAssignment>> {
        self.require(actor, SystemResource::Account, Action::Select)
            .await?;
        self.repository.list_role_assignments().await
    }

    async fn guard_target_account(&self, actor_rank: RoleRank, account_id: AccountId) -> AppResult<()> {
        if let Some(current) = self.repository.max_rank_for_account(account_id).await? {
            rank_guard::assess(actor_rank, current)?;
        }

        Ok(())
    }
}
