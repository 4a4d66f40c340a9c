//! Privilege-escalation guard for role assignment and role rank mutation.

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult};

use crate::role::RoleRank;

/// Outcome of a permitted rank comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankAssessment {
    /// Target rank is strictly below the actor's rank.
    BelowActor,
    /// Target rank equals the actor's rank; callers should warn about same-rank elevation.
    SameRank,
}

impl RankAssessment {
    /// Returns whether callers should surface a same-rank elevation warning.
    #[must_use]
    pub fn is_same_rank(&self) -> bool {
        matches!(self, Self::SameRank)
    }
}

/// Returns whether an actor may assign a role of `target_role_rank`.
#[must_use]
pub fn can_assign(assigner_max_rank: RoleRank, target_role_rank: RoleRank) -> bool {
    target_role_rank <= assigner_max_rank
}

/// Returns whether an actor may create a role at, or move a role to, `desired_rank`.
#[must_use]
pub fn can_create_or_modify_role(assigner_max_rank: RoleRank, desired_rank: RoleRank) -> bool {
    desired_rank <= assigner_max_rank
}

/// Compares ranks and fails with `RankExceeded` when the target outranks the actor.
pub fn assess(assigner_max_rank: RoleRank, target_rank: RoleRank) -> AppResult<RankAssessment> {
    if target_rank > assigner_max_rank {
        return Err(AppError::RankExceeded {
            actor_rank: assigner_max_rank.value(),
            requested_rank: target_rank.value(),
        });
    }

    if target_rank == assigner_max_rank {
        Ok(RankAssessment::SameRank)
    } else {
        Ok(RankAssessment::BelowActor)
    }
}
