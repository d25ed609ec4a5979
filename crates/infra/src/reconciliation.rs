//! Reconciliation service: advisory suggestions, human-gated confirmation.

use finseal_core::{DomainError, DomainResult, ExpenseId, MovementId, TenantId};
use finseal_recon::{MatchCandidate, MatcherConfig, rank_candidates};

use crate::recon_store::{ReconStore, ReconStoreError};

impl From<ReconStoreError> for DomainError {
    fn from(value: ReconStoreError) -> Self {
        match value {
            ReconStoreError::MovementNotFound | ReconStoreError::ExpenseNotFound => {
                DomainError::NotFound
            }
            ReconStoreError::Conflict(msg) => DomainError::conflict(msg),
            ReconStoreError::Storage(msg) => DomainError::conflict(msg),
        }
    }
}

/// Scores pending movement/expense pairs and commits confirmed matches.
///
/// Nothing is ever matched automatically: `suggest_matches` only ranks, and
/// `confirm_match` is invoked by an explicit caller after human review.
#[derive(Debug)]
pub struct Reconciliation<S> {
    store: S,
    config: MatcherConfig,
}

impl<S> Reconciliation<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, MatcherConfig::default())
    }

    pub fn with_config(store: S, config: MatcherConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ReconStore> Reconciliation<S> {
    /// Rank candidate pairings for a tenant's pending records.
    ///
    /// Snapshot read; an empty list is a valid, non-error outcome.
    pub fn suggest_matches(&self, tenant_id: TenantId) -> DomainResult<Vec<MatchCandidate>> {
        let movements = self.store.pending_movements(tenant_id)?;
        let expenses = self.store.pending_expenses(tenant_id)?;

        let candidates = rank_candidates(&movements, &expenses, &self.config);
        tracing::debug!(
            tenant_id = %tenant_id,
            movements = movements.len(),
            expenses = expenses.len(),
            candidates = candidates.len(),
            "ranked reconciliation candidates"
        );
        Ok(candidates)
    }

    /// Commit a confirmed pairing: movement → RECONCILED and expense →
    /// APPROVED, atomically, both or neither.
    pub fn confirm_match(
        &self,
        movement_id: MovementId,
        expense_id: ExpenseId,
    ) -> DomainResult<()> {
        self.store.confirm_match(movement_id, expense_id)?;
        tracing::info!(
            movement_id = %movement_id,
            expense_id = %expense_id,
            "reconciliation match confirmed"
        );
        Ok(())
    }
}
