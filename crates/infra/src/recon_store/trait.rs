use std::sync::Arc;

use thiserror::Error;

use finseal_core::{ExpenseId, MovementId, TenantId};
use finseal_recon::{BankMovement, ExpenseRecord};

/// Reconciliation store operation error.
#[derive(Debug, Error)]
pub enum ReconStoreError {
    #[error("movement not found")]
    MovementNotFound,

    #[error("expense not found")]
    ExpenseNotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Storage for bank movements and expense records.
///
/// `confirm_match` is the one write with an integrity requirement: the
/// movement's PENDING→RECONCILED and the expense's PENDING→APPROVED
/// transitions happen together, atomically, or not at all.
pub trait ReconStore: Send + Sync {
    fn insert_movement(&self, movement: BankMovement) -> Result<(), ReconStoreError>;

    fn insert_expense(&self, expense: ExpenseRecord) -> Result<(), ReconStoreError>;

    fn get_movement(&self, movement_id: MovementId) -> Result<BankMovement, ReconStoreError>;

    fn get_expense(&self, expense_id: ExpenseId) -> Result<ExpenseRecord, ReconStoreError>;

    /// All PENDING movements for a tenant. Snapshot read; no isolation beyond
    /// normal read consistency is required.
    fn pending_movements(&self, tenant_id: TenantId) -> Result<Vec<BankMovement>, ReconStoreError>;

    /// All PENDING expenses for a tenant.
    fn pending_expenses(&self, tenant_id: TenantId) -> Result<Vec<ExpenseRecord>, ReconStoreError>;

    /// Atomically reconcile a movement with an expense. Fails with `Conflict`
    /// unless both are still PENDING; on failure neither record changes.
    fn confirm_match(
        &self,
        movement_id: MovementId,
        expense_id: ExpenseId,
    ) -> Result<(), ReconStoreError>;
}

impl<S> ReconStore for Arc<S>
where
    S: ReconStore + ?Sized,
{
    fn insert_movement(&self, movement: BankMovement) -> Result<(), ReconStoreError> {
        (**self).insert_movement(movement)
    }

    fn insert_expense(&self, expense: ExpenseRecord) -> Result<(), ReconStoreError> {
        (**self).insert_expense(expense)
    }

    fn get_movement(&self, movement_id: MovementId) -> Result<BankMovement, ReconStoreError> {
        (**self).get_movement(movement_id)
    }

    fn get_expense(&self, expense_id: ExpenseId) -> Result<ExpenseRecord, ReconStoreError> {
        (**self).get_expense(expense_id)
    }

    fn pending_movements(&self, tenant_id: TenantId) -> Result<Vec<BankMovement>, ReconStoreError> {
        (**self).pending_movements(tenant_id)
    }

    fn pending_expenses(&self, tenant_id: TenantId) -> Result<Vec<ExpenseRecord>, ReconStoreError> {
        (**self).pending_expenses(tenant_id)
    }

    fn confirm_match(
        &self,
        movement_id: MovementId,
        expense_id: ExpenseId,
    ) -> Result<(), ReconStoreError> {
        (**self).confirm_match(movement_id, expense_id)
    }
}
