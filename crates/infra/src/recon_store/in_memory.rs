use std::collections::HashMap;
use std::sync::Mutex;

use finseal_core::{ExpenseId, MovementId, TenantId};
use finseal_recon::{BankMovement, ExpenseRecord, ExpenseStatus, MovementStatus};

use super::r#trait::{ReconStore, ReconStoreError};

#[derive(Debug, Default)]
struct Records {
    movements: HashMap<MovementId, BankMovement>,
    expenses: HashMap<ExpenseId, ExpenseRecord>,
}

/// In-memory reconciliation store.
///
/// Both record maps live behind one mutex, so `confirm_match` mutates the
/// movement and the expense inside a single critical section; partial
/// application is impossible here. A SQL implementation would use a
/// transaction for the same guarantee.
#[derive(Debug, Default)]
pub struct InMemoryReconStore {
    records: Mutex<Records>,
}

impl InMemoryReconStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Records>, ReconStoreError> {
        self.records
            .lock()
            .map_err(|_| ReconStoreError::Storage("lock poisoned".to_string()))
    }
}

impl ReconStore for InMemoryReconStore {
    fn insert_movement(&self, movement: BankMovement) -> Result<(), ReconStoreError> {
        let mut records = self.lock()?;
        if records.movements.contains_key(&movement.id) {
            return Err(ReconStoreError::Conflict(format!(
                "movement {} already exists",
                movement.id
            )));
        }
        records.movements.insert(movement.id, movement);
        Ok(())
    }

    fn insert_expense(&self, expense: ExpenseRecord) -> Result<(), ReconStoreError> {
        let mut records = self.lock()?;
        if records.expenses.contains_key(&expense.id) {
            return Err(ReconStoreError::Conflict(format!(
                "expense {} already exists",
                expense.id
            )));
        }
        records.expenses.insert(expense.id, expense);
        Ok(())
    }

    fn get_movement(&self, movement_id: MovementId) -> Result<BankMovement, ReconStoreError> {
        let records = self.lock()?;
        records
            .movements
            .get(&movement_id)
            .cloned()
            .ok_or(ReconStoreError::MovementNotFound)
    }

    fn get_expense(&self, expense_id: ExpenseId) -> Result<ExpenseRecord, ReconStoreError> {
        let records = self.lock()?;
        records
            .expenses
            .get(&expense_id)
            .cloned()
            .ok_or(ReconStoreError::ExpenseNotFound)
    }

    fn pending_movements(&self, tenant_id: TenantId) -> Result<Vec<BankMovement>, ReconStoreError> {
        let records = self.lock()?;
        Ok(records
            .movements
            .values()
            .filter(|m| m.tenant_id == tenant_id && m.is_pending())
            .cloned()
            .collect())
    }

    fn pending_expenses(&self, tenant_id: TenantId) -> Result<Vec<ExpenseRecord>, ReconStoreError> {
        let records = self.lock()?;
        Ok(records
            .expenses
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.is_pending())
            .cloned()
            .collect())
    }

    fn confirm_match(
        &self,
        movement_id: MovementId,
        expense_id: ExpenseId,
    ) -> Result<(), ReconStoreError> {
        let mut records = self.lock()?;

        // Validate both sides before touching either.
        let movement = records
            .movements
            .get(&movement_id)
            .ok_or(ReconStoreError::MovementNotFound)?;
        let expense = records
            .expenses
            .get(&expense_id)
            .ok_or(ReconStoreError::ExpenseNotFound)?;

        if movement.tenant_id != expense.tenant_id {
            return Err(ReconStoreError::Conflict(
                "movement and expense belong to different tenants".to_string(),
            ));
        }
        if !movement.is_pending() {
            return Err(ReconStoreError::Conflict(format!(
                "movement {movement_id} is no longer pending"
            )));
        }
        if !expense.is_pending() {
            return Err(ReconStoreError::Conflict(format!(
                "expense {expense_id} is no longer pending"
            )));
        }

        let movement = records
            .movements
            .get_mut(&movement_id)
            .ok_or(ReconStoreError::MovementNotFound)?;
        movement.status = MovementStatus::Reconciled;
        movement.linked_expense_id = Some(expense_id);

        let expense = records
            .expenses
            .get_mut(&expense_id)
            .ok_or(ReconStoreError::ExpenseNotFound)?;
        expense.status = ExpenseStatus::Approved;

        Ok(())
    }
}
