use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use finseal_core::{AccountId, Entity, ExpenseId, Money, MovementId, TenantId};

/// Bank movement lifecycle. `Pending` movements are candidates for
/// reconciliation; a confirmed match moves them to `Reconciled`, never
/// independently of the paired expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Pending,
    Reconciled,
}

/// Expense lifecycle. `Approved` is only reachable through a confirmed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pending,
    Approved,
}

/// One imported bank statement line.
///
/// `amount` is signed: debits come in negative, which is why matching
/// compares the movement's absolute amount against the expense amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankMovement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub label: String,
    pub amount: Money,
    pub reference: Option<String>,
    pub status: MovementStatus,
    pub linked_expense_id: Option<ExpenseId>,
}

impl BankMovement {
    pub fn pending(
        tenant_id: TenantId,
        account_id: AccountId,
        date: NaiveDate,
        label: impl Into<String>,
        amount: Money,
        reference: Option<String>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            tenant_id,
            account_id,
            date,
            label: label.into(),
            amount,
            reference,
            status: MovementStatus::Pending,
            linked_expense_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MovementStatus::Pending
    }
}

impl Entity for BankMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// An expense awaiting settlement against a bank movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub vat_amount: Money,
    pub date: NaiveDate,
    pub supplier: String,
    pub status: ExpenseStatus,
}

impl ExpenseRecord {
    pub fn pending(
        tenant_id: TenantId,
        amount: Money,
        vat_amount: Money,
        date: NaiveDate,
        supplier: impl Into<String>,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            tenant_id,
            amount,
            vat_amount,
            date,
            supplier: supplier.into(),
            status: ExpenseStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ExpenseStatus::Pending
    }
}

impl Entity for ExpenseRecord {
    type Id = ExpenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
