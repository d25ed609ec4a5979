use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finseal_calc::{DocumentTotals, LineItem, compute_document};
use finseal_core::{ClientId, DocumentId, DomainError, DomainResult, Entity, TenantId};

/// Document status lifecycle.
///
/// `Draft` is initial. `Finalized` is reached exactly once, through the
/// sequential ledger. `Paid`, `Cancelled`, and `Overdue` are post-finalization
/// status labels that never touch numbering or hash fields. No transition
/// ever returns to `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Finalized,
    Paid,
    Cancelled,
    Overdue,
}

impl DocumentStatus {
    pub fn is_draft(self) -> bool {
        self == DocumentStatus::Draft
    }

    /// True for every status a document can hold after finalization.
    pub fn is_finalized(self) -> bool {
        !self.is_draft()
    }

    fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        match (self, next) {
            (Draft, Finalized) => true,
            (Finalized, Paid | Cancelled | Overdue) => true,
            // An overdue invoice can still be settled or written off.
            (Overdue, Paid | Cancelled) => true,
            _ => false,
        }
    }
}

/// Fields assigned atomically when a document is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceAssignment {
    pub sequence_number: u64,
    pub document_number: String,
    pub previous_hash: String,
    pub security_hash: String,
    pub finalized_at: DateTime<Utc>,
}

/// Human-readable legal document number: current year + zero-padded sequence.
pub fn format_document_number(year: i32, sequence_number: u64) -> String {
    format!("{year}-F{sequence_number:04}")
}

/// A financial document (invoice / credit note / quote, unified shape).
///
/// While draft, items and totals may be recomputed freely. Once finalized,
/// sequence number, document number, items, totals, and hashes are immutable
/// for the lifetime of the record; only the status whitelist
/// (`mark_paid` / `mark_cancelled` / `mark_overdue`, reminder counter) may
/// still change. Finalized documents are never physically deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialDocument {
    id: DocumentId,
    tenant_id: TenantId,
    client_id: ClientId,
    status: DocumentStatus,
    items: Vec<LineItem>,
    totals: DocumentTotals,
    sequence_number: Option<u64>,
    document_number: Option<String>,
    previous_hash: Option<String>,
    security_hash: Option<String>,
    finalized_at: Option<DateTime<Utc>>,
    reminder_count: u32,
}

impl FinancialDocument {
    /// Create a new draft. Totals are computed through the calculation engine.
    pub fn draft(
        id: DocumentId,
        tenant_id: TenantId,
        client_id: ClientId,
        items: Vec<LineItem>,
    ) -> DomainResult<Self> {
        let totals = compute_document(&items)?;
        Ok(Self {
            id,
            tenant_id,
            client_id,
            status: DocumentStatus::Draft,
            items,
            totals,
            sequence_number: None,
            document_number: None,
            previous_hash: None,
            security_hash: None,
            finalized_at: None,
            reminder_count: 0,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn sequence_number(&self) -> Option<u64> {
        self.sequence_number
    }

    pub fn document_number(&self) -> Option<&str> {
        self.document_number.as_deref()
    }

    pub fn previous_hash(&self) -> Option<&str> {
        self.previous_hash.as_deref()
    }

    pub fn security_hash(&self) -> Option<&str> {
        self.security_hash.as_deref()
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn reminder_count(&self) -> u32 {
        self.reminder_count
    }

    /// Replace the items of a draft, recomputing totals.
    pub fn set_items(&mut self, items: Vec<LineItem>) -> DomainResult<()> {
        if !self.status.is_draft() {
            return Err(DomainError::conflict(format!(
                "document {} is {:?}; items are immutable after finalization",
                self.id, self.status
            )));
        }
        self.totals = compute_document(&items)?;
        self.items = items;
        Ok(())
    }

    /// Apply a finalization assignment. One-way; fails with `Conflict` unless
    /// the document is still draft.
    pub fn seal(&mut self, assignment: SequenceAssignment) -> DomainResult<()> {
        if !self.status.is_draft() {
            return Err(DomainError::conflict(format!(
                "document {} is {:?}; finalization is not idempotent",
                self.id, self.status
            )));
        }
        if assignment.sequence_number == 0 {
            return Err(DomainError::invariant("sequence numbers start at 1"));
        }

        self.sequence_number = Some(assignment.sequence_number);
        self.document_number = Some(assignment.document_number);
        self.previous_hash = Some(assignment.previous_hash);
        self.security_hash = Some(assignment.security_hash);
        self.finalized_at = Some(assignment.finalized_at);
        self.status = DocumentStatus::Finalized;
        Ok(())
    }

    pub fn mark_paid(&mut self) -> DomainResult<()> {
        self.transition(DocumentStatus::Paid)
    }

    pub fn mark_cancelled(&mut self) -> DomainResult<()> {
        self.transition(DocumentStatus::Cancelled)
    }

    pub fn mark_overdue(&mut self) -> DomainResult<()> {
        self.transition(DocumentStatus::Overdue)
    }

    /// Bump the reminder counter (part of the post-finalization whitelist).
    pub fn record_reminder(&mut self) -> DomainResult<()> {
        if !self.status.is_finalized() {
            return Err(DomainError::conflict(
                "reminders only apply to finalized documents",
            ));
        }
        self.reminder_count += 1;
        Ok(())
    }

    fn transition(&mut self, next: DocumentStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "document {} cannot transition {:?} -> {next:?}",
                self.id, self.status
            )));
        }
        self.status = next;
        Ok(())
    }

    /// True when every frozen field matches `other`.
    ///
    /// Stores use this to reject writes that would alter a finalized record's
    /// numbering, items, totals, or hashes out-of-band.
    pub fn same_sealed_content(&self, other: &Self) -> bool {
        self.id == other.id
            && self.tenant_id == other.tenant_id
            && self.client_id == other.client_id
            && self.items == other.items
            && self.totals == other.totals
            && self.sequence_number == other.sequence_number
            && self.document_number == other.document_number
            && self.previous_hash == other.previous_hash
            && self.security_hash == other.security_hash
            && self.finalized_at == other.finalized_at
    }
}

impl Entity for FinancialDocument {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_items() -> Vec<LineItem> {
        vec![LineItem {
            description: "consulting".to_string(),
            quantity: dec!(2),
            unit_price: dec!(100.00),
            vat_rate: dec!(20),
        }]
    }

    fn test_draft() -> FinancialDocument {
        FinancialDocument::draft(
            DocumentId::new(),
            TenantId::new(),
            ClientId::new(),
            test_items(),
        )
        .unwrap()
    }

    fn test_assignment(seq: u64) -> SequenceAssignment {
        SequenceAssignment {
            sequence_number: seq,
            document_number: format_document_number(2026, seq),
            previous_hash: "GENESIS".to_string(),
            security_hash: "deadbeef".to_string(),
            finalized_at: Utc::now(),
        }
    }

    #[test]
    fn draft_has_no_numbering_fields() {
        let doc = test_draft();
        assert!(doc.status().is_draft());
        assert_eq!(doc.sequence_number(), None);
        assert_eq!(doc.document_number(), None);
        assert_eq!(doc.previous_hash(), None);
        assert_eq!(doc.security_hash(), None);
        assert_eq!(doc.finalized_at(), None);
    }

    #[test]
    fn draft_totals_follow_items() {
        let mut doc = test_draft();
        assert_eq!(doc.totals().gross_total.to_string(), "240.00");

        doc.set_items(vec![]).unwrap();
        assert_eq!(doc.totals().gross_total.to_string(), "0.00");
    }

    #[test]
    fn seal_is_one_way() {
        let mut doc = test_draft();
        doc.seal(test_assignment(1)).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Finalized);
        assert_eq!(doc.sequence_number(), Some(1));
        assert_eq!(doc.document_number(), Some("2026-F0001"));

        let err = doc.seal(test_assignment(2)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(doc.sequence_number(), Some(1));
    }

    #[test]
    fn items_are_immutable_after_seal() {
        let mut doc = test_draft();
        doc.seal(test_assignment(1)).unwrap();

        let err = doc.set_items(vec![]).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(doc.items().len(), 1);
    }

    #[test]
    fn status_whitelist_after_finalization() {
        let mut doc = test_draft();
        doc.seal(test_assignment(1)).unwrap();

        doc.mark_overdue().unwrap();
        assert_eq!(doc.status(), DocumentStatus::Overdue);
        doc.record_reminder().unwrap();
        assert_eq!(doc.reminder_count(), 1);
        doc.mark_paid().unwrap();
        assert_eq!(doc.status(), DocumentStatus::Paid);

        // Terminal-equivalent labels never re-open.
        assert!(doc.mark_overdue().is_err());
        // Numbering untouched by status churn.
        assert_eq!(doc.sequence_number(), Some(1));
    }

    #[test]
    fn draft_cannot_take_whitelist_statuses() {
        let mut doc = test_draft();
        assert!(doc.mark_paid().is_err());
        assert!(doc.mark_overdue().is_err());
        assert!(doc.record_reminder().is_err());
    }

    #[test]
    fn sealed_content_comparison_detects_edits() {
        let mut doc = test_draft();
        doc.seal(test_assignment(1)).unwrap();

        let mut tampered = doc.clone();
        tampered.totals.gross_total = finseal_core::Money::from_cents(1);
        assert!(!doc.same_sealed_content(&tampered));

        let mut relabeled = doc.clone();
        relabeled.mark_overdue().unwrap();
        assert!(doc.same_sealed_content(&relabeled));
    }
}
