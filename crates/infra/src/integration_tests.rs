//! Integration tests for the full financial-integrity pipeline.
//!
//! Tests: draft → CalculationEngine totals → SequentialLedger finalize →
//! chain verification, and reconciliation suggest → confirm.
//!
//! Verifies:
//! - gapless, duplicate-free numbering under concurrent finalization
//! - the chain produced by finalize survives a full audit
//! - tenant isolation across ledger and reconciliation
//! - atomicity of confirm_match

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use finseal_calc::LineItem;
    use finseal_core::{AccountId, ClientId, DocumentId, Money, TenantId};
    use finseal_ledger::{DocumentStatus, FinancialDocument, GENESIS_HASH};
    use finseal_recon::{BankMovement, ExpenseRecord};

    use crate::document_store::{DocumentStore, InMemoryDocumentStore};
    use crate::recon_store::{InMemoryReconStore, ReconStore};
    use crate::reconciliation::Reconciliation;
    use crate::sequential_ledger::SequentialLedger;

    fn test_items() -> Vec<LineItem> {
        vec![
            LineItem {
                description: "consulting".to_string(),
                quantity: dec!(1),
                unit_price: dec!(100.00),
                vat_rate: dec!(20),
            },
            LineItem {
                description: "licenses".to_string(),
                quantity: dec!(2),
                unit_price: dec!(49.995),
                vat_rate: dec!(10),
            },
        ]
    }

    fn insert_draft(store: &impl DocumentStore, tenant_id: TenantId) -> DocumentId {
        let doc = FinancialDocument::draft(
            DocumentId::new(),
            tenant_id,
            ClientId::new(),
            test_items(),
        )
        .unwrap();
        let id = doc.id_typed();
        store.insert(doc).unwrap();
        id
    }

    #[test]
    fn draft_to_finalized_to_verified() {
        let ledger = SequentialLedger::new(InMemoryDocumentStore::new());
        let tenant_id = TenantId::new();
        let id = insert_draft(ledger.store(), tenant_id);

        // Calculation engine output, visible on the stored draft.
        let draft = ledger.store().get(id).unwrap();
        assert_eq!(draft.totals().net_total, Money::from_cents(19999));
        assert_eq!(draft.totals().gross_total, Money::from_cents(22999));
        assert_eq!(draft.totals().vat_total, Money::from_cents(3000));

        let sealed = ledger.finalize(tenant_id, id).unwrap();
        assert_eq!(sealed.status(), DocumentStatus::Finalized);
        assert_eq!(sealed.sequence_number(), Some(1));
        assert_eq!(sealed.previous_hash(), Some(GENESIS_HASH));
        assert!(sealed.finalized_at().is_some());

        // Frozen totals unchanged by finalization.
        assert_eq!(sealed.totals(), draft.totals());

        let report = ledger.verify_chain(tenant_id).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.verified_links, 1);
    }

    #[test]
    fn concurrent_finalizations_stay_gapless() {
        let ledger = Arc::new(SequentialLedger::new(InMemoryDocumentStore::new()));
        let tenant_id = TenantId::new();

        const WORKERS: usize = 8;
        const DOCS_PER_WORKER: usize = 4;

        let mut draft_ids = Vec::new();
        for _ in 0..WORKERS * DOCS_PER_WORKER {
            draft_ids.push(insert_draft(ledger.store(), tenant_id));
        }

        let mut handles = Vec::new();
        for chunk in draft_ids.chunks(DOCS_PER_WORKER) {
            let ledger = Arc::clone(&ledger);
            let ids: Vec<DocumentId> = chunk.to_vec();
            handles.push(thread::spawn(move || {
                ids.into_iter()
                    .map(|id| {
                        ledger
                            .finalize(tenant_id, id)
                            .unwrap()
                            .sequence_number()
                            .unwrap()
                    })
                    .collect::<Vec<u64>>()
            }));
        }

        let mut sequences = BTreeSet::new();
        for handle in handles {
            for seq in handle.join().unwrap() {
                // No duplicates across workers.
                assert!(sequences.insert(seq), "duplicate sequence {seq}");
            }
        }

        // Exactly 1..=N, no gaps.
        let expected: BTreeSet<u64> = (1..=(WORKERS * DOCS_PER_WORKER) as u64).collect();
        assert_eq!(sequences, expected);

        let report = ledger.verify_chain(tenant_id).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.verified_links, (WORKERS * DOCS_PER_WORKER) as u64);
    }

    #[test]
    fn parallel_tenants_do_not_interfere() {
        let ledger = Arc::new(SequentialLedger::new(InMemoryDocumentStore::new()));
        let tenants: Vec<TenantId> = (0..4).map(|_| TenantId::new()).collect();

        let mut handles = Vec::new();
        for tenant_id in tenants.clone() {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for _ in 0..3 {
                    let id = insert_draft(ledger.store(), tenant_id);
                    ledger.finalize(tenant_id, id).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for tenant_id in tenants {
            let report = ledger.verify_chain(tenant_id).unwrap();
            assert!(report.is_intact());
            assert_eq!(report.verified_links, 3);

            let chain = ledger.store().finalized_in_order(tenant_id).unwrap();
            let sequences: Vec<u64> =
                chain.iter().filter_map(|d| d.sequence_number()).collect();
            assert_eq!(sequences, vec![1, 2, 3]);
        }
    }

    #[test]
    fn out_of_band_edit_is_caught_by_the_audit() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let ledger = SequentialLedger::new(Arc::clone(&store));
        let tenant_id = TenantId::new();

        let first = insert_draft(&store, tenant_id);
        let second = insert_draft(&store, tenant_id);
        ledger.finalize(tenant_id, first).unwrap();
        ledger.finalize(tenant_id, second).unwrap();

        // The store's immutability defense blocks the edit path...
        let victim = store.get(first).unwrap();
        let mut forged = FinancialDocument::draft(
            victim.id_typed(),
            tenant_id,
            victim.client_id(),
            vec![],
        )
        .unwrap();
        forged
            .seal(finseal_ledger::SequenceAssignment {
                sequence_number: 1,
                document_number: victim.document_number().unwrap().to_string(),
                previous_hash: victim.previous_hash().unwrap().to_string(),
                security_hash: victim.security_hash().unwrap().to_string(),
                finalized_at: victim.finalized_at().unwrap(),
            })
            .unwrap();
        assert!(store.update(forged.clone()).is_err());

        // ...and even a store that let it through cannot fool the audit.
        let report = finseal_ledger::verify(
            tenant_id,
            &[forged, store.get(second).unwrap()],
        )
        .unwrap();
        assert!(!report.is_intact());
        assert_eq!(report.verified_links, 0);
    }

    #[test]
    fn reconciliation_end_to_end() {
        let recon = Reconciliation::new(InMemoryReconStore::new());
        let tenant_id = TenantId::new();
        let other_tenant = TenantId::new();
        let when = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let movement = BankMovement::pending(
            tenant_id,
            AccountId::new(),
            when,
            "AMAZON EU",
            Money::round(dec!(-120.00)),
            Some("CARD-4421".to_string()),
        );
        let expense = ExpenseRecord::pending(
            tenant_id,
            Money::round(dec!(120.00)),
            Money::round(dec!(20.00)),
            when,
            "Amazon",
        );
        let foreign_expense = ExpenseRecord::pending(
            other_tenant,
            Money::round(dec!(120.00)),
            Money::ZERO,
            when,
            "Amazon",
        );
        let (movement_id, expense_id) = (movement.id, expense.id);
        recon.store().insert_movement(movement).unwrap();
        recon.store().insert_expense(expense).unwrap();
        recon.store().insert_expense(foreign_expense).unwrap();

        // Tenant isolation: the foreign expense never shows up.
        let candidates = recon.suggest_matches(tenant_id).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].expense_id, expense_id);

        recon.confirm_match(movement_id, expense_id).unwrap();

        // Both records transitioned together.
        let movement = recon.store().get_movement(movement_id).unwrap();
        assert_eq!(movement.linked_expense_id, Some(expense_id));
        assert!(!movement.is_pending());
        assert!(!recon.store().get_expense(expense_id).unwrap().is_pending());

        // And a second confirmation is a conflict, not a double-approve.
        assert!(recon.confirm_match(movement_id, expense_id).is_err());
    }
}
