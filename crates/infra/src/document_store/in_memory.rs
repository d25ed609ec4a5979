use std::collections::HashMap;
use std::sync::RwLock;

use finseal_core::{DocumentId, TenantId};
use finseal_ledger::{FinancialDocument, SequenceAssignment};

use super::r#trait::{DocumentStore, DocumentStoreError};

/// In-memory document store.
///
/// Intended for tests/dev. A single `RwLock` write guard makes every mutation
/// a critical section, which is what gives `commit_finalization` its
/// atomicity here; a SQL implementation would use a transaction plus a
/// unique index on (tenant_id, sequence_number) instead.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, FinancialDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn finalized_of_tenant(
        documents: &HashMap<DocumentId, FinancialDocument>,
        tenant_id: TenantId,
    ) -> Vec<&FinancialDocument> {
        documents
            .values()
            .filter(|d| d.tenant_id() == tenant_id && d.status().is_finalized())
            .collect()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, document: FinancialDocument) -> Result<(), DocumentStoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        let id = document.id_typed();
        if documents.contains_key(&id) {
            return Err(DocumentStoreError::Conflict(format!(
                "document {id} already exists"
            )));
        }
        documents.insert(id, document);
        Ok(())
    }

    fn get(&self, document_id: DocumentId) -> Result<FinancialDocument, DocumentStoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        documents
            .get(&document_id)
            .cloned()
            .ok_or(DocumentStoreError::NotFound)
    }

    fn update(&self, document: FinancialDocument) -> Result<(), DocumentStoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        let id = document.id_typed();
        let existing = documents.get(&id).ok_or(DocumentStoreError::NotFound)?;

        // Defense in depth: once finalized, only whitelist fields may differ.
        if existing.status().is_finalized() && !existing.same_sealed_content(&document) {
            return Err(DocumentStoreError::ImmutableRecord(format!(
                "document {id} is finalized; numbering, items, totals, and hashes are frozen"
            )));
        }

        documents.insert(id, document);
        Ok(())
    }

    fn latest_finalized(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<FinancialDocument>, DocumentStoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        Ok(Self::finalized_of_tenant(&documents, tenant_id)
            .into_iter()
            .max_by_key(|d| d.sequence_number())
            .cloned())
    }

    fn finalized_in_order(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<FinancialDocument>, DocumentStoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        let mut finalized: Vec<FinancialDocument> =
            Self::finalized_of_tenant(&documents, tenant_id)
                .into_iter()
                .cloned()
                .collect();
        finalized.sort_by_key(|d| d.sequence_number());
        Ok(finalized)
    }

    fn commit_finalization(
        &self,
        document_id: DocumentId,
        assignment: SequenceAssignment,
    ) -> Result<FinancialDocument, DocumentStoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentStoreError::Storage("lock poisoned".to_string()))?;

        let document = documents
            .get(&document_id)
            .ok_or(DocumentStoreError::NotFound)?;
        let tenant_id = document.tenant_id();

        if !document.status().is_draft() {
            return Err(DocumentStoreError::Conflict(format!(
                "document {document_id} is {:?}, not draft",
                document.status()
            )));
        }

        // Uniqueness of (tenant, sequence): the gapless-numbering backstop.
        let taken = Self::finalized_of_tenant(&documents, tenant_id)
            .iter()
            .any(|d| d.sequence_number() == Some(assignment.sequence_number));
        if taken {
            return Err(DocumentStoreError::SequenceConflict(format!(
                "sequence {} already assigned for tenant {tenant_id}",
                assignment.sequence_number
            )));
        }

        let mut sealed = document.clone();
        sealed
            .seal(assignment)
            .map_err(|e| DocumentStoreError::Conflict(e.to_string()))?;
        documents.insert(document_id, sealed.clone());
        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use finseal_calc::LineItem;
    use finseal_core::ClientId;
    use finseal_ledger::{GENESIS_HASH, format_document_number};

    fn test_draft(tenant_id: TenantId) -> FinancialDocument {
        FinancialDocument::draft(
            DocumentId::new(),
            tenant_id,
            ClientId::new(),
            vec![LineItem {
                description: "service".to_string(),
                quantity: dec!(1),
                unit_price: dec!(50.00),
                vat_rate: dec!(20),
            }],
        )
        .unwrap()
    }

    fn test_assignment(seq: u64) -> SequenceAssignment {
        SequenceAssignment {
            sequence_number: seq,
            document_number: format_document_number(2026, seq),
            previous_hash: GENESIS_HASH.to_string(),
            security_hash: format!("{seq:064}"),
            finalized_at: Utc::now(),
        }
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let store = InMemoryDocumentStore::new();
        let doc = test_draft(TenantId::new());
        store.insert(doc.clone()).unwrap();
        assert_eq!(store.get(doc.id_typed()).unwrap(), doc);
    }

    #[test]
    fn double_insert_conflicts() {
        let store = InMemoryDocumentStore::new();
        let doc = test_draft(TenantId::new());
        store.insert(doc.clone()).unwrap();
        assert!(matches!(
            store.insert(doc),
            Err(DocumentStoreError::Conflict(_))
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            store.get(DocumentId::new()),
            Err(DocumentStoreError::NotFound)
        ));
    }

    #[test]
    fn commit_finalization_seals_draft() {
        let store = InMemoryDocumentStore::new();
        let tenant_id = TenantId::new();
        let doc = test_draft(tenant_id);
        let id = doc.id_typed();
        store.insert(doc).unwrap();

        let sealed = store.commit_finalization(id, test_assignment(1)).unwrap();
        assert_eq!(sealed.sequence_number(), Some(1));
        assert_eq!(store.latest_finalized(tenant_id).unwrap().unwrap(), sealed);
    }

    #[test]
    fn duplicate_sequence_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let tenant_id = TenantId::new();
        let first = test_draft(tenant_id);
        let second = test_draft(tenant_id);
        let (id1, id2) = (first.id_typed(), second.id_typed());
        store.insert(first).unwrap();
        store.insert(second).unwrap();

        store.commit_finalization(id1, test_assignment(1)).unwrap();
        assert!(matches!(
            store.commit_finalization(id2, test_assignment(1)),
            Err(DocumentStoreError::SequenceConflict(_))
        ));
    }

    #[test]
    fn finalizing_twice_conflicts() {
        let store = InMemoryDocumentStore::new();
        let doc = test_draft(TenantId::new());
        let id = doc.id_typed();
        store.insert(doc).unwrap();

        store.commit_finalization(id, test_assignment(1)).unwrap();
        assert!(matches!(
            store.commit_finalization(id, test_assignment(2)),
            Err(DocumentStoreError::Conflict(_))
        ));
    }

    #[test]
    fn update_guards_finalized_frozen_fields() {
        let store = InMemoryDocumentStore::new();
        let doc = test_draft(TenantId::new());
        let id = doc.id_typed();
        store.insert(doc).unwrap();
        let mut sealed = store.commit_finalization(id, test_assignment(1)).unwrap();

        // Whitelisted status change goes through.
        sealed.mark_paid().unwrap();
        store.update(sealed).unwrap();
        assert_eq!(
            store.get(id).unwrap().status(),
            finseal_ledger::DocumentStatus::Paid
        );

        // A rebuilt record with different frozen content does not.
        let tenant_id = store.get(id).unwrap().tenant_id();
        let mut forged =
            FinancialDocument::draft(id, tenant_id, ClientId::new(), vec![]).unwrap();
        forged.seal(test_assignment(9)).unwrap();
        assert!(matches!(
            store.update(forged),
            Err(DocumentStoreError::ImmutableRecord(_))
        ));
    }

    #[test]
    fn latest_finalized_ignores_other_tenants() {
        let store = InMemoryDocumentStore::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        let doc_a = test_draft(tenant_a);
        let id_a = doc_a.id_typed();
        store.insert(doc_a).unwrap();
        store.commit_finalization(id_a, test_assignment(1)).unwrap();

        assert!(store.latest_finalized(tenant_b).unwrap().is_none());
        assert!(store.finalized_in_order(tenant_b).unwrap().is_empty());
    }
}
