use std::sync::Arc;

use thiserror::Error;

use finseal_core::{DocumentId, TenantId};
use finseal_ledger::{FinancialDocument, SequenceAssignment};

/// Document store operation error.
///
/// Infrastructure errors (storage, sequencing conflicts, immutability
/// defense), as opposed to domain errors. The ledger service maps these into
/// `DomainError` at its boundary.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("document not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    /// Another writer took the same (tenant, sequence) slot. The ledger
    /// retries the numbering transaction on this.
    #[error("sequence conflict: {0}")]
    SequenceConflict(String),

    /// A write attempted to alter the frozen fields of a finalized record.
    #[error("immutable record: {0}")]
    ImmutableRecord(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable, tenant-scoped document storage.
///
/// Implementations must:
/// - keep (tenant, sequence_number) unique across finalized documents
/// - apply `commit_finalization` as a single atomic write
/// - refuse writes that alter the frozen fields of a finalized record
/// - never physically delete a finalized document
pub trait DocumentStore: Send + Sync {
    /// Insert a new draft. Fails with `Conflict` if the id already exists.
    fn insert(&self, document: FinancialDocument) -> Result<(), DocumentStoreError>;

    /// Load a document by id.
    fn get(&self, document_id: DocumentId) -> Result<FinancialDocument, DocumentStoreError>;

    /// Persist draft edits or whitelist status changes. Fails with
    /// `ImmutableRecord` if frozen fields of a finalized record would change.
    fn update(&self, document: FinancialDocument) -> Result<(), DocumentStoreError>;

    /// The finalized document with the highest sequence number for a tenant.
    fn latest_finalized(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<FinancialDocument>, DocumentStoreError>;

    /// All finalized documents for a tenant, ascending by sequence number.
    fn finalized_in_order(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<FinancialDocument>, DocumentStoreError>;

    /// Atomically apply a finalization assignment to a draft.
    ///
    /// Must check, under the same critical section: the document exists and
    /// is a draft, and no finalized document of the tenant already holds
    /// `assignment.sequence_number` (else `SequenceConflict`).
    fn commit_finalization(
        &self,
        document_id: DocumentId,
        assignment: SequenceAssignment,
    ) -> Result<FinancialDocument, DocumentStoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn insert(&self, document: FinancialDocument) -> Result<(), DocumentStoreError> {
        (**self).insert(document)
    }

    fn get(&self, document_id: DocumentId) -> Result<FinancialDocument, DocumentStoreError> {
        (**self).get(document_id)
    }

    fn update(&self, document: FinancialDocument) -> Result<(), DocumentStoreError> {
        (**self).update(document)
    }

    fn latest_finalized(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<FinancialDocument>, DocumentStoreError> {
        (**self).latest_finalized(tenant_id)
    }

    fn finalized_in_order(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<FinancialDocument>, DocumentStoreError> {
        (**self).finalized_in_order(tenant_id)
    }

    fn commit_finalization(
        &self,
        document_id: DocumentId,
        assignment: SequenceAssignment,
    ) -> Result<FinancialDocument, DocumentStoreError> {
        (**self).commit_finalization(document_id, assignment)
    }
}
