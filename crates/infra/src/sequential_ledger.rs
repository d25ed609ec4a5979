//! Sequential ledger service: gapless legal numbering and hash chaining.
//!
//! `finalize` is the only operation that reads then writes the per-tenant
//! sequence counter, so it is the one place the read-then-write race lives.
//! Two layers close it:
//!
//! 1. a per-tenant mutex held for the whole read-latest → compute → commit
//!    section, so concurrent finalizations for one tenant serialize in
//!    process;
//! 2. the store's (tenant, sequence) uniqueness check, retried transparently
//!    here, so a store shared by several service instances still cannot hand
//!    out a duplicate number or fork the chain.
//!
//! Finalizations for different tenants never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};

use finseal_core::{DocumentId, DomainError, DomainResult, TenantId};
use finseal_ledger::{
    ChainReport, FinancialDocument, GENESIS_HASH, SequenceAssignment, chain,
    format_document_number,
};

use crate::document_store::{DocumentStore, DocumentStoreError};

/// Bounded retry for sequence conflicts from the store. With the per-tenant
/// mutex in place this loop runs once; it only spins when several service
/// instances share one store.
const MAX_SEQUENCE_RETRIES: u32 = 8;

impl From<DocumentStoreError> for DomainError {
    fn from(value: DocumentStoreError) -> Self {
        match value {
            DocumentStoreError::NotFound => DomainError::NotFound,
            DocumentStoreError::Conflict(msg) => DomainError::conflict(msg),
            DocumentStoreError::SequenceConflict(msg) => DomainError::concurrency(msg),
            DocumentStoreError::ImmutableRecord(msg) => DomainError::conflict(msg),
            DocumentStoreError::Storage(msg) => DomainError::conflict(msg),
        }
    }
}

/// Lazily-created per-tenant finalization locks.
///
/// Entries are evicted on the next lookup once no finalization holds them
/// (strong count back to 1), so the table tracks the tenants currently
/// finalizing rather than every tenant the service ever saw.
#[derive(Debug, Default)]
struct TenantLocks {
    inner: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    fn for_tenant(&self, tenant_id: TenantId) -> DomainResult<Arc<Mutex<()>>> {
        let mut locks = self
            .inner
            .lock()
            .map_err(|_| DomainError::concurrency("tenant lock table poisoned"))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(locks.entry(tenant_id).or_default().clone())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// The validation state machine that assigns legal document numbers.
#[derive(Debug)]
pub struct SequentialLedger<S> {
    store: S,
    locks: TenantLocks,
}

impl<S> SequentialLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: TenantLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: DocumentStore> SequentialLedger<S> {
    /// Finalize a draft: assign the next gapless sequence number, the legal
    /// document number, and the chained security hash, as one atomic write.
    ///
    /// Not idempotent: a second call on an already-finalized document fails
    /// with `Conflict`. Once the commit lands, the numbering is permanent:
    /// any downstream rendering/export failure is that collaborator's
    /// problem, never a reason to roll back a legal number.
    pub fn finalize(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> DomainResult<FinancialDocument> {
        // Business-rule checks come before any locking so callers get
        // NotFound/Forbidden/Conflict without contending on the tenant.
        let document = self.store.get(document_id)?;
        if document.tenant_id() != tenant_id {
            return Err(DomainError::forbidden());
        }
        if !document.status().is_draft() {
            return Err(DomainError::conflict(format!(
                "document {document_id} is {:?}, not draft",
                document.status()
            )));
        }

        let tenant_lock = self.locks.for_tenant(tenant_id)?;
        let _guard = tenant_lock
            .lock()
            .map_err(|_| DomainError::concurrency("tenant lock poisoned"))?;

        for attempt in 0..MAX_SEQUENCE_RETRIES {
            // Re-read under the lock; the document may have been finalized
            // while we waited.
            let document = self.store.get(document_id)?;
            if !document.status().is_draft() {
                return Err(DomainError::conflict(format!(
                    "document {document_id} is {:?}, not draft",
                    document.status()
                )));
            }

            let previous = self.store.latest_finalized(tenant_id)?;
            let (sequence_number, previous_hash) = match &previous {
                Some(prev) => {
                    let seq = prev.sequence_number().ok_or_else(|| {
                        DomainError::invariant("finalized document without sequence number")
                    })?;
                    let hash = prev.security_hash().ok_or_else(|| {
                        DomainError::invariant("finalized document without security hash")
                    })?;
                    (seq + 1, hash.to_string())
                }
                None => (1, GENESIS_HASH.to_string()),
            };

            let finalized_at = Utc::now();
            let document_number = format_document_number(finalized_at.year(), sequence_number);
            let security_hash = chain::security_hash(
                &document_number,
                document.totals().gross_total,
                document.client_id(),
                finalized_at,
                &previous_hash,
            );

            let assignment = SequenceAssignment {
                sequence_number,
                document_number,
                previous_hash,
                security_hash,
                finalized_at,
            };

            match self.store.commit_finalization(document_id, assignment) {
                Ok(sealed) => {
                    tracing::info!(
                        tenant_id = %tenant_id,
                        document_id = %document_id,
                        document_number = sealed.document_number().unwrap_or_default(),
                        sequence_number,
                        "document finalized"
                    );
                    return Ok(sealed);
                }
                Err(DocumentStoreError::SequenceConflict(msg)) => {
                    // Another writer won the slot; recompute everything.
                    tracing::debug!(
                        tenant_id = %tenant_id,
                        document_id = %document_id,
                        attempt,
                        %msg,
                        "sequence conflict, retrying finalization"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(DomainError::concurrency(format!(
            "could not finalize document {document_id} after {MAX_SEQUENCE_RETRIES} attempts"
        )))
    }

    /// Read-only audit: replay the tenant's chain and report the first break.
    pub fn verify_chain(&self, tenant_id: TenantId) -> DomainResult<ChainReport> {
        let documents = self.store.finalized_in_order(tenant_id)?;
        chain::verify(tenant_id, &documents)
    }

    /// Whitelisted post-finalization status change.
    pub fn mark_paid(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> DomainResult<FinancialDocument> {
        self.update_status(tenant_id, document_id, FinancialDocument::mark_paid)
    }

    pub fn mark_cancelled(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> DomainResult<FinancialDocument> {
        self.update_status(tenant_id, document_id, FinancialDocument::mark_cancelled)
    }

    pub fn mark_overdue(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> DomainResult<FinancialDocument> {
        self.update_status(tenant_id, document_id, FinancialDocument::mark_overdue)
    }

    /// Bump the reminder counter of a finalized document.
    pub fn record_reminder(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> DomainResult<FinancialDocument> {
        self.update_status(tenant_id, document_id, FinancialDocument::record_reminder)
    }

    fn update_status(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        apply: impl Fn(&mut FinancialDocument) -> DomainResult<()>,
    ) -> DomainResult<FinancialDocument> {
        let mut document = self.store.get(document_id)?;
        if document.tenant_id() != tenant_id {
            return Err(DomainError::forbidden());
        }
        apply(&mut document)?;
        self.store.update(document.clone())?;
        Ok(document)
    }
}
