//! Hash-chain codec and verification.
//!
//! Every finalized document carries a security hash over its own legal
//! fields plus the previous document's hash, so any later insertion,
//! deletion, or edit of a finalized record becomes detectable.
//!
//! ## Hash input format (v1, frozen)
//!
//! The digest input is the `|`-joined concatenation, in this order:
//!
//! ```text
//! document_number | gross_total | client_id | finalized_at | previous_hash
//! ```
//!
//! where `gross_total` is the 2-decimal string (e.g. `1200.50`), `client_id`
//! the hyphenated UUID, and `finalized_at` RFC 3339 with microsecond
//! precision and a `Z` suffix (e.g. `2026-03-10T14:30:00.000000Z`). Any
//! verifier must reproduce this byte-for-byte; treat it as a versioned wire
//! format even though it is internal.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use finseal_core::{ClientId, DocumentId, DomainError, DomainResult, Money, TenantId};

use crate::document::FinancialDocument;

/// Previous-hash sentinel for the first document a tenant ever finalizes.
pub const GENESIS_HASH: &str = "GENESIS";

/// Serialize the v1 hash input. Byte-for-byte stable.
fn hash_input(
    document_number: &str,
    gross_total: Money,
    client_id: ClientId,
    finalized_at: DateTime<Utc>,
    previous_hash: &str,
) -> String {
    format!(
        "{document_number}|{gross_total}|{client_id}|{}|{previous_hash}",
        finalized_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

/// Compute the hex-encoded SHA-256 security hash for one finalized document.
pub fn security_hash(
    document_number: &str,
    gross_total: Money,
    client_id: ClientId,
    finalized_at: DateTime<Utc>,
    previous_hash: &str,
) -> String {
    let input = hash_input(
        document_number,
        gross_total,
        client_id,
        finalized_at,
        previous_hash,
    );
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// The first broken link found while replaying a tenant's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainBreak {
    /// Sequence numbers are not the gapless 1..N run they must be.
    SequenceGap {
        document_id: DocumentId,
        expected: u64,
        found: u64,
    },
    /// A finalized document is missing numbering/hash fields entirely.
    MissingSeal {
        document_id: DocumentId,
        sequence_number: u64,
    },
    /// The stored previous-hash does not point at the predecessor's hash.
    ForkedLink {
        document_id: DocumentId,
        sequence_number: u64,
        expected: String,
        stored: String,
    },
    /// The stored security hash does not match the recomputed one: the
    /// record's legal fields were mutated after finalization.
    TamperedRecord {
        document_id: DocumentId,
        sequence_number: u64,
        expected: String,
        stored: String,
    },
}

/// Result of a read-only chain audit for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub tenant_id: TenantId,
    /// Links verified before the first break (all of them when intact).
    pub verified_links: u64,
    pub first_break: Option<ChainBreak>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.first_break.is_none()
    }

    /// Convert a detected break into an error for callers that treat tamper
    /// evidence as fatal.
    pub fn ensure_intact(&self) -> DomainResult<()> {
        match &self.first_break {
            None => Ok(()),
            Some(brk) => Err(DomainError::integrity(format!(
                "hash chain broken for tenant {}: {brk:?}",
                self.tenant_id
            ))),
        }
    }
}

/// Replay a tenant's finalized documents in sequence order, recomputing every
/// security hash, and report the first mismatch as tamper evidence.
///
/// Read-only; never repairs anything. Callers pass the tenant's finalized
/// documents; drafts are rejected with `InvariantViolation` since they have
/// no place in a chain.
pub fn verify(tenant_id: TenantId, documents: &[FinancialDocument]) -> DomainResult<ChainReport> {
    let mut ordered: Vec<&FinancialDocument> = documents.iter().collect();
    ordered.sort_by_key(|d| d.sequence_number());

    let mut previous_hash = GENESIS_HASH.to_string();
    let mut verified: u64 = 0;

    for (idx, doc) in ordered.iter().enumerate() {
        if doc.tenant_id() != tenant_id {
            return Err(DomainError::invariant(format!(
                "document {} belongs to another tenant",
                doc.id_typed()
            )));
        }
        if doc.status().is_draft() {
            return Err(DomainError::invariant(format!(
                "document {} is a draft and cannot be chain-verified",
                doc.id_typed()
            )));
        }

        let expected_seq = idx as u64 + 1;
        let Some(sequence_number) = doc.sequence_number() else {
            return Ok(ChainReport {
                tenant_id,
                verified_links: verified,
                first_break: Some(ChainBreak::MissingSeal {
                    document_id: doc.id_typed(),
                    sequence_number: expected_seq,
                }),
            });
        };
        if sequence_number != expected_seq {
            return Ok(ChainReport {
                tenant_id,
                verified_links: verified,
                first_break: Some(ChainBreak::SequenceGap {
                    document_id: doc.id_typed(),
                    expected: expected_seq,
                    found: sequence_number,
                }),
            });
        }

        let (Some(number), Some(stored_previous), Some(stored_hash), Some(finalized_at)) = (
            doc.document_number(),
            doc.previous_hash(),
            doc.security_hash(),
            doc.finalized_at(),
        ) else {
            return Ok(ChainReport {
                tenant_id,
                verified_links: verified,
                first_break: Some(ChainBreak::MissingSeal {
                    document_id: doc.id_typed(),
                    sequence_number,
                }),
            });
        };

        if stored_previous != previous_hash {
            return Ok(ChainReport {
                tenant_id,
                verified_links: verified,
                first_break: Some(ChainBreak::ForkedLink {
                    document_id: doc.id_typed(),
                    sequence_number,
                    expected: previous_hash,
                    stored: stored_previous.to_string(),
                }),
            });
        }

        let recomputed = security_hash(
            number,
            doc.totals().gross_total,
            doc.client_id(),
            finalized_at,
            stored_previous,
        );
        if recomputed != stored_hash {
            return Ok(ChainReport {
                tenant_id,
                verified_links: verified,
                first_break: Some(ChainBreak::TamperedRecord {
                    document_id: doc.id_typed(),
                    sequence_number,
                    expected: recomputed,
                    stored: stored_hash.to_string(),
                }),
            });
        }

        previous_hash = stored_hash.to_string();
        verified += 1;
    }

    Ok(ChainReport {
        tenant_id,
        verified_links: verified,
        first_break: None,
    })
}
