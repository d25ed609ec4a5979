//! `finseal-ledger` — sequential ledger domain model.
//!
//! The `FinancialDocument` entity with its one-way finalization state machine,
//! and the hash-chain codec that makes finalized records tamper-evident.

pub mod chain;
pub mod document;

pub use chain::{ChainBreak, ChainReport, GENESIS_HASH, security_hash, verify};
pub use document::{DocumentStatus, FinancialDocument, SequenceAssignment, format_document_number};
