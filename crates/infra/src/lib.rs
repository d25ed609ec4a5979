//! Infrastructure layer: storage traits, in-memory stores, services.
//!
//! Persistence sits behind synchronous store traits (`DocumentStore`,
//! `ReconStore`); the in-memory implementations serve tests and development,
//! and mark the boundary where a SQL-backed store would plug in. The
//! services (`SequentialLedger`, `Reconciliation`) orchestrate the domain
//! crates over those traits.

pub mod document_store;
pub mod recon_store;
pub mod reconciliation;
pub mod sequential_ledger;

#[cfg(test)]
mod integration_tests;

pub use document_store::{DocumentStore, DocumentStoreError, InMemoryDocumentStore};
pub use recon_store::{InMemoryReconStore, ReconStore, ReconStoreError};
pub use reconciliation::Reconciliation;
pub use sequential_ledger::SequentialLedger;
