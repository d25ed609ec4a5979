//! `finseal-calc` — monetary calculation engine.
//!
//! Pure, stateless arithmetic over line items. No I/O.

pub mod engine;

pub use engine::{DocumentTotals, LineAmounts, LineItem, VatBreakdown, compute_document, compute_line};
