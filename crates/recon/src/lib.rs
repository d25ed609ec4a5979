//! `finseal-recon` — reconciliation matcher domain model.
//!
//! Scores candidate pairings between imported bank movements and pending
//! expense records. Suggestions are advisory only; nothing is ever matched
//! automatically.

pub mod matcher;
pub mod model;

pub use matcher::{MatchCandidate, MatcherConfig, rank_candidates, score_pair};
pub use model::{BankMovement, ExpenseRecord, ExpenseStatus, MovementStatus};
