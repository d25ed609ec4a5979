//! Factor scoring and candidate ranking.
//!
//! Every (pending movement, pending expense) pair is scored on three
//! independent factors; the confidence is the plain sum of the factor scores.
//! The factor weights are chosen so their maxima sum to exactly 1.0 (amount
//! 0.50, date 0.30, description 0.20), which keeps the configured threshold
//! meaningfully reachable (exact amount + same day alone scores 0.80). There
//! is deliberately no division by the factor count.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finseal_core::{ExpenseId, MovementId};

use crate::model::{BankMovement, ExpenseRecord};

/// Matcher tuning. One knob: the minimum confidence a suggestion must reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub confidence_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.70,
        }
    }
}

/// A scored, advisory pairing suggestion. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub movement_id: MovementId,
    pub expense_id: ExpenseId,
    /// In [0, 1].
    pub confidence: f64,
    /// Human-readable matched factors, in factor order.
    pub reasons: Vec<&'static str>,
}

fn amount_score(movement: &BankMovement, expense: &ExpenseRecord) -> Option<(f64, &'static str)> {
    let diff = (movement.amount.abs() - expense.amount).abs().amount();
    if diff.is_zero() {
        Some((0.50, "exact amount"))
    } else if diff < Decimal::ONE {
        Some((0.35, "close amount"))
    } else if diff < Decimal::from(5) {
        Some((0.20, "approximate amount"))
    } else {
        None
    }
}

fn date_score(movement: &BankMovement, expense: &ExpenseRecord) -> Option<(f64, &'static str)> {
    let days = (movement.date - expense.date).num_days().abs();
    match days {
        0 => Some((0.30, "same day")),
        1..=3 => Some((0.20, "within 3 days")),
        4..=7 => Some((0.10, "within 7 days")),
        _ => None,
    }
}

fn label_score(movement: &BankMovement, expense: &ExpenseRecord) -> Option<(f64, &'static str)> {
    let label = movement.label.to_lowercase();
    let supplier = expense.supplier.to_lowercase();
    if supplier.is_empty() || label.is_empty() {
        return None;
    }
    if label.contains(&supplier) || supplier.contains(&label) {
        Some((0.20, "similar description"))
    } else {
        None
    }
}

/// Score one (movement, expense) pair. `None` when no factor matched at all.
pub fn score_pair(movement: &BankMovement, expense: &ExpenseRecord) -> Option<MatchCandidate> {
    let mut confidence = 0.0;
    let mut reasons = Vec::new();

    for factor in [
        amount_score(movement, expense),
        date_score(movement, expense),
        label_score(movement, expense),
    ]
    .into_iter()
    .flatten()
    {
        confidence += factor.0;
        reasons.push(factor.1);
    }

    if reasons.is_empty() {
        return None;
    }

    Some(MatchCandidate {
        movement_id: movement.id,
        expense_id: expense.id,
        confidence,
        reasons,
    })
}

/// Score every pending pair and keep those at or above the threshold, sorted
/// by descending confidence.
///
/// A movement may appear in several candidates; picking at most one is the
/// confirming caller's job. An empty result is a valid, non-error outcome.
pub fn rank_candidates(
    movements: &[BankMovement],
    expenses: &[ExpenseRecord],
    config: &MatcherConfig,
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = movements
        .iter()
        .filter(|m| m.is_pending())
        .flat_map(|movement| {
            expenses
                .iter()
                .filter(|e| e.is_pending())
                .filter_map(move |expense| score_pair(movement, expense))
        })
        .filter(|c| c.confidence >= config.confidence_threshold)
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    candidates
}
