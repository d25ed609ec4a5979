use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finseal_core::{DomainError, DomainResult, Money};

/// One line of a financial document.
///
/// `unit_price` is a pricing input and may carry sub-cent precision (e.g.
/// 49.995); only the derived amounts are money. Line amounts are derived,
/// never stored independently of the parent document:
/// `net = round(quantity × unit_price)`, `vat = round(net × vat_rate / 100)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    /// Positive rational quantity (e.g. 2.5 hours).
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT percentage, e.g. 20.0.
    pub vat_rate: Decimal,
}

/// Rounded amounts for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub net: Money,
    pub vat: Money,
    pub gross: Money,
}

/// Per-rate VAT accumulation, used by downstream tax reporting.
pub type VatBreakdown = BTreeMap<Decimal, Money>;

/// Rounded aggregate totals for a document.
///
/// `vat_total` is derived as `gross_total − net_total`, not as the sum of
/// `vat_breakdown` values. This is a deliberate reconciliation step: the
/// three headline totals always satisfy net + vat = gross exactly to the
/// cent, at the cost of `vat_total` occasionally disagreeing by a cent with
/// the breakdown sum on multi-rate documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub net_total: Money,
    pub vat_total: Money,
    pub gross_total: Money,
    pub vat_breakdown: VatBreakdown,
}

impl DocumentTotals {
    pub fn zero() -> Self {
        Self {
            net_total: Money::ZERO,
            vat_total: Money::ZERO,
            gross_total: Money::ZERO,
            vat_breakdown: VatBreakdown::new(),
        }
    }
}

fn validate_inputs(quantity: Decimal, unit_price: Decimal, vat_rate: Decimal) -> DomainResult<()> {
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(DomainError::validation("quantity must not be negative"));
    }
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(DomainError::validation("unit price must not be negative"));
    }
    if vat_rate < Decimal::ZERO || vat_rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation("vat rate must be within [0, 100]"));
    }
    Ok(())
}

/// Compute the rounded amounts for one line.
///
/// Net, VAT, and gross are each **independently rounded** (gross is not
/// `net + vat` of the unrounded values). This avoids cascading rounding
/// error but means the three values may disagree by at most one cent at the
/// line level; downstream totals re-round at the aggregate level, so this is
/// tolerated, not corrected.
pub fn compute_line(
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
) -> DomainResult<LineAmounts> {
    validate_inputs(quantity, unit_price, vat_rate)?;

    let net = Money::round(quantity * unit_price);
    let vat = Money::round(net.amount() * vat_rate / Decimal::ONE_HUNDRED);
    let gross = Money::round(net.amount() + vat.amount());

    Ok(LineAmounts { net, vat, gross })
}

/// Compute the rounded aggregate totals for a whole document.
///
/// Line nets and grosses are summed and each aggregate is rounded once at the
/// end; the breakdown accumulates each line's already-rounded VAT keyed by
/// its rate. An empty item list is valid and yields all-zero totals.
pub fn compute_document(items: &[LineItem]) -> DomainResult<DocumentTotals> {
    let mut net_sum = Decimal::ZERO;
    let mut gross_sum = Decimal::ZERO;
    let mut vat_breakdown = VatBreakdown::new();

    for item in items {
        let amounts = compute_line(item.quantity, item.unit_price, item.vat_rate)?;
        net_sum += amounts.net.amount();
        gross_sum += amounts.gross.amount();
        let entry = vat_breakdown.entry(item.vat_rate).or_insert(Money::ZERO);
        *entry = *entry + amounts.vat;
    }

    let net_total = Money::round(net_sum);
    let gross_total = Money::round(gross_sum);
    // Reconciled: net + vat = gross holds exactly for the headline totals.
    let vat_total = gross_total - net_total;

    Ok(DocumentTotals {
        net_total,
        vat_total,
        gross_total,
        vat_breakdown,
    })
}
