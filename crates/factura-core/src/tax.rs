//! # Tax Calculator
//!
//! Pure arithmetic for line amounts, tax charges and document totals.
//!
//! ## Rounding Pipeline
//! ```text
//! quantity × unit_price ──round2──► line.amount
//!                                        │
//!                          ┌─────────────┼─────────────┐
//!                          ▼             ▼             ▼
//!                  × IVA rate     × ISR rate    × IEPS rate
//!                     round2         round2        round2
//!                          │             │             │
//!                          └─────────────┴─────────────┘
//!                                        │
//!   subtotal  = Σ line.amount            ▼
//!   total_tax = Σ charge.amount   (sum of already-rounded values)
//!   total     = subtotal + total_tax
//! ```
//!
//! Every step rounds on its own. Totals are sums of rounded components and
//! may differ by a centavo from an unrounded computation; the SAT checks the
//! rounded sums.
//!
//! The calculator never fails. Negative inputs are the validator's concern.

use rust_decimal::Decimal;

use crate::money::Money;
use crate::types::{Invoice, LineItem, TaxCharge};

// =============================================================================
// Results
// =============================================================================

/// Derived values of one line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineComputation {
    /// `round2(quantity × unit_price)`.
    pub amount: Money,
    /// The input charges with their amounts filled in, order preserved.
    pub taxes: Vec<TaxCharge>,
}

/// Document-level aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub total_tax: Money,
    pub total: Money,
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes the extended amount of a line and the amount of each charge.
pub fn compute_line(quantity: Decimal, unit_price: Money, charges: &[TaxCharge]) -> LineComputation {
    let amount = unit_price.multiply_quantity(quantity);
    let taxes = charges
        .iter()
        .map(|charge| TaxCharge {
            kind: charge.kind,
            rate: charge.rate,
            amount: amount.calculate_tax(charge.rate),
        })
        .collect();

    LineComputation { amount, taxes }
}

/// Aggregates already-computed lines into document totals.
pub fn compute_document_totals(lines: &[LineItem]) -> DocumentTotals {
    let subtotal: Money = lines.iter().map(|line| line.amount).sum();
    let total_tax: Money = lines.iter().map(LineItem::tax_total).sum();

    DocumentTotals {
        subtotal,
        total_tax,
        total: subtotal + total_tax,
    }
}

/// Writes every derived amount of the invoice back into it.
///
/// Run after each edit to the line items, and always before validating,
/// stamping or serializing. Idempotent.
pub fn recompute(invoice: &mut Invoice) -> DocumentTotals {
    for line in &mut invoice.line_items {
        let computed = compute_line(line.quantity, line.unit_price, &line.taxes);
        line.amount = computed.amount;
        line.taxes = computed.taxes;
    }

    let totals = compute_document_totals(&invoice.line_items);
    invoice.subtotal = totals.subtotal;
    invoice.total_tax = totals.total_tax;
    invoice.total = totals.total;
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvoiceDraft, Issuer, PaymentTerms, Recipient, TaxKind, TaxRate};
    use chrono::Utc;

    fn vat() -> TaxCharge {
        TaxCharge::new(TaxKind::ValueAdded, TaxRate::from_percent(16))
    }

    fn isr() -> TaxCharge {
        TaxCharge::new(TaxKind::IncomeWithholding, TaxRate::from_percent(10))
    }

    fn invoice_with(lines: Vec<LineItem>) -> Invoice {
        let draft = InvoiceDraft {
            issuer: Issuer::default(),
            recipient: Recipient::default(),
            line_items: lines,
            payment_terms: PaymentTerms::new("PUE", "01"),
            issued_at: Utc::now(),
            series: None,
            folio: None,
        };
        Invoice::from_draft("owner-1", draft, Utc::now())
    }

    #[test]
    fn test_compute_line_rounds_each_step() {
        // 3 × 33.33 = 99.99; 16% of 99.99 = 15.9984 → 16.00
        let result = compute_line(Decimal::from(3), Money::from_cents(3333), &[vat()]);
        assert_eq!(result.amount.cents(), 9999);
        assert_eq!(result.taxes[0].amount.cents(), 1600);
    }

    #[test]
    fn test_compute_line_fractional_quantity() {
        // 1.5 × 10.01 = 15.015 → 15.02 (half away from zero)
        let result = compute_line(Decimal::new(15, 1), Money::from_cents(1001), &[]);
        assert_eq!(result.amount.cents(), 1502);
        assert!(result.taxes.is_empty());
    }

    #[test]
    fn test_compute_line_preserves_charge_order() {
        let result = compute_line(Decimal::ONE, Money::from_cents(1000), &[isr(), vat()]);
        assert_eq!(result.taxes[0].kind, TaxKind::IncomeWithholding);
        assert_eq!(result.taxes[0].amount.cents(), 100);
        assert_eq!(result.taxes[1].kind, TaxKind::ValueAdded);
        assert_eq!(result.taxes[1].amount.cents(), 160);
    }

    #[test]
    fn test_per_charge_rounding_is_not_deferred() {
        // Two lines of 0.03 at 16%: each charge rounds 0.0048 → 0.00.
        // Deferred rounding would give 0.0096 → 0.01.
        let lines = vec![
            LineItem::new("01010101", "A", Decimal::ONE, Money::from_cents(3), vec![vat()]),
            LineItem::new("01010101", "B", Decimal::ONE, Money::from_cents(3), vec![vat()]),
        ];
        let mut invoice = invoice_with(lines);
        let totals = recompute(&mut invoice);

        assert_eq!(totals.subtotal.cents(), 6);
        assert_eq!(totals.total_tax.cents(), 0);
    }

    #[test]
    fn test_two_line_scenario() {
        let lines = vec![
            LineItem::new(
                "43231500",
                "Licencia",
                Decimal::from(2),
                Money::from_cents(5000),
                vec![vat()],
            ),
            LineItem::new(
                "80101500",
                "Consultoría",
                Decimal::ONE,
                Money::from_cents(1000),
                vec![vat(), isr()],
            ),
        ];
        let mut invoice = invoice_with(lines);
        recompute(&mut invoice);

        assert_eq!(invoice.line_items[0].amount.cents(), 10000);
        assert_eq!(invoice.line_items[0].taxes[0].amount.cents(), 1600);
        assert_eq!(invoice.line_items[1].taxes[0].amount.cents(), 160);
        assert_eq!(invoice.line_items[1].taxes[1].amount.cents(), 100);
        assert_eq!(invoice.subtotal.cents(), 11000);
        assert_eq!(invoice.total_tax.cents(), 1860);
        assert_eq!(invoice.total.cents(), 12860);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let lines = vec![LineItem::new(
            "84111500",
            "Servicio",
            Decimal::new(333, 3),
            Money::from_cents(299),
            vec![vat(), isr()],
        )];
        let mut invoice = invoice_with(lines);
        let first = recompute(&mut invoice);
        let snapshot = invoice.clone();
        let second = recompute(&mut invoice);

        assert_eq!(first, second);
        assert_eq!(snapshot, invoice);
        assert_eq!(second.total, second.subtotal + second.total_tax);
    }

    #[test]
    fn test_huge_quantity_saturates_without_wrapping() {
        let lines = vec![LineItem::new(
            "01010101",
            "Volumen",
            Decimal::from(100_000_000_000_000_000_i64),
            Money::from_cents(10_000),
            vec![vat()],
        )];
        let mut invoice = invoice_with(lines);
        let totals = recompute(&mut invoice);

        assert!(invoice.line_items[0].amount.is_saturated());
        assert!(totals.total_tax.is_positive());
        assert!(totals.total.is_positive());
        assert_eq!(totals.total, totals.subtotal + totals.total_tax);
    }

    #[test]
    fn test_empty_document_totals_are_zero() {
        assert_eq!(compute_document_totals(&[]), DocumentTotals::default());
    }
}
