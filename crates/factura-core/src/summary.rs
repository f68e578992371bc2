//! # Dashboard Summary
//!
//! Counts by state, stamped revenue and the latest documents.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus};

/// How many documents the "recent" list holds.
pub const RECENT_LIMIT: usize = 5;

/// Aggregate figures over a set of invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceSummary {
    pub total: usize,
    pub drafts: usize,
    pub stamped: usize,
    pub canceled: usize,
    /// Sum of totals of stamped documents. Drafts and canceled ones don't count.
    pub stamped_amount: Money,
    /// Ids of the most recently created documents, newest first.
    pub recent: Vec<String>,
}

/// Summarizes invoices in any order.
pub fn summarize(invoices: &[Invoice]) -> InvoiceSummary {
    let mut summary = InvoiceSummary {
        total: invoices.len(),
        ..InvoiceSummary::default()
    };

    for invoice in invoices {
        match invoice.status {
            InvoiceStatus::Draft => summary.drafts += 1,
            InvoiceStatus::Stamped => {
                summary.stamped += 1;
                summary.stamped_amount += invoice.total;
            }
            InvoiceStatus::Canceled => summary.canceled += 1,
        }
    }

    let mut by_age: Vec<&Invoice> = invoices.iter().collect();
    by_age.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    summary.recent = by_age
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|invoice| invoice.id.clone())
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvoiceDraft, Issuer, PaymentTerms, Recipient};
    use chrono::{Duration, Utc};

    fn invoice(id: &str, status: InvoiceStatus, total_cents: i64, age_minutes: i64) -> Invoice {
        let created = Utc::now() - Duration::minutes(age_minutes);
        let draft = InvoiceDraft {
            issuer: Issuer::default(),
            recipient: Recipient::default(),
            line_items: vec![],
            payment_terms: PaymentTerms::default(),
            issued_at: created,
            series: None,
            folio: None,
        };
        let mut invoice = Invoice::from_draft("owner-1", draft, created);
        invoice.id = id.to_string();
        invoice.status = status;
        invoice.total = Money::from_cents(total_cents);
        invoice
    }

    #[test]
    fn test_counts_and_stamped_amount() {
        let invoices = vec![
            invoice("a", InvoiceStatus::Draft, 1_000, 1),
            invoice("b", InvoiceStatus::Stamped, 11_600, 2),
            invoice("c", InvoiceStatus::Stamped, 12_860, 3),
            invoice("d", InvoiceStatus::Canceled, 50_000, 4),
        ];
        let summary = summarize(&invoices);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.drafts, 1);
        assert_eq!(summary.stamped, 2);
        assert_eq!(summary.canceled, 1);
        assert_eq!(summary.stamped_amount.cents(), 24_460);
    }

    #[test]
    fn test_recent_is_newest_first_and_capped() {
        let invoices: Vec<Invoice> = (0..7)
            .map(|i| invoice(&format!("inv-{i}"), InvoiceStatus::Draft, 0, 10 - i))
            .collect();
        let summary = summarize(&invoices);

        assert_eq!(
            summary.recent,
            vec!["inv-6", "inv-5", "inv-4", "inv-3", "inv-2"]
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(summarize(&[]), InvoiceSummary::default());
    }
}
