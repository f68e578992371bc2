//! # Lifecycle State Machine
//!
//! Which operations are legal in which state.
//!
//! ```text
//!            edit / delete
//!              ┌──────┐
//!              ▼      │
//!         ┌─────────┐ │   stamp    ┌─────────┐   cancel   ┌──────────┐
//!  ──────►│  draft  │─┴──────────►│ stamped │──────────►│ canceled │
//!         └─────────┘  (valid doc) └─────────┘ (confirmed)└──────────┘
//!              │                                            terminal
//!              └── delete: removed from the store, not a state
//! ```
//!
//! Stamping and cancellation are acknowledgements of external events: this
//! module only records them on the local document. On failure the document
//! is left exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{FiscalStamp, Invoice, InvoiceStatus};
use crate::validation::validate;

/// An operation requested on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Change issuer, recipient, lines or payment terms.
    Edit,
    /// Record the fiscal stamp.
    Stamp,
    /// Record the cancellation.
    Cancel,
    /// Remove the document from the store.
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Edit, Action::Stamp, Action::Cancel, Action::Delete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Stamp => "stamp",
            Action::Cancel => "cancel",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InvoiceStatus {
    /// The state reached by applying `action`.
    ///
    /// `Edit` and `Delete` keep a draft a draft (deletion happens in the
    /// store). Everything not listed below is an `InvalidTransition`.
    ///
    /// | from    | action | to       |
    /// |---------|--------|----------|
    /// | draft   | edit   | draft    |
    /// | draft   | delete | draft    |
    /// | draft   | stamp  | stamped  |
    /// | stamped | cancel | canceled |
    pub fn transition(self, action: Action) -> CoreResult<InvoiceStatus> {
        match (self, action) {
            (InvoiceStatus::Draft, Action::Edit | Action::Delete) => Ok(InvoiceStatus::Draft),
            (InvoiceStatus::Draft, Action::Stamp) => Ok(InvoiceStatus::Stamped),
            (InvoiceStatus::Stamped, Action::Cancel) => Ok(InvoiceStatus::Canceled),
            (from, action) => Err(CoreError::InvalidTransition { from, action }),
        }
    }

    /// Checks if `action` is permitted in this state.
    pub fn permits(self, action: Action) -> bool {
        self.transition(action).is_ok()
    }

    /// Actions a UI may offer for a document in this state.
    pub fn allowed_actions(self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.permits(*action))
            .collect()
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_actions().is_empty()
    }
}

fn check(invoice: &Invoice, action: Action) -> CoreResult<InvoiceStatus> {
    invoice.status.transition(action).map_err(|err| {
        warn!(invoice_id = %invoice.id, status = %invoice.status, %action, "Rejected transition");
        err
    })
}

/// Fails unless the invoice content may still change.
pub fn ensure_editable(invoice: &Invoice) -> CoreResult<()> {
    check(invoice, Action::Edit).map(|_| ())
}

/// Fails unless the invoice may be removed from the store.
pub fn ensure_deletable(invoice: &Invoice) -> CoreResult<()> {
    check(invoice, Action::Delete).map(|_| ())
}

/// Records the fiscal stamp: draft → stamped.
///
/// ## Preconditions
/// - status is draft
/// - totals were recomputed and `validate(invoice)` is clean
pub fn stamp(invoice: &mut Invoice, fiscal_stamp: FiscalStamp, at: DateTime<Utc>) -> CoreResult<()> {
    let next = check(invoice, Action::Stamp)?;

    let report = validate(invoice);
    if !report.is_valid() {
        warn!(invoice_id = %invoice.id, errors = report.len(), "Refusing to stamp invalid invoice");
        return Err(CoreError::Validation(report));
    }

    info!(invoice_id = %invoice.id, uuid = %fiscal_stamp.uuid, "Invoice stamped");
    invoice.stamp = Some(fiscal_stamp);
    invoice.status = next;
    invoice.updated_at = at;
    Ok(())
}

/// Records the cancellation: stamped → canceled.
///
/// The stamp is kept for audit. Confirmation is the caller's job.
pub fn cancel(invoice: &mut Invoice, at: DateTime<Utc>) -> CoreResult<()> {
    let next = check(invoice, Action::Cancel)?;

    info!(invoice_id = %invoice.id, "Invoice canceled");
    invoice.status = next;
    invoice.updated_at = at;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::tax::recompute;
    use crate::types::{
        InvoiceDraft, Issuer, LineItem, PaymentTerms, Recipient, TaxCharge, TaxKind,
    };
    use chrono::Duration;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn fiscal_stamp() -> FiscalStamp {
        FiscalStamp {
            uuid: Uuid::new_v4(),
            stamped_at: Utc::now(),
            sat_certificate_number: "00001000000509846663".to_string(),
            cfd_seal: "c2VsbG9DRkQ=".to_string(),
            sat_seal: "c2VsbG9TQVQ=".to_string(),
        }
    }

    fn draft_invoice() -> Invoice {
        let draft = InvoiceDraft {
            issuer: Issuer {
                tax_id: "EKU9003173C9".to_string(),
                name: "ESCUELA KEMPER URGATE".to_string(),
                tax_regime: "601".to_string(),
                postal_code: "42501".to_string(),
            },
            recipient: Recipient {
                tax_id: "XAXX010101000".to_string(),
                name: "PUBLICO EN GENERAL".to_string(),
                cfdi_usage: "G03".to_string(),
                fiscal_postal_code: None,
                tax_regime: None,
            },
            line_items: vec![LineItem::new(
                "84111500",
                "Servicios contables",
                Decimal::ONE,
                Money::from_cents(100_000),
                vec![TaxCharge::with_default_rate(TaxKind::ValueAdded)],
            )],
            payment_terms: PaymentTerms::new("PUE", "03"),
            issued_at: Utc::now(),
            series: Some("A".to_string()),
            folio: Some("1".to_string()),
        };
        let mut invoice = Invoice::from_draft("owner-1", draft, Utc::now());
        invoice.id = "inv-1".to_string();
        recompute(&mut invoice);
        invoice
    }

    #[test]
    fn test_transition_table() {
        use Action::*;
        use InvoiceStatus::*;

        assert_eq!(Draft.transition(Edit).unwrap(), Draft);
        assert_eq!(Draft.transition(Delete).unwrap(), Draft);
        assert_eq!(Draft.transition(Stamp).unwrap(), Stamped);
        assert_eq!(Stamped.transition(Cancel).unwrap(), Canceled);

        for (from, action) in [
            (Draft, Cancel),
            (Stamped, Edit),
            (Stamped, Stamp),
            (Stamped, Delete),
            (Canceled, Edit),
            (Canceled, Stamp),
            (Canceled, Cancel),
            (Canceled, Delete),
        ] {
            assert!(
                matches!(
                    from.transition(action),
                    Err(CoreError::InvalidTransition { from: f, action: a }) if f == from && a == action
                ),
                "{from} + {action} should be rejected"
            );
        }
    }

    #[test]
    fn test_allowed_actions() {
        assert_eq!(
            InvoiceStatus::Draft.allowed_actions(),
            vec![Action::Edit, Action::Stamp, Action::Delete]
        );
        assert_eq!(InvoiceStatus::Stamped.allowed_actions(), vec![Action::Cancel]);
        assert!(InvoiceStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_stamp_valid_draft() {
        let mut invoice = draft_invoice();
        let at = invoice.updated_at + Duration::seconds(5);
        let stamp_value = fiscal_stamp();

        stamp(&mut invoice, stamp_value.clone(), at).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Stamped);
        assert_eq!(invoice.stamp, Some(stamp_value));
        assert_eq!(invoice.updated_at, at);
    }

    #[test]
    fn test_stamp_invalid_draft_leaves_document_untouched() {
        let mut invoice = draft_invoice();
        invoice.recipient.tax_id = "ABC1234".to_string();
        let before = invoice.clone();

        let err = stamp(&mut invoice, fiscal_stamp(), Utc::now()).unwrap_err();

        let report = err.validation_report().unwrap();
        assert!(report.contains("receptorRfc"));
        assert_eq!(invoice, before);
    }

    #[test]
    fn test_cancel_keeps_stamp() {
        let mut invoice = draft_invoice();
        stamp(&mut invoice, fiscal_stamp(), Utc::now()).unwrap();
        let stamped_with = invoice.stamp.clone();

        cancel(&mut invoice, Utc::now()).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Canceled);
        assert_eq!(invoice.stamp, stamped_with);
    }

    #[test]
    fn test_cancel_rejected_for_draft_and_canceled() {
        let mut invoice = draft_invoice();
        let err = cancel(&mut invoice, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(invoice.status, InvoiceStatus::Draft);

        stamp(&mut invoice, fiscal_stamp(), Utc::now()).unwrap();
        cancel(&mut invoice, Utc::now()).unwrap();
        let before = invoice.clone();
        assert!(cancel(&mut invoice, Utc::now()).is_err());
        assert_eq!(invoice, before);
    }

    #[test]
    fn test_stamped_invoice_is_not_editable() {
        let mut invoice = draft_invoice();
        assert!(ensure_editable(&invoice).is_ok());
        assert!(ensure_deletable(&invoice).is_ok());

        stamp(&mut invoice, fiscal_stamp(), Utc::now()).unwrap();
        assert!(ensure_editable(&invoice).is_err());
        assert!(ensure_deletable(&invoice).is_err());
    }
}
