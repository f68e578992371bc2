//! # Domain Types
//!
//! Core domain types of a CFDI (comprobante fiscal digital).
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Invoice                                    │
//! │  id · owner_id · status · issued_at · series/folio · totals             │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌─────────────────────────────┐ │
//! │  │    Issuer     │  │   Recipient   │  │  PaymentTerms               │ │
//! │  │  RFC, name    │  │  RFC, name    │  │  method (PUE/PPD)           │ │
//! │  │  tax regime   │  │  CFDI usage   │  │  form (01, 03, ...)         │ │
//! │  │  postal code  │  │  postal code? │  │  currency, exchange rate?   │ │
//! │  └───────────────┘  └───────────────┘  └─────────────────────────────┘ │
//! │                                                                         │
//! │  ┌──────────────────────────────────┐  ┌─────────────────────────────┐ │
//! │  │  LineItem (1..n)                 │  │  FiscalStamp (0..1)         │ │
//! │  │  product code, description       │  │  UUID, stamped_at           │ │
//! │  │  quantity × unit_price = amount  │  │  SAT certificate number     │ │
//! │  │  TaxCharge (1..3, one per kind)  │  │  CFD seal, SAT seal         │ │
//! │  └──────────────────────────────────┘  └─────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived fields (`LineItem::amount`, `TaxCharge::amount` and the three
//! invoice totals) are written by [`crate::tax::recompute`] and nothing else.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::DEFAULT_CURRENCY;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate as a decimal percentage (16 = 16%).
///
/// ## Why Decimal Percent?
/// SAT rates are published with up to 6 decimals as a fraction
/// (`0.106667` for ISR retention), i.e. 4 decimals as a percentage.
/// Basis points cannot represent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Creates a tax rate from a decimal percentage.
    #[inline]
    pub const fn new(percent: Decimal) -> Self {
        TaxRate(percent)
    }

    /// Creates a tax rate from a whole percentage.
    pub fn from_percent(percent: u32) -> Self {
        TaxRate(Decimal::from(percent))
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Returns the rate as a fraction (`rate / 100`).
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if the rate is below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Kind
// =============================================================================

/// The closed set of taxes a line item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TaxKind {
    /// IVA - value-added tax (transferred).
    #[serde(rename = "IVA")]
    ValueAdded,
    /// ISR - income tax (withheld).
    #[serde(rename = "ISR")]
    IncomeWithholding,
    /// IEPS - special tax on production and services (transferred).
    #[serde(rename = "IEPS")]
    SpecialProduction,
}

impl TaxKind {
    /// All kinds, in catalog order.
    pub const ALL: [TaxKind; 3] = [
        TaxKind::ValueAdded,
        TaxKind::IncomeWithholding,
        TaxKind::SpecialProduction,
    ];

    /// SAT `c_Impuesto` code.
    pub const fn sat_code(&self) -> &'static str {
        match self {
            TaxKind::IncomeWithholding => "001",
            TaxKind::ValueAdded => "002",
            TaxKind::SpecialProduction => "003",
        }
    }

    /// Short name used on screens and in the JSON payload.
    pub const fn name(&self) -> &'static str {
        match self {
            TaxKind::ValueAdded => "IVA",
            TaxKind::IncomeWithholding => "ISR",
            TaxKind::SpecialProduction => "IEPS",
        }
    }

    /// Withheld taxes go under `Retenciones` in the CFDI, the rest under `Traslados`.
    pub const fn is_withholding(&self) -> bool {
        matches!(self, TaxKind::IncomeWithholding)
    }

    /// Rate the capture form proposes when the kind is added to a line.
    pub fn default_rate(&self) -> TaxRate {
        match self {
            TaxKind::ValueAdded => TaxRate::from_percent(16),
            TaxKind::IncomeWithholding => TaxRate::from_percent(10),
            TaxKind::SpecialProduction => TaxRate::from_percent(8),
        }
    }
}

impl fmt::Display for TaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Parties
// =============================================================================

/// The party issuing the invoice (emisor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Issuer {
    /// RFC (tax ID).
    pub tax_id: String,
    /// Legal name.
    pub name: String,
    /// Fiscal regime code (c_RegimenFiscal, e.g. "601").
    pub tax_regime: String,
    /// Postal code of the place of issuance.
    pub postal_code: String,
}

/// The party receiving the invoice (receptor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Recipient {
    /// RFC (tax ID).
    pub tax_id: String,
    /// Legal name.
    pub name: String,
    /// CFDI usage code (c_UsoCFDI, e.g. "G03").
    pub cfdi_usage: String,
    /// Fiscal domicile postal code.
    pub fiscal_postal_code: Option<String>,
    /// Recipient's fiscal regime code.
    pub tax_regime: Option<String>,
}

// =============================================================================
// Line Items
// =============================================================================

/// One tax line attached to a line item (impuesto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxCharge {
    pub kind: TaxKind,
    #[ts(as = "String")]
    pub rate: TaxRate,
    /// Derived: `round2(line.amount × rate / 100)`.
    pub amount: Money,
}

impl TaxCharge {
    /// Creates a charge whose amount is computed later by the tax calculator.
    pub fn new(kind: TaxKind, rate: TaxRate) -> Self {
        TaxCharge {
            kind,
            rate,
            amount: Money::zero(),
        }
    }

    /// Creates a charge of the given kind at its usual rate.
    pub fn with_default_rate(kind: TaxKind) -> Self {
        TaxCharge::new(kind, kind.default_rate())
    }
}

/// One billable product/service entry (concepto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Opaque identifier, unique within the document.
    pub id: String,
    /// Product/service classification code (c_ClaveProdServ).
    pub product_code: String,
    pub description: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    pub unit_price: Money,
    /// Derived: `round2(quantity × unit_price)`.
    pub amount: Money,
    pub taxes: Vec<TaxCharge>,
}

impl LineItem {
    /// Creates a line item with a fresh id; derived amounts start at zero.
    pub fn new(
        product_code: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Money,
        taxes: Vec<TaxCharge>,
    ) -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            product_code: product_code.into(),
            description: description.into(),
            quantity,
            unit_price,
            amount: Money::zero(),
            taxes,
        }
    }

    /// Sum of this line's charges.
    pub fn tax_total(&self) -> Money {
        self.taxes.iter().map(|t| t.amount).sum()
    }
}

// =============================================================================
// Payment Terms
// =============================================================================

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Payment method, form and currency (información de pago).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentTerms {
    /// c_MetodoPago ("PUE" / "PPD").
    pub payment_method: String,
    /// c_FormaPago ("01" cash, "03" transfer, ...).
    pub payment_form: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Required only when the currency is not MXN.
    #[ts(as = "Option<String>")]
    pub exchange_rate: Option<Decimal>,
}

impl PaymentTerms {
    /// Creates payment terms in Mexican pesos.
    pub fn new(payment_method: impl Into<String>, payment_form: impl Into<String>) -> Self {
        PaymentTerms {
            payment_method: payment_method.into(),
            payment_form: payment_form.into(),
            currency: default_currency(),
            exchange_rate: None,
        }
    }

    /// Checks if the document is in the local currency.
    pub fn is_local_currency(&self) -> bool {
        self.currency.trim() == DEFAULT_CURRENCY
    }

    /// The exchange rate, ignored when the currency is MXN.
    pub fn effective_exchange_rate(&self) -> Option<Decimal> {
        if self.is_local_currency() {
            None
        } else {
            self.exchange_rate
        }
    }
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms::new("", "")
    }
}

// =============================================================================
// Fiscal Stamp
// =============================================================================

/// Timbre fiscal digital, assigned by the external stamping authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalStamp {
    /// Folio fiscal.
    #[ts(as = "String")]
    pub uuid: Uuid,
    #[ts(as = "String")]
    pub stamped_at: DateTime<Utc>,
    /// Certificate number of the SAT.
    pub sat_certificate_number: String,
    /// Seal of the issuer over the document (SelloCFD).
    pub cfd_seal: String,
    /// Seal of the SAT over the stamp (SelloSAT).
    pub sat_seal: String,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Being captured; editable and deletable.
    Draft,
    /// Stamped by the authority; only cancellation is allowed.
    Stamped,
    /// Canceled; terminal.
    Canceled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Stamped => "stamped",
            InvoiceStatus::Canceled => "canceled",
        }
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The editable content of an invoice, as assembled by the capture form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    pub issuer: Issuer,
    pub recipient: Recipient,
    pub line_items: Vec<LineItem>,
    pub payment_terms: PaymentTerms,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub series: Option<String>,
    pub folio: Option<String>,
}

/// A CFDI document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// User who owns the document.
    pub owner_id: String,
    pub issuer: Issuer,
    pub recipient: Recipient,
    pub line_items: Vec<LineItem>,
    pub payment_terms: PaymentTerms,
    /// Present once stamped; kept after cancellation for audit.
    pub stamp: Option<FiscalStamp>,
    pub subtotal: Money,
    pub total_tax: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub series: Option<String>,
    pub folio: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds an unsaved draft document (empty id, zero totals).
    ///
    /// The store assigns the id and the timestamps on `create`.
    pub fn from_draft(owner_id: impl Into<String>, draft: InvoiceDraft, now: DateTime<Utc>) -> Self {
        Invoice {
            id: String::new(),
            owner_id: owner_id.into(),
            issuer: draft.issuer,
            recipient: draft.recipient,
            line_items: draft.line_items,
            payment_terms: draft.payment_terms,
            stamp: None,
            subtotal: Money::zero(),
            total_tax: Money::zero(),
            total: Money::zero(),
            status: InvoiceStatus::Draft,
            issued_at: draft.issued_at,
            series: draft.series,
            folio: draft.folio,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the editable content, leaving identity, status and stamp alone.
    pub fn replace_content(&mut self, draft: InvoiceDraft) {
        self.issuer = draft.issuer;
        self.recipient = draft.recipient;
        self.line_items = draft.line_items;
        self.payment_terms = draft.payment_terms;
        self.issued_at = draft.issued_at;
        self.series = draft.series;
        self.folio = draft.folio;
    }
}

/// Input for creating an invoice in the document store.
///
/// Everything but the identity and the audit timestamps, which the store owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub owner_id: String,
    pub issuer: Issuer,
    pub recipient: Recipient,
    pub line_items: Vec<LineItem>,
    pub payment_terms: PaymentTerms,
    pub stamp: Option<FiscalStamp>,
    pub subtotal: Money,
    pub total_tax: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub series: Option<String>,
    pub folio: Option<String>,
}

impl From<Invoice> for NewInvoice {
    fn from(invoice: Invoice) -> Self {
        NewInvoice {
            owner_id: invoice.owner_id,
            issuer: invoice.issuer,
            recipient: invoice.recipient,
            line_items: invoice.line_items,
            payment_terms: invoice.payment_terms,
            stamp: invoice.stamp,
            subtotal: invoice.subtotal,
            total_tax: invoice.total_tax,
            total: invoice.total,
            status: invoice.status,
            issued_at: invoice.issued_at,
            series: invoice.series,
            folio: invoice.folio,
        }
    }
}

impl NewInvoice {
    /// Materializes the stored document once the store has assigned identity.
    pub fn into_invoice(self, id: String, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            owner_id: self.owner_id,
            issuer: self.issuer,
            recipient: self.recipient,
            line_items: self.line_items,
            payment_terms: self.payment_terms,
            stamp: self.stamp,
            subtotal: self.subtotal,
            total_tax: self.total_tax,
            total: self.total,
            status: self.status,
            issued_at: self.issued_at,
            series: self.series,
            folio: self.folio,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an invoice in the document store.
///
/// `None` leaves a field untouched. `series`/`folio` are doubly optional so a
/// label can be cleared (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceChanges {
    pub issuer: Option<Issuer>,
    pub recipient: Option<Recipient>,
    pub line_items: Option<Vec<LineItem>>,
    pub payment_terms: Option<PaymentTerms>,
    pub stamp: Option<FiscalStamp>,
    pub subtotal: Option<Money>,
    pub total_tax: Option<Money>,
    pub total: Option<Money>,
    pub status: Option<InvoiceStatus>,
    pub issued_at: Option<DateTime<Utc>>,
    pub series: Option<Option<String>>,
    pub folio: Option<Option<String>>,
}

impl InvoiceChanges {
    /// Changes that rewrite the editable content and derived totals.
    pub fn content_of(invoice: &Invoice) -> Self {
        InvoiceChanges {
            issuer: Some(invoice.issuer.clone()),
            recipient: Some(invoice.recipient.clone()),
            line_items: Some(invoice.line_items.clone()),
            payment_terms: Some(invoice.payment_terms.clone()),
            subtotal: Some(invoice.subtotal),
            total_tax: Some(invoice.total_tax),
            total: Some(invoice.total),
            issued_at: Some(invoice.issued_at),
            series: Some(invoice.series.clone()),
            folio: Some(invoice.folio.clone()),
            ..InvoiceChanges::default()
        }
    }

    /// Changes that record a lifecycle transition (status and stamp).
    pub fn transition_of(invoice: &Invoice) -> Self {
        InvoiceChanges {
            status: Some(invoice.status),
            stamp: invoice.stamp.clone(),
            ..InvoiceChanges::default()
        }
    }

    /// Applies the changes to a loaded document and bumps `updated_at`.
    pub fn apply_to(self, invoice: &mut Invoice, now: DateTime<Utc>) {
        if let Some(issuer) = self.issuer {
            invoice.issuer = issuer;
        }
        if let Some(recipient) = self.recipient {
            invoice.recipient = recipient;
        }
        if let Some(line_items) = self.line_items {
            invoice.line_items = line_items;
        }
        if let Some(payment_terms) = self.payment_terms {
            invoice.payment_terms = payment_terms;
        }
        if let Some(stamp) = self.stamp {
            invoice.stamp = Some(stamp);
        }
        if let Some(subtotal) = self.subtotal {
            invoice.subtotal = subtotal;
        }
        if let Some(total_tax) = self.total_tax {
            invoice.total_tax = total_tax;
        }
        if let Some(total) = self.total {
            invoice.total = total;
        }
        if let Some(status) = self.status {
            invoice.status = status;
        }
        if let Some(issued_at) = self.issued_at {
            invoice.issued_at = issued_at;
        }
        if let Some(series) = self.series {
            invoice.series = series;
        }
        if let Some(folio) = self.folio {
            invoice.folio = folio;
        }
        invoice.updated_at = now;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_fraction() {
        assert_eq!(TaxRate::from_percent(16).fraction(), Decimal::new(16, 2));
        assert!(!TaxRate::zero().is_negative());
        assert!(TaxRate::new(Decimal::new(-1, 0)).is_negative());
    }

    #[test]
    fn test_tax_kind_codes() {
        assert_eq!(TaxKind::ValueAdded.sat_code(), "002");
        assert_eq!(TaxKind::IncomeWithholding.sat_code(), "001");
        assert_eq!(TaxKind::SpecialProduction.sat_code(), "003");
        assert!(TaxKind::IncomeWithholding.is_withholding());
        assert!(!TaxKind::ValueAdded.is_withholding());
    }

    #[test]
    fn test_tax_kind_serializes_as_short_name() {
        let json = serde_json::to_string(&TaxKind::SpecialProduction).unwrap();
        assert_eq!(json, "\"IEPS\"");
        let kind: TaxKind = serde_json::from_str("\"ISR\"").unwrap();
        assert_eq!(kind, TaxKind::IncomeWithholding);
    }

    #[test]
    fn test_invoice_status_default_and_wire_name() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Canceled).unwrap(),
            "\"canceled\""
        );
    }

    #[test]
    fn test_payment_terms_exchange_rate_ignored_for_mxn() {
        let mut terms = PaymentTerms::new("PUE", "03");
        terms.exchange_rate = Some(Decimal::new(1712, 2));
        assert_eq!(terms.effective_exchange_rate(), None);

        terms.currency = "USD".to_string();
        assert_eq!(terms.effective_exchange_rate(), Some(Decimal::new(1712, 2)));
    }

    #[test]
    fn test_payment_terms_currency_defaults_when_missing() {
        let terms: PaymentTerms = serde_json::from_str(
            r#"{"payment_method":"PUE","payment_form":"01","exchange_rate":null}"#,
        )
        .unwrap();
        assert_eq!(terms.currency, "MXN");
    }

    #[test]
    fn test_changes_clear_series() {
        let now = Utc::now();
        let draft = InvoiceDraft {
            issuer: Issuer::default(),
            recipient: Recipient::default(),
            line_items: vec![],
            payment_terms: PaymentTerms::default(),
            issued_at: now,
            series: Some("A".to_string()),
            folio: Some("7".to_string()),
        };
        let mut invoice = Invoice::from_draft("owner-1", draft, now);

        let changes = InvoiceChanges {
            series: Some(None),
            ..InvoiceChanges::default()
        };
        changes.apply_to(&mut invoice, now);

        assert_eq!(invoice.series, None);
        assert_eq!(invoice.folio.as_deref(), Some("7"));
    }
}
