//! # Validation Module
//!
//! Required-field and format rules a CFDI must satisfy before it can be
//! stamped.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Field validators (validate_rfc, validate_postal_code, ...)   │
//! │  ├── One rule, one typed ValidationError                               │
//! │  └── Reusable by a form for inline feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: validate(&invoice) → ValidationReport                        │
//! │  ├── Every rule evaluated, no short-circuit                            │
//! │  └── Errors keyed by the field the form binds to (emisorRfc, ...)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: validate_catalog_codes(&invoice, &snapshot)                  │
//! │  └── Codes must exist in the loaded reference catalogs                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use factura_core::validation::{validate_rfc, validate_postal_code};
//!
//! assert!(validate_rfc("Issuer RFC", "ABC123456XY1").is_ok());
//! assert!(validate_rfc("Issuer RFC", "ABC1234").is_err());
//! assert!(validate_postal_code("Issuer postal code", "06600").is_ok());
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use ts_rs::TS;

use crate::catalog::{CatalogKind, CatalogSnapshot};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Invoice, PaymentTerms, TaxCharge};

/// Result type for single-rule validators.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// RFC shape: 3-4 letters (Ñ and & allowed), 6-digit date, optional homoclave.
///
/// Matched against the raw value: surrounding whitespace is a format error,
/// since the markup carries the field verbatim.
static RFC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z&Ñ]{3,4}[0-9]{6}(?:[A-Z0-9]{3})?$").expect("RFC pattern must compile")
});

// =============================================================================
// Validation Report
// =============================================================================

/// The outcome of validating a document: field key → message.
///
/// An empty report means the document is valid. Keys are stable wire names
/// (`emisorRfc`, `concepto0Cantidad`, ...) so a form can attach each message
/// to its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    /// Checks if no rule was violated.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of violated rules.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a violation under `key`, keeping the first message per key.
    pub fn insert(&mut self, key: impl Into<String>, error: ValidationError) {
        self.errors.entry(key.into()).or_insert_with(|| error.to_string());
    }

    /// Records the error of a single-rule validator, if any.
    pub fn check(&mut self, key: impl Into<String>, result: ValidationResult<()>) {
        if let Err(error) = result {
            self.insert(key, error);
        }
    }

    /// Message for a field, if that field failed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    /// Adds every violation of `other` not already present.
    pub fn merge(&mut self, other: ValidationReport) {
        for (key, message) in other.errors {
            self.errors.entry(key).or_insert(message);
        }
    }
}

// =============================================================================
// Field Validators
// =============================================================================

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validates that a text field is present.
///
/// Blank strings count as missing.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if is_blank(value) {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an RFC (tax ID).
///
/// ## Rules
/// - Must not be blank
/// - 3 letters (companies) or 4 letters (individuals), `&` and `Ñ` allowed
/// - 6 digits (registration date, YYMMDD)
/// - Optional 3-character homoclave
///
/// ## Example
/// ```rust
/// use factura_core::validation::validate_rfc;
///
/// assert!(validate_rfc("Recipient RFC", "XAXX010101000").is_ok());
/// assert!(validate_rfc("Recipient RFC", "xaxx010101000").is_err());
/// ```
pub fn validate_rfc(field: &str, value: &str) -> ValidationResult<()> {
    validate_required(field, value)?;

    if !RFC_PATTERN.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "expected 3-4 letters, 6 digits and an optional 3-character homoclave"
                .to_string(),
        });
    }
    Ok(())
}

/// Validates a postal code: exactly 5 ASCII digits, nothing around them.
pub fn validate_postal_code(field: &str, value: &str) -> ValidationResult<()> {
    if value.len() != 5 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be exactly 5 digits".to_string(),
        });
    }
    Ok(())
}

/// Validates a line quantity (> 0).
pub fn validate_quantity(field: &str, quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price (> 0).
pub fn validate_unit_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a derived amount: it must not have saturated while computed.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_saturated() {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the charges of one line.
///
/// ## Rules
/// - At least one charge
/// - At most one charge per kind
/// - No negative rate
pub fn validate_line_taxes(field: &str, taxes: &[TaxCharge]) -> ValidationResult<()> {
    if taxes.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for charge in taxes {
        if !seen.insert(charge.kind) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: charge.kind.to_string(),
            });
        }
        if charge.rate.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: format!("{field} {} rate", charge.kind),
            });
        }
    }
    Ok(())
}

/// Validates the exchange rate: required and > 0 unless the currency is MXN.
pub fn validate_exchange_rate(terms: &PaymentTerms) -> ValidationResult<()> {
    if is_blank(&terms.currency) || terms.is_local_currency() {
        return Ok(());
    }
    match terms.exchange_rate {
        None => Err(ValidationError::Required {
            field: "Exchange rate".to_string(),
        }),
        Some(rate) if rate <= Decimal::ZERO => Err(ValidationError::MustBePositive {
            field: "Exchange rate".to_string(),
        }),
        Some(_) => Ok(()),
    }
}

// =============================================================================
// Document Validator
// =============================================================================

/// Validates a whole document, reporting every violated rule at once.
///
/// Pure and deterministic. Totals are not re-derived here, so callers
/// recompute them before validating; only their range is checked.
pub fn validate(invoice: &Invoice) -> ValidationReport {
    let mut report = ValidationReport::default();

    let issuer = &invoice.issuer;
    report.check("emisorRfc", validate_rfc("Issuer RFC", &issuer.tax_id));
    report.check("emisorNombre", validate_required("Issuer name", &issuer.name));
    report.check(
        "emisorRegimenFiscal",
        validate_required("Issuer tax regime", &issuer.tax_regime),
    );
    report.check(
        "emisorCodigoPostal",
        validate_required("Issuer postal code", &issuer.postal_code)
            .and_then(|_| validate_postal_code("Issuer postal code", &issuer.postal_code)),
    );

    let recipient = &invoice.recipient;
    report.check("receptorRfc", validate_rfc("Recipient RFC", &recipient.tax_id));
    report.check(
        "receptorNombre",
        validate_required("Recipient name", &recipient.name),
    );
    report.check(
        "receptorUsoCFDI",
        validate_required("Recipient CFDI usage", &recipient.cfdi_usage),
    );
    if let Some(postal_code) = recipient.fiscal_postal_code.as_deref() {
        report.check(
            "receptorDomicilioFiscal",
            validate_postal_code("Recipient fiscal postal code", postal_code),
        );
    }

    if invoice.line_items.is_empty() {
        report.insert(
            "conceptos",
            ValidationError::Required {
                field: "At least one line item".to_string(),
            },
        );
    }
    let mut line_ids = HashSet::new();
    for (index, line) in invoice.line_items.iter().enumerate() {
        let label = format!("Line {}", index + 1);
        if !line_ids.insert(line.id.as_str()) {
            report.insert(
                format!("concepto{index}Id"),
                ValidationError::Duplicate {
                    field: format!("{label} id"),
                    value: line.id.clone(),
                },
            );
        }
        report.check(
            format!("concepto{index}ClaveProductoServicio"),
            validate_required(&format!("{label} product code"), &line.product_code),
        );
        report.check(
            format!("concepto{index}Descripcion"),
            validate_required(&format!("{label} description"), &line.description),
        );
        report.check(
            format!("concepto{index}Cantidad"),
            validate_quantity(&format!("{label} quantity"), line.quantity),
        );
        report.check(
            format!("concepto{index}PrecioUnitario"),
            validate_unit_price(&format!("{label} unit price"), line.unit_price),
        );
        report.check(
            format!("concepto{index}Impuestos"),
            validate_line_taxes(&format!("{label} taxes"), &line.taxes),
        );
        report.check(
            format!("concepto{index}Importe"),
            line.taxes
                .iter()
                .try_fold((), |_, charge| {
                    validate_amount(&format!("{label} {} amount", charge.kind), charge.amount)
                })
                .and_then(|_| validate_amount(&format!("{label} amount"), line.amount)),
        );
    }

    let terms = &invoice.payment_terms;
    report.check(
        "metodoPago",
        validate_required("Payment method", &terms.payment_method),
    );
    report.check("formaPago", validate_required("Payment form", &terms.payment_form));
    report.check("moneda", validate_required("Currency", &terms.currency));
    report.check("tipoCambio", validate_exchange_rate(terms));

    report.check(
        "total",
        validate_amount("Subtotal", invoice.subtotal)
            .and_then(|_| validate_amount("Total tax", invoice.total_tax))
            .and_then(|_| validate_amount("Total", invoice.total)),
    );

    report
}

/// Reports codes that are absent from the loaded reference catalogs.
///
/// Blank codes are skipped; [`validate`] already reports them as missing.
pub fn validate_catalog_codes(invoice: &Invoice, catalogs: &CatalogSnapshot) -> ValidationReport {
    let mut report = ValidationReport::default();

    let check = |report: &mut ValidationReport, key: String, field: &str, kind, code: &str| {
        let code = code.trim();
        if !code.is_empty() && !catalogs.contains(kind, code) {
            report.insert(
                key,
                ValidationError::UnknownCode {
                    field: field.to_string(),
                    code: code.to_string(),
                },
            );
        }
    };

    check(
        &mut report,
        "emisorRegimenFiscal".to_string(),
        "Issuer tax regime",
        CatalogKind::TaxRegimes,
        &invoice.issuer.tax_regime,
    );
    check(
        &mut report,
        "receptorUsoCFDI".to_string(),
        "Recipient CFDI usage",
        CatalogKind::CfdiUsages,
        &invoice.recipient.cfdi_usage,
    );
    if let Some(regime) = invoice.recipient.tax_regime.as_deref() {
        check(
            &mut report,
            "receptorRegimenFiscal".to_string(),
            "Recipient tax regime",
            CatalogKind::TaxRegimes,
            regime,
        );
    }
    check(
        &mut report,
        "metodoPago".to_string(),
        "Payment method",
        CatalogKind::PaymentMethods,
        &invoice.payment_terms.payment_method,
    );
    check(
        &mut report,
        "formaPago".to_string(),
        "Payment form",
        CatalogKind::PaymentForms,
        &invoice.payment_terms.payment_form,
    );
    for (index, line) in invoice.line_items.iter().enumerate() {
        check(
            &mut report,
            format!("concepto{index}ClaveProductoServicio"),
            &format!("Line {} product code", index + 1),
            CatalogKind::ProductServices,
            &line.product_code,
        );
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::types::{InvoiceDraft, Issuer, LineItem, Recipient, TaxKind, TaxRate};
    use chrono::Utc;

    fn line(code: &str, description: &str, quantity: i64, cents: i64) -> LineItem {
        LineItem::new(
            code,
            description,
            Decimal::from(quantity),
            Money::from_cents(cents),
            vec![TaxCharge::with_default_rate(TaxKind::ValueAdded)],
        )
    }

    fn valid_invoice() -> Invoice {
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
                fiscal_postal_code: Some("06600".to_string()),
                tax_regime: Some("616".to_string()),
            },
            line_items: vec![line("01010101", "Servicio", 1, 10000)],
            payment_terms: PaymentTerms::new("PUE", "03"),
            issued_at: Utc::now(),
            series: None,
            folio: None,
        };
        Invoice::from_draft("owner-1", draft, Utc::now())
    }

    #[test]
    fn test_valid_invoice_passes() {
        let report = validate(&valid_invoice());
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn test_rfc_pattern() {
        assert!(validate_rfc("RFC", "ABC123456XY1").is_ok());
        assert!(validate_rfc("RFC", "ABCD123456").is_ok());
        assert!(validate_rfc("RFC", "ÑA&B800101AB1").is_ok());
        assert!(validate_rfc("RFC", "ABC1234").is_err());
        assert!(validate_rfc("RFC", "AB123456").is_err());
        assert!(validate_rfc("RFC", "ABC123456XY").is_err());
        assert!(matches!(
            validate_rfc("RFC", "  "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_rfc_pattern_compiles() {
        assert!(RFC_PATTERN.is_match("EKU9003173C9"));
    }

    #[test]
    fn test_padded_fields_rejected() {
        assert!(matches!(
            validate_rfc("RFC", " EKU9003173C9 "),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(validate_postal_code("CP", "06600 ").is_err());

        let mut invoice = valid_invoice();
        invoice.issuer.tax_id = " EKU9003173C9 ".to_string();
        invoice.recipient.fiscal_postal_code = Some("06600 ".to_string());

        let report = validate(&invoice);
        assert!(report.contains("emisorRfc"));
        assert!(report.contains("receptorDomicilioFiscal"));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_duplicate_line_ids() {
        let mut invoice = valid_invoice();
        let copy = invoice.line_items[0].clone();
        invoice.line_items.push(copy);

        let report = validate(&invoice);
        assert!(!report.contains("concepto0Id"));
        assert!(report.get("concepto1Id").unwrap().contains("is duplicated"));
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_saturated_amounts_rejected() {
        let mut invoice = valid_invoice();
        invoice.line_items[0].quantity = Decimal::from(100_000_000_000_000_000_i64);
        crate::tax::recompute(&mut invoice);

        assert!(invoice.total.cents() > 0);
        let report = validate(&invoice);
        assert_eq!(report.get("concepto0Importe"), Some("Line 1 amount is too large"));
        assert!(report.contains("total"));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_invalid_rfc_keyed_by_party() {
        let mut invoice = valid_invoice();
        invoice.issuer.tax_id = "ABC1234".to_string();
        invoice.recipient.tax_id = "ABC1234".to_string();

        let report = validate(&invoice);
        assert!(report.contains("emisorRfc"));
        assert!(report.contains("receptorRfc"));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_postal_codes() {
        assert!(validate_postal_code("CP", "01000").is_ok());
        assert!(validate_postal_code("CP", "1000").is_err());
        assert!(validate_postal_code("CP", "0100A").is_err());

        let mut invoice = valid_invoice();
        invoice.recipient.fiscal_postal_code = None;
        assert!(validate(&invoice).is_valid());

        invoice.recipient.fiscal_postal_code = Some("123".to_string());
        invoice.issuer.postal_code = String::new();
        let report = validate(&invoice);
        assert!(report.contains("receptorDomicilioFiscal"));
        assert_eq!(
            report.get("emisorCodigoPostal"),
            Some("Issuer postal code is required")
        );
    }

    #[test]
    fn test_all_rules_reported_at_once() {
        let mut invoice = valid_invoice();
        invoice.issuer.name = " ".to_string();
        invoice.recipient.cfdi_usage = String::new();
        invoice.line_items = vec![];
        invoice.payment_terms = PaymentTerms {
            payment_method: String::new(),
            payment_form: String::new(),
            currency: String::new(),
            exchange_rate: None,
        };

        let report = validate(&invoice);
        let keys: Vec<&str> = report.errors.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "conceptos",
                "emisorNombre",
                "formaPago",
                "metodoPago",
                "moneda",
                "receptorUsoCFDI",
            ]
        );
    }

    #[test]
    fn test_line_item_rules() {
        let mut invoice = valid_invoice();
        invoice.line_items = vec![line("", "", 0, 0)];
        invoice.line_items[0].taxes.clear();

        let report = validate(&invoice);
        assert!(report.contains("concepto0ClaveProductoServicio"));
        assert!(report.contains("concepto0Descripcion"));
        assert_eq!(
            report.get("concepto0Cantidad"),
            Some("Line 1 quantity must be greater than zero")
        );
        assert!(report.contains("concepto0PrecioUnitario"));
        assert!(report.contains("concepto0Impuestos"));
        assert_eq!(report.len(), 5);
    }

    #[test]
    fn test_duplicate_and_negative_charges() {
        let vat = TaxCharge::with_default_rate(TaxKind::ValueAdded);
        assert!(matches!(
            validate_line_taxes("Line 1 taxes", &[vat.clone(), vat]),
            Err(ValidationError::Duplicate { .. })
        ));

        let negative = TaxCharge::new(TaxKind::SpecialProduction, TaxRate::new(Decimal::new(-8, 0)));
        assert!(matches!(
            validate_line_taxes("Line 1 taxes", &[negative]),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_exchange_rate_only_for_foreign_currency() {
        let mut invoice = valid_invoice();
        invoice.payment_terms.currency = "USD".to_string();
        assert!(validate(&invoice).contains("tipoCambio"));

        invoice.payment_terms.exchange_rate = Some(Decimal::ZERO);
        assert!(validate(&invoice).contains("tipoCambio"));

        invoice.payment_terms.exchange_rate = Some(Decimal::new(1705, 2));
        assert!(validate(&invoice).is_valid());
    }

    #[test]
    fn test_shuffling_lines_only_rekeys_errors() {
        let mut invoice = valid_invoice();
        invoice.line_items = vec![
            line("", "Primera", 1, 100),
            line("01010101", "Segunda", 0, 100),
            line("01010101", "", 1, 0),
        ];
        let original = validate(&invoice);

        invoice.line_items.rotate_left(1);
        let shuffled = validate(&invoice);

        assert_eq!(original.is_valid(), shuffled.is_valid());
        assert_eq!(original.len(), shuffled.len());

        // Same rules per line, at the rotated positions.
        let suffixes = |report: &ValidationReport, index: usize| -> Vec<String> {
            let prefix = format!("concepto{index}");
            report
                .errors
                .keys()
                .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
                .collect()
        };
        assert_eq!(suffixes(&original, 0), suffixes(&shuffled, 2));
        assert_eq!(suffixes(&original, 1), suffixes(&shuffled, 0));
        assert_eq!(suffixes(&original, 2), suffixes(&shuffled, 1));
    }

    #[test]
    fn test_catalog_codes() {
        let snapshot = StaticCatalog::default().snapshot();
        let mut invoice = valid_invoice();
        assert!(validate_catalog_codes(&invoice, &snapshot).is_valid());

        invoice.payment_terms.payment_form = "77".to_string();
        invoice.line_items[0].product_code = "99999999".to_string();
        let report = validate_catalog_codes(&invoice, &snapshot);
        assert_eq!(
            report.get("formaPago"),
            Some("Payment form '77' is not in the catalog")
        );
        assert!(report.contains("concepto0ClaveProductoServicio"));
        assert_eq!(report.len(), 2);

        invoice.recipient.tax_regime = Some("999".to_string());
        assert_eq!(validate_catalog_codes(&invoice, &snapshot).len(), 3);
    }
}
