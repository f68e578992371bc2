//! # Error Types
//!
//! Domain-specific error types for factura-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  factura-core errors (this file)                                       │
//! │  ├── CoreError        - Workflow failures (what callers match on)      │
//! │  ├── ValidationError  - One violated field rule                        │
//! │  └── StoreError       - Opaque failure from the document store         │
//! │                                                                         │
//! │  factura-db errors (separate crate)                                    │
//! │  └── DbError          - SQLite failures, converted into StoreError     │
//! │                                                                         │
//! │  Flow: DbError → StoreError → CoreError::Store → caller                │
//! │        ValidationError → ValidationReport → CoreError::Validation      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Validation failures are data: every violated rule is reported at once
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::lifecycle::Action;
use crate::types::InvoiceStatus;
use crate::validation::ValidationReport;

// =============================================================================
// Core Error
// =============================================================================

/// Invoice workflow errors.
///
/// Every variant is recoverable: the caller corrects the input, refreshes
/// its view of the document, or retries the store call on its own terms.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The document failed validation.
    ///
    /// ## When This Occurs
    /// - Saving a draft with missing or malformed fields
    /// - Applying a fiscal stamp to a document that is not complete
    ///
    /// The report carries every violated rule, keyed by field.
    #[error("Invoice has {} validation error(s)", .0.len())]
    Validation(ValidationReport),

    /// The requested operation is not permitted in the current state.
    ///
    /// ## User Workflow
    /// ```text
    /// Cancel (draft invoice)
    ///      │
    ///      ▼
    /// InvoiceStatus::Draft.transition(Action::Cancel)
    ///      │
    ///      ▼
    /// InvalidTransition { from: Draft, action: Cancel }
    ///      │
    ///      ▼
    /// UI shows: "Cannot cancel an invoice that is draft"
    /// ```
    #[error("Cannot {action} an invoice that is {from}")]
    InvalidTransition { from: InvoiceStatus, action: Action },

    /// The document store has no invoice with this id.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// A cancellation was confirmed for a different invoice.
    #[error("Cancellation of invoice {0} was not confirmed")]
    CancellationNotConfirmed(String),

    /// The document store failed. No retry is attempted here.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The CFDI markup could not be produced.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Returns the validation report if this is a validation failure.
    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            CoreError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single violated field rule.
///
/// The `Display` text is what ends up in a [`ValidationReport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A derived amount does not fit in centavos.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Invalid format (e.g., malformed RFC or postal code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two VAT charges on one line).
    #[error("{field} '{value}' is duplicated")]
    Duplicate { field: String, value: String },

    /// Code is not present in the reference catalog.
    #[error("{field} '{code}' is not in the catalog")]
    UnknownCode { field: String, code: String },
}

// =============================================================================
// Store Error
// =============================================================================

/// Failure reported by the external document store or catalog service.
///
/// The engine does not interpret the cause; it only carries the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Store error: {message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    /// Creates a store error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::InvalidTransition {
            from: InvoiceStatus::Draft,
            action: Action::Cancel,
        };
        assert_eq!(err.to_string(), "Cannot cancel an invoice that is draft");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "Issuer RFC".to_string(),
        };
        assert_eq!(err.to_string(), "Issuer RFC is required");

        let err = ValidationError::UnknownCode {
            field: "Payment form".to_string(),
            code: "77".to_string(),
        };
        assert_eq!(err.to_string(), "Payment form '77' is not in the catalog");
    }

    #[test]
    fn test_store_error_converts_to_core_error() {
        let core_err: CoreError = StoreError::new("connection reset").into();
        assert!(matches!(core_err, CoreError::Store(_)));
        assert_eq!(core_err.to_string(), "Store error: connection reset");
    }

    #[test]
    fn test_validation_report_accessor() {
        let mut report = ValidationReport::default();
        report.insert(
            "moneda",
            ValidationError::Required {
                field: "Currency".to_string(),
            },
        );
        let err = CoreError::Validation(report);
        assert_eq!(err.to_string(), "Invoice has 1 validation error(s)");
        assert!(err.validation_report().is_some());
    }
}
