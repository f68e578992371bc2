//! # factura-core: Pure CFDI Invoice Engine
//!
//! This crate is the **heart** of Factura. It holds the data model of a
//! Mexican electronic invoice (CFDI), the arithmetic and validation rules it
//! must satisfy, its lifecycle, and its canonical XML form.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Factura Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (invoice form / list)               │   │
//! │  │    Capture ──► Totals ──► Validate ──► Stamp ──► Download      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ts-rs bindings                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ factura-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌─────────┐ ┌──────┐  │   │
//! │  │   │  types  │ │   tax   │ │ validation │ │lifecycle│ │ xml  │  │   │
//! │  │   │ Invoice │ │recompute│ │  validate  │ │ stamp   │ │ CFDI │  │   │
//! │  │   │ Money   │ │ totals  │ │  report    │ │ cancel  │ │  4.0 │  │   │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └─────────┘ └──────┘  │   │
//! │  │                                                                 │   │
//! │  │   service (workflow) ── store / catalog (async contracts)      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  factura-db (Database Layer)                    │   │
//! │  │          SQLite document store, catalogs, migrations            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Invoice, LineItem, TaxCharge, FiscalStamp, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`tax`] - Line amounts, charges and document totals
//! - [`validation`] - Field rules and the validation report
//! - [`lifecycle`] - draft → stamped → canceled
//! - [`xml`] - CFDI 4.0 markup
//! - [`catalog`] - SAT reference catalogs
//! - [`store`] - Document store contract
//! - [`service`] - The invoice workflow over a store
//! - [`summary`] - Dashboard figures
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use factura_core::money::Money;
//! use factura_core::tax::compute_line;
//! use factura_core::types::{TaxCharge, TaxKind, TaxRate};
//! use rust_decimal::Decimal;
//!
//! let vat = TaxCharge::new(TaxKind::ValueAdded, TaxRate::from_percent(16));
//! let line = compute_line(Decimal::from(2), Money::from_cents(5000), &[vat]);
//!
//! assert_eq!(line.amount.cents(), 10_000);
//! assert_eq!(line.taxes[0].amount.cents(), 1_600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod service;
pub mod store;
pub mod summary;
pub mod tax;
pub mod types;
pub mod validation;
pub mod xml;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{CatalogEntry, CatalogKind, CatalogService, CatalogSnapshot, StaticCatalog};
pub use error::{CoreError, CoreResult, StoreError, ValidationError};
pub use lifecycle::Action;
pub use money::Money;
pub use service::{CancelConfirmation, InvoiceService, XmlExport};
pub use store::{DocumentStore, MemoryStore};
pub use summary::InvoiceSummary;
pub use types::*;
pub use validation::ValidationReport;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency assumed when none is given, and the one that needs no
/// exchange rate.
pub const DEFAULT_CURRENCY: &str = "MXN";
