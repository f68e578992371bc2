//! # Repository Module
//!
//! Database repository implementations for Factura.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Engine Contracts                    │
//! │                                                                         │
//! │  InvoiceService (factura-core)                                         │
//! │       │                                                                 │
//! │       │  store.update(id, changes)                                     │
//! │       ▼                                                                 │
//! │  DocumentStore ◄── implemented by ── InvoiceRepository                 │
//! │  CatalogService ◄─ implemented by ── CatalogRepository                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InvoiceRepository`] - Invoice documents
//! - [`CatalogRepository`] - SAT reference catalogs
//!
//! [`InvoiceRepository`]: invoice::InvoiceRepository
//! [`CatalogRepository`]: catalog::CatalogRepository

pub mod catalog;
pub mod invoice;
