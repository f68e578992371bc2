//! # factura-db: Database Layer for Factura
//!
//! SQLite persistence for the invoice engine. The engine in `factura-core`
//! only knows the [`DocumentStore`](factura_core::DocumentStore) and
//! [`CatalogService`](factura_core::CatalogService) contracts; this crate
//! implements both on top of sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Factura Data Flow                                │
//! │                                                                         │
//! │  InvoiceService::apply_stamp(id, stamp)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    factura-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────────┐  ┌─────────────┐  │   │
//! │  │   │   Database    │    │   Repositories    │  │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                   │  │ (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepository │  │             │  │   │
//! │  │   │ SqlitePool    │◄───│ CatalogRepository │  │ 001_initial │  │   │
//! │  │   └───────────────┘    └───────────────────┘  └─────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (FACTURA_DB_PATH, default ./factura.db)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Invoice and catalog repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factura_core::{CatalogSnapshot, InvoiceService};
//! use factura_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let catalogs = CatalogSnapshot::load(&db.catalogs()).await?;
//! let service = InvoiceService::new(db.invoices()).with_catalogs(catalogs);
//!
//! let invoice = service.create_draft("user-1", draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::invoice::InvoiceRepository;
