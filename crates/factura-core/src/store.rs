//! # Document Store Contract
//!
//! The persistence boundary the engine writes through. The engine never
//! assigns ids or audit timestamps; the store does.
//!
//! Implementations:
//! - `factura_db::InvoiceRepository` (SQLite)
//! - [`MemoryStore`] (tests, demos)
//!
//! Concurrent writers to the same document are resolved by the store.
//! Both implementations here are last-write-wins.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Invoice, InvoiceChanges, NewInvoice};

/// CRUD access to invoices.
///
/// Any failure surfaces as a [`StoreError`]; retries are the
/// implementation's business.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All invoices, newest first.
    async fn list(&self) -> Result<Vec<Invoice>, StoreError>;

    /// One invoice, or `None` if the id is unknown.
    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError>;

    /// Persists a new invoice, assigning its id and timestamps.
    async fn create(&self, invoice: NewInvoice) -> Result<Invoice, StoreError>;

    /// Applies a partial update and bumps `updated_at`.
    async fn update(&self, id: &str, changes: InvoiceChanges) -> Result<Invoice, StoreError>;

    /// Removes an invoice.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-process store backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    invoices: Mutex<Vec<Invoice>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Invoice>>, StoreError> {
        self.invoices
            .lock()
            .map_err(|_| StoreError::new("memory store lock poisoned"))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Invoice>, StoreError> {
        let mut invoices = self.lock()?.clone();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self.lock()?.iter().find(|inv| inv.id == id).cloned())
    }

    async fn create(&self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        let invoice = invoice.into_invoice(Uuid::new_v4().to_string(), Utc::now());
        self.lock()?.push(invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, id: &str, changes: InvoiceChanges) -> Result<Invoice, StoreError> {
        let mut invoices = self.lock()?;
        let invoice = invoices
            .iter_mut()
            .find(|inv| inv.id == id)
            .ok_or_else(|| StoreError::new(format!("invoice {id} does not exist")))?;
        changes.apply_to(invoice, Utc::now());
        Ok(invoice.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut invoices = self.lock()?;
        let before = invoices.len();
        invoices.retain(|inv| inv.id != id);
        if invoices.len() == before {
            return Err(StoreError::new(format!("invoice {id} does not exist")));
        }
        Ok(())
    }
}
