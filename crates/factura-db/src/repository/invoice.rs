//! # Invoice Repository
//!
//! SQLite implementation of the engine's [`DocumentStore`].
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         invoices table                                  │
//! │                                                                         │
//! │  scalar columns (queried, sorted)      JSON columns (loaded whole)      │
//! │  ─────────────────────────────────     ─────────────────────────────    │
//! │  id, owner_id, status                  issuer                           │
//! │  subtotal/total_tax/total_cents        recipient                        │
//! │  series, folio, stamp_uuid             line_items                       │
//! │  issued_at, created_at, updated_at     payment_terms, stamp             │
//! │                                                                         │
//! │  A row is always written whole: update = read, apply changes, write.   │
//! │  Concurrent updates to one invoice: last write wins.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use factura_core::{
    DocumentStore, Invoice, InvoiceChanges, InvoiceStatus, Money, NewInvoice, StoreError,
};

const SELECT_INVOICE: &str = r#"
    SELECT
        id, owner_id, status,
        issuer, recipient, line_items, payment_terms, stamp,
        subtotal_cents, total_tax_cents, total_cents,
        series, folio, issued_at, created_at, updated_at
    FROM invoices
"#;

/// One `invoices` row as stored.
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    owner_id: String,
    status: InvoiceStatus,
    issuer: String,
    recipient: String,
    line_items: String,
    payment_terms: String,
    stamp: Option<String>,
    subtotal_cents: i64,
    total_tax_cents: i64,
    total_cents: i64,
    series: Option<String>,
    folio: Option<String>,
    issued_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> DbResult<Invoice> {
        let stamp = match self.stamp {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(Invoice {
            id: self.id,
            owner_id: self.owner_id,
            issuer: serde_json::from_str(&self.issuer)?,
            recipient: serde_json::from_str(&self.recipient)?,
            line_items: serde_json::from_str(&self.line_items)?,
            payment_terms: serde_json::from_str(&self.payment_terms)?,
            stamp,
            subtotal: Money::from_cents(self.subtotal_cents),
            total_tax: Money::from_cents(self.total_tax_cents),
            total: Money::from_cents(self.total_cents),
            status: self.status,
            issued_at: self.issued_at,
            series: self.series,
            folio: self.folio,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// JSON forms of the sub-record columns.
struct JsonColumns {
    issuer: String,
    recipient: String,
    line_items: String,
    payment_terms: String,
    stamp: Option<String>,
    stamp_uuid: Option<String>,
}

impl JsonColumns {
    fn of(invoice: &Invoice) -> DbResult<Self> {
        let stamp = match &invoice.stamp {
            Some(stamp) => Some(serde_json::to_string(stamp)?),
            None => None,
        };

        Ok(JsonColumns {
            issuer: serde_json::to_string(&invoice.issuer)?,
            recipient: serde_json::to_string(&invoice.recipient)?,
            line_items: serde_json::to_string(&invoice.line_items)?,
            payment_terms: serde_json::to_string(&invoice.payment_terms)?,
            stamp,
            stamp_uuid: invoice.stamp.as_ref().map(|s| s.uuid.to_string()),
        })
    }
}

/// Repository for invoice database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = InvoiceRepository::new(pool);
///
/// // As the engine's document store
/// let service = InvoiceService::new(repo.clone());
///
/// // Or directly
/// let invoice = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// All invoices, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Invoice>> {
        debug!("Listing invoices");

        let query = format!("{SELECT_INVOICE} ORDER BY created_at DESC, id");
        let rows: Vec<InvoiceRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    /// Invoices of one owner, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Invoice>> {
        debug!(owner_id = %owner_id, "Listing invoices by owner");

        let query = format!("{SELECT_INVOICE} WHERE owner_id = ?1 ORDER BY created_at DESC, id");
        let rows: Vec<InvoiceRow> = sqlx::query_as(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let query = format!("{SELECT_INVOICE} WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    /// Inserts a new invoice with a generated ID and fresh timestamps.
    pub async fn insert(&self, new_invoice: NewInvoice) -> DbResult<Invoice> {
        let invoice = new_invoice.into_invoice(Uuid::new_v4().to_string(), Utc::now());
        let json = JsonColumns::of(&invoice)?;

        debug!(id = %invoice.id, owner_id = %invoice.owner_id, "Inserting invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, owner_id, status,
                issuer, recipient, line_items, payment_terms, stamp, stamp_uuid,
                subtotal_cents, total_tax_cents, total_cents,
                series, folio, issued_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17
            )
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.owner_id)
        .bind(invoice.status)
        .bind(&json.issuer)
        .bind(&json.recipient)
        .bind(&json.line_items)
        .bind(&json.payment_terms)
        .bind(&json.stamp)
        .bind(&json.stamp_uuid)
        .bind(invoice.subtotal.cents())
        .bind(invoice.total_tax.cents())
        .bind(invoice.total.cents())
        .bind(&invoice.series)
        .bind(&invoice.folio)
        .bind(invoice.issued_at)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Applies a partial update in one transaction and returns the result.
    pub async fn apply_changes(&self, id: &str, changes: InvoiceChanges) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let query = format!("{SELECT_INVOICE} WHERE id = ?1");
        let row: Option<InvoiceRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut invoice = row
            .ok_or_else(|| DbError::not_found("Invoice", id))?
            .into_invoice()?;

        changes.apply_to(&mut invoice, Utc::now());
        write_row(&mut tx, &invoice).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(id = %id, status = %invoice.status, "Updated invoice");
        Ok(invoice)
    }

    /// Deletes an invoice.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting invoice");

        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }
        Ok(())
    }

    /// Number of invoices in a given state.
    pub async fn count_by_status(&self, status: InvoiceStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE status = ?1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn write_row(tx: &mut Transaction<'_, Sqlite>, invoice: &Invoice) -> DbResult<()> {
    let json = JsonColumns::of(invoice)?;

    sqlx::query(
        r#"
        UPDATE invoices SET
            status = ?2,
            issuer = ?3,
            recipient = ?4,
            line_items = ?5,
            payment_terms = ?6,
            stamp = ?7,
            stamp_uuid = ?8,
            subtotal_cents = ?9,
            total_tax_cents = ?10,
            total_cents = ?11,
            series = ?12,
            folio = ?13,
            issued_at = ?14,
            updated_at = ?15
        WHERE id = ?1
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.status)
    .bind(&json.issuer)
    .bind(&json.recipient)
    .bind(&json.line_items)
    .bind(&json.payment_terms)
    .bind(&json.stamp)
    .bind(&json.stamp_uuid)
    .bind(invoice.subtotal.cents())
    .bind(invoice.total_tax.cents())
    .bind(invoice.total.cents())
    .bind(&invoice.series)
    .bind(&invoice.folio)
    .bind(invoice.issued_at)
    .bind(invoice.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl DocumentStore for InvoiceRepository {
    async fn list(&self) -> Result<Vec<Invoice>, StoreError> {
        Ok(self.list_all().await?)
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self.get_by_id(id).await?)
    }

    async fn create(&self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        Ok(self.insert(invoice).await?)
    }

    async fn update(&self, id: &str, changes: InvoiceChanges) -> Result<Invoice, StoreError> {
        Ok(self.apply_changes(id, changes).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        Ok(self.remove(id).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
