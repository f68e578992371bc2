//! # Invoice Workflow
//!
//! Orchestrates calculator, validator, state machine and store in the only
//! order that keeps a document consistent.
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐
//! │  draft   │──►│ recompute │──►│ validate │──►│ transition │──►│  store  │
//! │ (caller) │   │  (tax)    │   │ (+codes) │   │ (lifecycle)│   │ (trait) │
//! └──────────┘   └───────────┘   └──────────┘   └────────────┘   └─────────┘
//! ```
//!
//! Store failures propagate unchanged; nothing here retries.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{self, Action};
use crate::store::DocumentStore;
use crate::summary::{summarize, InvoiceSummary};
use crate::tax::recompute;
use crate::types::{FiscalStamp, Invoice, InvoiceChanges, InvoiceDraft, NewInvoice};
use crate::validation::{validate, validate_catalog_codes};
use crate::xml;

/// Explicit user confirmation that an invoice should be canceled.
///
/// Cancellation cannot be undone, so the UI builds one of these only after
/// the user confirms, and only for the invoice they confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelConfirmation {
    invoice_id: String,
}

impl CancelConfirmation {
    pub fn for_invoice(invoice_id: impl Into<String>) -> Self {
        CancelConfirmation {
            invoice_id: invoice_id.into(),
        }
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }
}

/// CFDI markup ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlExport {
    pub file_name: String,
    pub content: String,
}

/// Invoice use cases over a [`DocumentStore`].
pub struct InvoiceService<S> {
    store: S,
    catalogs: Option<CatalogSnapshot>,
}

impl<S: DocumentStore> InvoiceService<S> {
    /// Creates a service without catalog membership checks.
    pub fn new(store: S) -> Self {
        InvoiceService {
            store,
            catalogs: None,
        }
    }

    /// Also reject codes missing from these catalogs.
    pub fn with_catalogs(mut self, catalogs: CatalogSnapshot) -> Self {
        self.catalogs = Some(catalogs);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn check(&self, invoice: &Invoice) -> CoreResult<()> {
        let mut report = validate(invoice);
        if let Some(catalogs) = &self.catalogs {
            report.merge(validate_catalog_codes(invoice, catalogs));
        }
        if !report.is_valid() {
            warn!(invoice_id = %invoice.id, errors = report.len(), "Invoice failed validation");
            return Err(CoreError::Validation(report));
        }
        Ok(())
    }

    async fn load(&self, id: &str) -> CoreResult<Invoice> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))
    }

    /// All invoices, newest first.
    pub async fn list(&self) -> CoreResult<Vec<Invoice>> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, id: &str) -> CoreResult<Invoice> {
        self.load(id).await
    }

    /// Saves a new draft after recomputing and validating it.
    pub async fn create_draft(&self, owner_id: &str, draft: InvoiceDraft) -> CoreResult<Invoice> {
        let mut invoice = Invoice::from_draft(owner_id, draft, Utc::now());
        recompute(&mut invoice);
        self.check(&invoice)?;

        let created = self.store.create(NewInvoice::from(invoice)).await?;
        info!(invoice_id = %created.id, total = %created.total, "Draft created");
        Ok(created)
    }

    /// Replaces the content of a draft.
    pub async fn update_draft(&self, id: &str, draft: InvoiceDraft) -> CoreResult<Invoice> {
        let mut invoice = self.load(id).await?;
        lifecycle::ensure_editable(&invoice)?;

        invoice.replace_content(draft);
        recompute(&mut invoice);
        self.check(&invoice)?;

        let updated = self
            .store
            .update(id, InvoiceChanges::content_of(&invoice))
            .await?;
        debug!(invoice_id = %id, total = %updated.total, "Draft updated");
        Ok(updated)
    }

    /// Records the stamp returned by the stamping authority.
    pub async fn apply_stamp(&self, id: &str, stamp: FiscalStamp) -> CoreResult<Invoice> {
        let mut invoice = self.load(id).await?;
        invoice.status.transition(Action::Stamp)?;

        // Derived amounts are written back with the stamp so the stored
        // document matches the markup that was stamped.
        recompute(&mut invoice);
        self.check(&invoice)?;
        lifecycle::stamp(&mut invoice, stamp, Utc::now())?;

        let changes = InvoiceChanges {
            status: Some(invoice.status),
            stamp: invoice.stamp.clone(),
            ..InvoiceChanges::content_of(&invoice)
        };
        Ok(self.store.update(id, changes).await?)
    }

    /// Cancels a stamped invoice. The stamp stays on the document.
    pub async fn cancel(&self, id: &str, confirmation: CancelConfirmation) -> CoreResult<Invoice> {
        if confirmation.invoice_id() != id {
            return Err(CoreError::CancellationNotConfirmed(id.to_string()));
        }

        let mut invoice = self.load(id).await?;
        lifecycle::cancel(&mut invoice, Utc::now())?;

        Ok(self
            .store
            .update(id, InvoiceChanges::transition_of(&invoice))
            .await?)
    }

    /// Deletes a draft. Stamped and canceled invoices are kept.
    pub async fn delete_draft(&self, id: &str) -> CoreResult<()> {
        let invoice = self.load(id).await?;
        lifecycle::ensure_deletable(&invoice)?;

        self.store.delete(id).await?;
        info!(invoice_id = %id, "Draft deleted");
        Ok(())
    }

    /// Serializes a stored invoice for download.
    pub async fn export_xml(&self, id: &str) -> CoreResult<XmlExport> {
        let invoice = self.load(id).await?;
        Ok(XmlExport {
            file_name: xml::export_file_name(&invoice),
            content: xml::serialize(&invoice)?,
        })
    }

    /// Dashboard figures over every stored invoice.
    pub async fn summary(&self) -> CoreResult<InvoiceSummary> {
        let invoices = self.store.list().await?;
        Ok(summarize(&invoices))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
