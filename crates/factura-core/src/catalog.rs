//! # Reference Catalogs
//!
//! SAT code lists (tax regimes, CFDI usages, payment methods and forms,
//! product/service codes) as an injected lookup service.
//!
//! ```text
//! ┌──────────────────┐      list(kind)      ┌─────────────────────────────┐
//! │ CatalogSnapshot  │ ───────────────────► │ impl CatalogService         │
//! │ (in memory)      │ ◄─────────────────── │  • CatalogRepository (db)   │
//! │ contains(k, c)   │  Vec<CatalogEntry>   │  • StaticCatalog (default)  │
//! └──────────────────┘                      └─────────────────────────────┘
//! ```
//!
//! `StaticCatalog` is the sample dataset for environments without the real
//! catalog. The db crate seeds the same rows on its first migration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use ts_rs::TS;

use crate::error::StoreError;

// =============================================================================
// Catalog Kind
// =============================================================================

/// The five catalogs an invoice draws its codes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// c_RegimenFiscal
    TaxRegimes,
    /// c_UsoCFDI
    CfdiUsages,
    /// c_MetodoPago
    PaymentMethods,
    /// c_FormaPago
    PaymentForms,
    /// c_ClaveProdServ
    ProductServices,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 5] = [
        CatalogKind::TaxRegimes,
        CatalogKind::CfdiUsages,
        CatalogKind::PaymentMethods,
        CatalogKind::PaymentForms,
        CatalogKind::ProductServices,
    ];

    /// Stable name used as the `catalog` column value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::TaxRegimes => "regimenes_fiscales",
            CatalogKind::CfdiUsages => "usos_cfdi",
            CatalogKind::PaymentMethods => "metodos_pago",
            CatalogKind::PaymentForms => "formas_pago",
            CatalogKind::ProductServices => "productos_servicios",
        }
    }

    /// Parses a stored catalog name.
    pub fn from_name(name: &str) -> Option<Self> {
        CatalogKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{code, description}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
}

impl CatalogEntry {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        CatalogEntry {
            code: code.into(),
            description: description.into(),
        }
    }
}

// =============================================================================
// Catalog Service
// =============================================================================

/// Lookup service for reference catalogs.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// All entries of a catalog, ordered by code.
    async fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError>;
}

/// Built-in sample dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl StaticCatalog {
    /// Entries of one catalog.
    pub fn entries(&self, kind: CatalogKind) -> Vec<CatalogEntry> {
        let rows: &[(&str, &str)] = match kind {
            CatalogKind::TaxRegimes => &[
                ("601", "General de Ley Personas Morales"),
                ("603", "Personas Morales con Fines no Lucrativos"),
                ("605", "Sueldos y Salarios e Ingresos Asimilados a Salarios"),
                ("606", "Arrendamiento"),
                ("612", "Personas Físicas con Actividades Empresariales y Profesionales"),
                ("616", "Sin obligaciones fiscales"),
                ("626", "Régimen Simplificado de Confianza"),
            ],
            CatalogKind::CfdiUsages => &[
                ("G01", "Adquisición de mercancías"),
                ("G02", "Devoluciones, descuentos o bonificaciones"),
                ("G03", "Gastos en general"),
                ("P01", "Por definir"),
            ],
            CatalogKind::PaymentMethods => &[
                ("PPD", "Pago en parcialidades o diferido"),
                ("PUE", "Pago en una sola exhibición"),
            ],
            CatalogKind::PaymentForms => &[
                ("01", "Efectivo"),
                ("02", "Cheque nominativo"),
                ("03", "Transferencia electrónica de fondos"),
                ("04", "Tarjeta de crédito"),
                ("28", "Tarjeta de débito"),
                ("99", "Por definir"),
            ],
            CatalogKind::ProductServices => &[
                ("01010101", "No existe en el catálogo"),
                ("43231500", "Software funcional específico"),
                ("80101500", "Servicios de consultoría de negocios"),
                ("81111500", "Ingeniería de software o hardware"),
                ("84111500", "Servicios contables"),
            ],
        };

        rows.iter()
            .map(|(code, description)| CatalogEntry::new(*code, *description))
            .collect()
    }

    /// Loads every catalog without going through the async interface.
    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot::from_entries(
            CatalogKind::ALL
                .into_iter()
                .map(|kind| (kind, self.entries(kind))),
        )
    }
}

#[async_trait]
impl CatalogService for StaticCatalog {
    async fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(self.entries(kind))
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// All five catalogs loaded in memory, for membership checks.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    codes: HashMap<CatalogKind, BTreeSet<String>>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from already-fetched entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CatalogKind, Vec<CatalogEntry>)>,
    {
        let mut codes: HashMap<CatalogKind, BTreeSet<String>> = HashMap::new();
        for (kind, list) in entries {
            codes
                .entry(kind)
                .or_default()
                .extend(list.into_iter().map(|entry| entry.code));
        }
        CatalogSnapshot { codes }
    }

    /// Fetches every catalog from the service. The first failure aborts.
    pub async fn load<C>(service: &C) -> Result<Self, StoreError>
    where
        C: CatalogService + ?Sized,
    {
        let mut entries = Vec::with_capacity(CatalogKind::ALL.len());
        for kind in CatalogKind::ALL {
            entries.push((kind, service.list(kind).await?));
        }
        tracing::debug!(catalogs = entries.len(), "Loaded reference catalogs");
        Ok(CatalogSnapshot::from_entries(entries))
    }

    /// Checks if `code` exists in the catalog of `kind`.
    pub fn contains(&self, kind: CatalogKind, code: &str) -> bool {
        self.codes
            .get(&kind)
            .map_or(false, |codes| codes.contains(code))
    }

    /// Number of codes loaded for a catalog.
    pub fn count(&self, kind: CatalogKind) -> usize {
        self.codes.get(&kind).map_or(0, BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingCatalog;

    #[async_trait]
    impl CatalogService for FailingCatalog {
        async fn list(&self, _kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError> {
            Err(StoreError::new("catalog offline"))
        }
    }

    #[test]
    fn test_catalog_names_round_trip() {
        for kind in CatalogKind::ALL {
            assert_eq!(CatalogKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(CatalogKind::from_name("monedas"), None);
    }

    #[test]
    fn test_static_catalog_sizes() {
        let snapshot = StaticCatalog.snapshot();
        assert_eq!(snapshot.count(CatalogKind::TaxRegimes), 7);
        assert_eq!(snapshot.count(CatalogKind::CfdiUsages), 4);
        assert_eq!(snapshot.count(CatalogKind::PaymentMethods), 2);
        assert_eq!(snapshot.count(CatalogKind::PaymentForms), 6);
        assert_eq!(snapshot.count(CatalogKind::ProductServices), 5);
    }

    #[tokio::test]
    async fn test_load_snapshot_from_service() {
        let snapshot = CatalogSnapshot::load(&StaticCatalog).await.unwrap();
        assert!(snapshot.contains(CatalogKind::PaymentMethods, "PUE"));
        assert!(snapshot.contains(CatalogKind::PaymentForms, "28"));
        assert!(!snapshot.contains(CatalogKind::PaymentForms, "PUE"));
    }

    #[tokio::test]
    async fn test_load_propagates_store_error() {
        let err = CatalogSnapshot::load(&FailingCatalog).await.unwrap_err();
        assert_eq!(err.message, "catalog offline");
    }
}
