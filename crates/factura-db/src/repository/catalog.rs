//! # Catalog Repository
//!
//! SAT reference catalogs stored in `catalog_entries`, keyed by
//! `(catalog, code)`. The first migration seeds the default dataset; real
//! deployments load the official lists with [`CatalogRepository::upsert`].

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use factura_core::{CatalogEntry, CatalogKind, CatalogService, StoreError};

/// Repository for reference catalog lookups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Entries of one catalog, ordered by code.
    pub async fn entries(&self, kind: CatalogKind) -> DbResult<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(
            "SELECT code, description FROM catalog_entries WHERE catalog = ?1 ORDER BY code",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(catalog = %kind, count = entries.len(), "Loaded catalog");
        Ok(entries)
    }

    /// Inserts or replaces the description of a code.
    pub async fn upsert(&self, kind: CatalogKind, entry: &CatalogEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog_entries (catalog, code, description)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (catalog, code) DO UPDATE SET description = excluded.description
            "#,
        )
        .bind(kind.as_str())
        .bind(&entry.code)
        .bind(&entry.description)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of codes in a catalog.
    pub async fn count(&self, kind: CatalogKind) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries WHERE catalog = ?1")
                .bind(kind.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl CatalogService for CatalogRepository {
    async fn list(&self, kind: CatalogKind) -> Result<Vec<CatalogEntry>, StoreError> {
        Ok(self.entries(kind).await?)
    }
}
