//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Process startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env() / DbConfig::new(path) ← Configure pool settings  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.invoices()  ──► InvoiceRepository (DocumentStore)                  │
//! │  db.catalogs()  ──► CatalogRepository (CatalogService)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so that readers
//! (invoice list, dashboard) don't block the writer (save, stamp).

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::invoice::InvoiceRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database file used when `FACTURA_DB_PATH` is unset.
pub const DEFAULT_DATABASE_PATH: &str = "factura.db";

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/factura.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = DbConfig::new("./data/factura.db");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = DbConfig::in_memory();
    /// let db = Database::new(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    /// Reads the configuration from `FACTURA_DB_*` environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FACTURA_DB_PATH` | `factura.db` |
    /// | `FACTURA_DB_MAX_CONNECTIONS` | 5 |
    /// | `FACTURA_DB_MIN_CONNECTIONS` | 1 |
    /// | `FACTURA_DB_CONNECT_TIMEOUT_SECS` | 30 |
    /// | `FACTURA_DB_RUN_MIGRATIONS` | true |
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`DbConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: FromStr>(name: &str, value: Option<String>, default: T) -> DbResult<T> {
            match value {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| DbError::InvalidConfig(name.to_string())),
            }
        }

        let path = lookup("FACTURA_DB_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let defaults = DbConfig::new(path);

        let max_connections = parse(
            "FACTURA_DB_MAX_CONNECTIONS",
            lookup("FACTURA_DB_MAX_CONNECTIONS"),
            defaults.max_connections,
        )?;
        let min_connections = parse(
            "FACTURA_DB_MIN_CONNECTIONS",
            lookup("FACTURA_DB_MIN_CONNECTIONS"),
            defaults.min_connections,
        )?;
        let timeout_secs = parse(
            "FACTURA_DB_CONNECT_TIMEOUT_SECS",
            lookup("FACTURA_DB_CONNECT_TIMEOUT_SECS"),
            defaults.connect_timeout.as_secs(),
        )?;
        let run_migrations = parse(
            "FACTURA_DB_RUN_MIGRATIONS",
            lookup("FACTURA_DB_RUN_MIGRATIONS"),
            defaults.run_migrations,
        )?;

        if max_connections == 0 {
            return Err(DbError::InvalidConfig("FACTURA_DB_MAX_CONNECTIONS".to_string()));
        }
        if min_connections > max_connections {
            return Err(DbError::InvalidConfig("FACTURA_DB_MIN_CONNECTIONS".to_string()));
        }

        Ok(defaults
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(timeout_secs))
            .run_migrations(run_migrations))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: repositories share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
/// let service = InvoiceService::new(db.invoices());
/// let drafts = service.list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Arguments
    /// * `config` - Database configuration
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = DbConfig::new("./factura.db");
    /// let db = Database::new(config).await?;
    /// ```
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // Build connection options
        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            // WAL mode: Better concurrent read performance
            // Readers don't block writers, writers don't block readers
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: Good balance of durability and speed
            // Data is safe from corruption, may lose last transaction on crash
            .synchronous(SqliteSynchronous::Normal)
            // Enable foreign key constraints
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            // Create file if it doesn't exist
            .create_if_missing(true);

        debug!("Connection options configured");

        // Build the pool
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        // Run migrations if enabled
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// ## What This Does
    /// - Applies all pending migrations in order
    /// - Tracks applied migrations in `_sqlx_migrations` table
    /// - Idempotent: safe to run multiple times
    ///
    /// ## When To Call
    /// - Automatically called by `new()` if `run_migrations` is true
    /// - Manually call when migrations are disabled in config
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// ## Usage
    /// For advanced queries not covered by repositories.
    /// Prefer using repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the invoice repository (the document store).
    ///
    /// ## Example
    /// ```rust,ignore
    /// let invoice = db.invoices().get("uuid-here").await?;
    /// ```
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Returns the reference catalog repository.
    pub fn catalogs(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// ## When To Call
    /// - On application shutdown
    /// - When switching databases (rare)
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    ///
    /// ## Returns
    /// * `true` - Database is responsive
    /// * `false` - Database is unavailable
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory();
        let db = Database::new(config).await.unwrap();

        assert!(db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/factura-test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = DbConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.run_migrations);
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = DbConfig::from_lookup(|name| match name {
            "FACTURA_DB_PATH" => Some("/var/lib/factura/facturas.db".to_string()),
            "FACTURA_DB_MAX_CONNECTIONS" => Some("8".to_string()),
            "FACTURA_DB_CONNECT_TIMEOUT_SECS" => Some(" 12 ".to_string()),
            "FACTURA_DB_RUN_MIGRATIONS" => Some("false".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/factura/facturas.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.connect_timeout, Duration::from_secs(12));
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let err = DbConfig::from_lookup(|name| {
            (name == "FACTURA_DB_MAX_CONNECTIONS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(ref name) if name == "FACTURA_DB_MAX_CONNECTIONS"));

        let err = DbConfig::from_lookup(|name| match name {
            "FACTURA_DB_MAX_CONNECTIONS" => Some("2".to_string()),
            "FACTURA_DB_MIN_CONNECTIONS" => Some("4".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }
}
