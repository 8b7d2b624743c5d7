//! Data storage layer
//!
//! Provides the warehouse sessions and source storage for the pipeline:
//! - `redshift` - Redshift cluster session over the Postgres wire protocol
//! - `sqlite` - Embedded warehouse for local runs and tests
//! - `objects` - Read-only source object storage (filesystem, S3)
//! - `sql` - SQL abstraction layer for multi-warehouse support
//! - `error` - Unified error type for all backends
//!
//! ## Backend Support
//!
//! A run holds exactly one `Warehouse` session for its whole duration.
//! Statements are written once against `SqlDialect` and rendered for
//! whichever backend the session is connected to.

pub mod error;
pub mod objects;
pub mod redshift;
pub mod sql;
pub mod sqlite;

pub use error::DataError;
pub use redshift::RedshiftWarehouse;
pub use sqlite::SqliteWarehouse;

use crate::core::config::{WarehouseBackend, WarehouseConfig};
use sql::{SqlDialect, dialect_for};

/// Open warehouse session
pub enum Warehouse {
    Sqlite(SqliteWarehouse),
    Redshift(RedshiftWarehouse),
}

impl Warehouse {
    /// Connect to the configured warehouse
    pub async fn connect(config: &WarehouseConfig) -> Result<Self, DataError> {
        match config.backend {
            WarehouseBackend::Sqlite => {
                tracing::info!(path = %config.sqlite_path, "Connecting to SQLite warehouse");
                Ok(Self::Sqlite(
                    SqliteWarehouse::connect(&config.sqlite_path).await?,
                ))
            }
            WarehouseBackend::Redshift => {
                let cluster = config.cluster.as_ref().ok_or_else(|| {
                    DataError::Config("Cluster settings are required for redshift".into())
                })?;
                tracing::info!(host = %cluster.host, port = cluster.port, "Connecting to Redshift");
                Ok(Self::Redshift(RedshiftWarehouse::connect(cluster).await?))
            }
        }
    }

    pub fn backend(&self) -> WarehouseBackend {
        match self {
            Self::Sqlite(_) => WarehouseBackend::Sqlite,
            Self::Redshift(_) => WarehouseBackend::Redshift,
        }
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        dialect_for(self.backend())
    }

    /// Execute one statement, returning the number of rows it affected
    pub async fn execute(&mut self, sql: &str) -> Result<u64, DataError> {
        match self {
            Self::Sqlite(wh) => wh.execute(sql).await,
            Self::Redshift(wh) => wh.execute(sql).await,
        }
    }

    /// Run a query returning a single integer, binding `param` as parameter 1
    pub async fn fetch_count(&mut self, sql: &str, param: Option<&str>) -> Result<i64, DataError> {
        match self {
            Self::Sqlite(wh) => wh.fetch_count(sql, param).await,
            Self::Redshift(wh) => wh.fetch_count(sql, param).await,
        }
    }

    /// Count the rows currently in `table`
    pub async fn count_rows(&mut self, table: &str) -> Result<i64, DataError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.fetch_count(&sql, None).await
    }

    /// Whether `table` exists in the warehouse
    pub async fn table_exists(&mut self, table: &str) -> Result<bool, DataError> {
        let sql = self.dialect().table_exists_query();
        Ok(self.fetch_count(&sql, Some(table)).await? > 0)
    }

    /// Close the session
    pub async fn close(self) -> Result<(), DataError> {
        match self {
            Self::Sqlite(wh) => wh.close().await,
            Self::Redshift(wh) => wh.close().await,
        }
    }
}
