//! Redshift warehouse session
//!
//! Connects over the Postgres wire protocol. Holds a single connection for the
//! whole run and issues every statement through the simple-query protocol, so
//! each one commits on its own as it would from an interactive session.

use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{ConnectOptions, Connection};
use tracing::log::LevelFilter;

use super::error::DataError;
use crate::core::config::ClusterConfig;

/// Redshift warehouse session
pub struct RedshiftWarehouse {
    conn: PgConnection,
}

impl RedshiftWarehouse {
    /// Connect to the cluster described by `config`
    pub async fn connect(config: &ClusterConfig) -> Result<Self, DataError> {
        if config.host.trim().is_empty() {
            return Err(DataError::Config("Cluster host is required".into()));
        }

        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.db_name)
            .username(&config.db_user)
            .password(&config.db_password)
            .ssl_mode(PgSslMode::Prefer)
            .log_statements(LevelFilter::Trace);

        let conn = options.connect().await.map_err(DataError::from_redshift)?;

        tracing::debug!(
            host = %config.host,
            port = config.port,
            db_name = %config.db_name,
            "Redshift warehouse connected"
        );
        Ok(Self { conn })
    }

    /// Execute one statement, returning the number of rows it affected
    pub async fn execute(&mut self, sql: &str) -> Result<u64, DataError> {
        let result = sqlx::raw_sql(sql)
            .execute(&mut self.conn)
            .await
            .map_err(DataError::from_redshift)?;
        Ok(result.rows_affected())
    }

    /// Run a query returning a single integer
    pub async fn fetch_count(&mut self, sql: &str, param: Option<&str>) -> Result<i64, DataError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        if let Some(param) = param {
            query = query.bind(param);
        }
        query
            .fetch_one(&mut self.conn)
            .await
            .map_err(DataError::from_redshift)
    }

    /// Close the connection gracefully
    pub async fn close(self) -> Result<(), DataError> {
        self.conn.close().await.map_err(DataError::from_redshift)?;
        tracing::debug!("Redshift warehouse closed");
        Ok(())
    }
}
