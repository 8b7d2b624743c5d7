//! SQLite warehouse session
//!
//! Embedded warehouse for local runs and tests. Holds a single connection for
//! the whole run; every statement commits on its own, except the staging load
//! which inserts each table's rows inside one transaction.
//!
//! SQLite has no server-side bulk copy, so it also exposes `insert_rows` for
//! the client-side staging loader.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::log::LevelFilter;

use super::error::DataError;
use super::sql::SqlValue;
use crate::core::constants::{LOCAL_COPY_BATCH_ROWS, SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MEMORY_PATH};

/// SQLite warehouse session
pub struct SqliteWarehouse {
    conn: SqliteConnection,
}

impl SqliteWarehouse {
    /// Open (creating if missing) the database at `path`
    ///
    /// `:memory:` opens a private in-memory database that lives as long as
    /// this session.
    pub async fn connect(path: &str) -> Result<Self, DataError> {
        let options = if path == SQLITE_MEMORY_PATH {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(DataError::from_sqlite)?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        let options = options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .log_statements(LevelFilter::Trace);

        let conn = options.connect().await.map_err(DataError::from_sqlite)?;

        tracing::debug!(path, "SQLite warehouse connected");
        Ok(Self { conn })
    }

    /// Execute one statement, returning the number of rows it affected
    pub async fn execute(&mut self, sql: &str) -> Result<u64, DataError> {
        let result = sqlx::raw_sql(sql)
            .execute(&mut self.conn)
            .await
            .map_err(DataError::from_sqlite)?;
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
            .map_err(DataError::from_sqlite)
    }

    /// Insert rows into `table` atomically
    ///
    /// Rows are sent as multi-row INSERTs of at most `LOCAL_COPY_BATCH_ROWS`
    /// rows, all inside one transaction: either every row lands or none does.
    pub async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, DataError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let mut tx = self.conn.begin().await.map_err(DataError::from_sqlite)?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(LOCAL_COPY_BATCH_ROWS) {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                table,
                columns.join(", "),
                vec![row_placeholders.as_str(); chunk.len()].join(", ")
            );

            let mut query = sqlx::query(&sql);
            for row in chunk {
                if row.len() != columns.len() {
                    return Err(DataError::Config(format!(
                        "Row has {} values but {} has {} columns",
                        row.len(),
                        table,
                        columns.len()
                    )));
                }
                for value in row {
                    query = match value {
                        SqlValue::Null => query.bind(None::<String>),
                        SqlValue::Integer(v) => query.bind(*v),
                        SqlValue::Real(v) => query.bind(*v),
                        SqlValue::Text(v) => query.bind(v.as_str()),
                    };
                }
            }

            let result = query
                .execute(&mut *tx)
                .await
                .map_err(DataError::from_sqlite)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(DataError::from_sqlite)?;
        tracing::trace!(table, rows = inserted, "Rows inserted");
        Ok(inserted)
    }

    /// Close the connection gracefully
    pub async fn close(self) -> Result<(), DataError> {
        self.conn.close().await.map_err(DataError::from_sqlite)?;
        tracing::debug!("SQLite warehouse closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_session_keeps_state() {
        let mut wh = SqliteWarehouse::connect(SQLITE_MEMORY_PATH).await.unwrap();
        wh.execute("CREATE TABLE t (a INTEGER, b TEXT)").await.unwrap();
        wh.execute("INSERT INTO t VALUES (1, 'x')").await.unwrap();
        let n = wh.fetch_count("SELECT COUNT(*) FROM t", None).await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn test_insert_rows_batches() {
        let mut wh = SqliteWarehouse::connect(SQLITE_MEMORY_PATH).await.unwrap();
        wh.execute("CREATE TABLE t (a INTEGER, b TEXT, c REAL)")
            .await
            .unwrap();

        let rows: Vec<Vec<SqlValue>> = (0..(LOCAL_COPY_BATCH_ROWS as i64 * 2 + 7))
            .map(|i| {
                vec![
                    SqlValue::Integer(i),
                    SqlValue::Text(format!("row-{}", i)),
                    SqlValue::Null,
                ]
            })
            .collect();

        let inserted = wh.insert_rows("t", &["a", "b", "c"], &rows).await.unwrap();
        assert_eq!(inserted, rows.len() as u64);

        let nulls = wh
            .fetch_count("SELECT COUNT(*) FROM t WHERE c IS NULL", None)
            .await
            .unwrap();
        assert_eq!(nulls, rows.len() as i64);
    }

    #[tokio::test]
    async fn test_insert_rows_is_atomic() {
        let mut wh = SqliteWarehouse::connect(SQLITE_MEMORY_PATH).await.unwrap();
        wh.execute("CREATE TABLE t (a INTEGER NOT NULL)").await.unwrap();

        let rows = vec![vec![SqlValue::Integer(1)], vec![SqlValue::Null]];
        assert!(wh.insert_rows("t", &["a"], &rows).await.is_err());

        let n = wh.fetch_count("SELECT COUNT(*) FROM t", None).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_fetch_count_with_param() {
        let mut wh = SqliteWarehouse::connect(SQLITE_MEMORY_PATH).await.unwrap();
        wh.execute("CREATE TABLE present (a INTEGER)").await.unwrap();
        let sql = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?";
        assert_eq!(wh.fetch_count(sql, Some("present")).await.unwrap(), 1);
        assert_eq!(wh.fetch_count(sql, Some("absent")).await.unwrap(), 0);
    }
}
