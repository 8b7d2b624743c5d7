//! SQL dialect trait for multi-warehouse support
//!
//! This trait defines the interface for generating engine-specific SQL syntax.

use super::{ColumnType, DatePart, TableLayout};

/// SQL dialect trait for generating warehouse-specific SQL
///
/// The warehouse engines differ in:
/// - Column type names and auto-increment columns
/// - Physical layout hints (distribution and sort keys)
/// - Epoch conversion and calendar extraction
/// - `DROP TABLE ... CASCADE` support
/// - Catalog lookups and parameter placeholders
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - Redshift: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Render a logical column type
    fn column_type(&self, ty: ColumnType) -> String;

    /// Full column definition for an auto-incrementing surrogate primary key
    ///
    /// - Redshift: `INT IDENTITY(0, 1) NOT NULL PRIMARY KEY`
    /// - SQLite: `INTEGER PRIMARY KEY AUTOINCREMENT`
    fn identity_primary_key(&self) -> &'static str;

    /// Table attributes appended after the closing parenthesis of CREATE TABLE
    ///
    /// Functionally inert; empty when the engine has no such hints.
    fn table_layout(&self, layout: &TableLayout) -> String;

    /// Idempotent DROP TABLE statement
    fn drop_table(&self, table: &str) -> String;

    /// Convert an epoch-milliseconds column to an absolute timestamp
    ///
    /// - Redshift: `TIMESTAMP WITH TIME ZONE 'epoch' + col * INTERVAL '0.001 second'`
    /// - SQLite: `strftime('%Y-%m-%d %H:%M:%f', col / 1000.0, 'unixepoch')`
    fn epoch_millis_to_timestamp(&self, col: &str) -> String;

    /// Extract a calendar field from a timestamp column as an integer
    fn date_part(&self, part: DatePart, col: &str) -> String;

    /// Query returning the number of tables named by parameter 1
    fn table_exists_query(&self) -> String;

    /// Generate ORDER BY term with NULL handling
    ///
    /// - Redshift: `col DESC NULLS LAST`
    /// - SQLite: Doesn't support NULLS FIRST/LAST everywhere, emulated with CASE
    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String;
}
