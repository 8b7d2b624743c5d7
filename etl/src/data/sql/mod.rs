//! SQL abstraction layer for multi-warehouse support
//!
//! This module provides the vocabulary the schema and transformation
//! statements are written in, and renders it for each warehouse engine
//! (Redshift, SQLite).

mod dialect;
mod redshift_dialect;
mod sqlite_dialect;

pub use dialect::SqlDialect;
pub use redshift_dialect::RedshiftDialect;
pub use sqlite_dialect::SqliteDialect;

use crate::core::config::WarehouseBackend;

/// Logical column type, rendered per dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Double,
    Char(u16),
    VarChar(u16),
    NVarChar(u16),
    Timestamp,
}

/// Calendar field extracted from a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Hour,
    /// Day of month
    Day,
    /// ISO week number
    Week,
    Month,
    Year,
    /// Day of week, 0 = Sunday
    Weekday,
}

/// Row distribution across warehouse slices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistStyle {
    Auto,
    Even,
    Key(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Compound,
    Interleaved,
}

/// Row ordering key for scan efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub kind: SortKind,
    pub columns: &'static [&'static str],
}

/// Physical layout hint for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub dist: DistStyle,
    pub sort: Option<SortKey>,
}

/// Dynamically typed value bound into a statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Get the SQL dialect for a warehouse backend
pub fn dialect_for(backend: WarehouseBackend) -> &'static dyn SqlDialect {
    match backend {
        WarehouseBackend::Redshift => &RedshiftDialect,
        WarehouseBackend::Sqlite => &SqliteDialect,
    }
}
