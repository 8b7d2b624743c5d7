//! Verifier: row counts for every table

use std::fmt;

use super::schema::ALL_TABLES;
use crate::data::{DataError, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}

impl fmt::Display for TableCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {} has {} records.", self.table, self.rows)
    }
}

pub fn count_statements() -> Vec<String> {
    ALL_TABLES
        .iter()
        .map(|table| format!("SELECT COUNT(*) FROM {}", table.name))
        .collect()
}

/// Count the rows of all seven tables, in creation order
///
/// Counts are read live; zero rows is reported, not treated as a failure.
pub async fn report_counts(warehouse: &mut Warehouse) -> Result<Vec<TableCount>, DataError> {
    let mut counts = Vec::with_capacity(ALL_TABLES.len());
    for table in ALL_TABLES {
        let rows = warehouse.count_rows(table.name).await?;
        tracing::debug!(table = table.name, rows, "Counted rows");
        counts.push(TableCount {
            table: table.name,
            rows,
        });
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_line() {
        let count = TableCount {
            table: "songplays",
            rows: 333,
        };
        assert_eq!(count.to_string(), "table songplays has 333 records.");
    }

    #[test]
    fn test_counts_cover_all_tables() {
        let statements = count_statements();
        assert_eq!(statements.len(), 7);
        assert!(statements.contains(&"SELECT COUNT(*) FROM songs".to_string()));
    }
}
