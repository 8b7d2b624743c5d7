//! SQLite SQL dialect implementation

use super::{ColumnType, DatePart, SqlDialect, TableLayout};

/// SQLite SQL dialect
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, ty: ColumnType) -> String {
        // Only the affinity matters to SQLite
        match ty {
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                "INTEGER".to_string()
            }
            ColumnType::Double => "REAL".to_string(),
            ColumnType::Char(_)
            | ColumnType::VarChar(_)
            | ColumnType::NVarChar(_)
            | ColumnType::Timestamp => "TEXT".to_string(),
        }
    }

    fn identity_primary_key(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn table_layout(&self, _layout: &TableLayout) -> String {
        String::new()
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", table)
    }

    fn epoch_millis_to_timestamp(&self, col: &str) -> String {
        // Timestamps are stored as UTC text with millisecond precision
        format!("strftime('%Y-%m-%d %H:%M:%f', {} / 1000.0, 'unixepoch')", col)
    }

    fn date_part(&self, part: DatePart, col: &str) -> String {
        match part {
            DatePart::Hour => format!("CAST(strftime('%H', {}) AS INTEGER)", col),
            DatePart::Day => format!("CAST(strftime('%d', {}) AS INTEGER)", col),
            // ISO week: the week's Thursday decides which year and week it belongs to
            DatePart::Week => format!(
                "((CAST(strftime('%j', date({}, '-3 days', 'weekday 4')) AS INTEGER) - 1) / 7 + 1)",
                col
            ),
            DatePart::Month => format!("CAST(strftime('%m', {}) AS INTEGER)", col),
            DatePart::Year => format!("CAST(strftime('%Y', {}) AS INTEGER)", col),
            DatePart::Weekday => format!("CAST(strftime('%w', {}) AS INTEGER)", col),
        }
    }

    fn table_exists_query(&self) -> String {
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
    }

    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String {
        let dir = if desc { "DESC" } else { "ASC" };
        if nulls_last {
            format!(
                "CASE WHEN {} IS NULL THEN 1 ELSE 0 END, {} {}",
                col, col, dir
            )
        } else {
            format!(
                "CASE WHEN {} IS NULL THEN 0 ELSE 1 END, {} {}",
                col, col, dir
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::DistStyle;

    #[test]
    fn test_placeholder() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.placeholder(1), "?");
        assert_eq!(dialect.placeholder(5), "?");
    }

    #[test]
    fn test_column_type_affinity() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.column_type(ColumnType::SmallInt), "INTEGER");
        assert_eq!(dialect.column_type(ColumnType::Double), "REAL");
        assert_eq!(dialect.column_type(ColumnType::NVarChar(256)), "TEXT");
        assert_eq!(dialect.column_type(ColumnType::Timestamp), "TEXT");
    }

    #[test]
    fn test_layout_is_omitted() {
        let layout = TableLayout {
            dist: DistStyle::Even,
            sort: None,
        };
        assert_eq!(SqliteDialect.table_layout(&layout), "");
    }

    #[test]
    fn test_drop_table_no_cascade() {
        assert_eq!(SqliteDialect.drop_table("time"), "DROP TABLE IF EXISTS time");
    }

    #[test]
    fn test_order_by_with_nulls() {
        let dialect = SqliteDialect;
        assert_eq!(
            dialect.order_by_with_nulls("ts", true, true),
            "CASE WHEN ts IS NULL THEN 1 ELSE 0 END, ts DESC"
        );
        assert_eq!(
            dialect.order_by_with_nulls("name", false, false),
            "CASE WHEN name IS NULL THEN 0 ELSE 1 END, name ASC"
        );
    }

    #[tokio::test]
    async fn test_calendar_expressions_evaluate() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:")
            .await
            .unwrap();
        let dialect = SqliteDialect;
        let ts = dialect.epoch_millis_to_timestamp("1541990796796");
        let sql = format!(
            "SELECT {ts}, {}, {}, {}, {}, {}, {}",
            dialect.date_part(DatePart::Hour, &ts),
            dialect.date_part(DatePart::Day, &ts),
            dialect.date_part(DatePart::Week, &ts),
            dialect.date_part(DatePart::Month, &ts),
            dialect.date_part(DatePart::Year, &ts),
            dialect.date_part(DatePart::Weekday, &ts),
        );
        let row: (String, i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(&sql).fetch_one(&mut conn).await.unwrap();

        assert_eq!(row.0, "2018-11-12 02:46:36.796");
        assert_eq!((row.1, row.2, row.3, row.4, row.5, row.6), (2, 12, 46, 11, 2018, 1));
    }

    #[tokio::test]
    async fn test_iso_week_at_year_boundary() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:")
            .await
            .unwrap();
        let week = SqliteDialect.date_part(DatePart::Week, "d");
        // 2021-01-03 is a Sunday in ISO week 53 of 2020; 2018-12-31 is in week 1 of 2019
        let sql = format!(
            "SELECT {week} FROM (SELECT '2021-01-03 12:00:00.000' AS d UNION ALL SELECT '2018-12-31 00:00:00.000') ORDER BY d"
        );
        let weeks: Vec<i64> = sqlx::query_scalar(&sql).fetch_all(&mut conn).await.unwrap();
        assert_eq!(weeks, vec![1, 53]);
    }
}
