//! Redshift SQL dialect implementation

use super::{ColumnType, DatePart, DistStyle, SortKind, SqlDialect, TableLayout};

/// Redshift SQL dialect
pub struct RedshiftDialect;

impl SqlDialect for RedshiftDialect {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn column_type(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::SmallInt => "SMALLINT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Char(n) => format!("CHAR({})", n),
            ColumnType::VarChar(n) => format!("VARCHAR({})", n),
            ColumnType::NVarChar(n) => format!("NVARCHAR({})", n),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
        }
    }

    fn identity_primary_key(&self) -> &'static str {
        "INT IDENTITY(0, 1) NOT NULL PRIMARY KEY"
    }

    fn table_layout(&self, layout: &TableLayout) -> String {
        let mut parts = vec![match layout.dist {
            DistStyle::Auto => "DISTSTYLE AUTO".to_string(),
            DistStyle::Even => "DISTSTYLE EVEN".to_string(),
            DistStyle::Key(column) => format!("DISTSTYLE KEY DISTKEY({})", column),
        }];

        if let Some(sort) = &layout.sort {
            let kind = match sort.kind {
                SortKind::Compound => "COMPOUND",
                SortKind::Interleaved => "INTERLEAVED",
            };
            parts.push(format!("{} SORTKEY({})", kind, sort.columns.join(", ")));
        }

        parts.join("\n")
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", table)
    }

    fn epoch_millis_to_timestamp(&self, col: &str) -> String {
        format!(
            "TIMESTAMP WITH TIME ZONE 'epoch' + {} * INTERVAL '0.001 second'",
            col
        )
    }

    fn date_part(&self, part: DatePart, col: &str) -> String {
        let field = match part {
            DatePart::Hour => "HOUR",
            DatePart::Day => "DAY",
            DatePart::Week => "WEEK",
            DatePart::Month => "MONTH",
            DatePart::Year => "YEAR",
            DatePart::Weekday => "DOW",
        };
        format!("EXTRACT({} FROM {})", field, col)
    }

    fn table_exists_query(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = {}",
            self.placeholder(1)
        )
    }

    fn order_by_with_nulls(&self, col: &str, desc: bool, nulls_last: bool) -> String {
        let dir = if desc { "DESC" } else { "ASC" };
        let nulls = if nulls_last {
            "NULLS LAST"
        } else {
            "NULLS FIRST"
        };
        format!("{} {} {}", col, dir, nulls)
    }
}
