//! Star schema definitions
//!
//! Two staging tables (raw landing zones, no constraints), four dimensions and
//! one fact table. Tables are described as data and rendered to DDL through
//! the warehouse dialect, so both backends share one logical schema.

use crate::data::sql::{ColumnType, DistStyle, SortKey, SortKind, SqlDialect, TableLayout};
use crate::data::{DataError, Warehouse};

/// One column of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    /// Auto-incrementing surrogate key (type is taken from the dialect)
    pub identity: bool,
}

impl ColumnDef {
    const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            not_null: false,
            primary_key: false,
            identity: false,
        }
    }

    const fn not_null(self) -> Self {
        Self {
            not_null: true,
            ..self
        }
    }

    const fn primary_key(self) -> Self {
        Self {
            not_null: true,
            primary_key: true,
            ..self
        }
    }

    const fn identity(name: &'static str) -> Self {
        Self {
            identity: true,
            primary_key: true,
            not_null: true,
            ..Self::new(name, ColumnType::Integer)
        }
    }
}

/// Named foreign key constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: &'static str,
    pub column: &'static str,
    pub references: &'static str,
    pub referenced_column: &'static str,
}

/// A table of the warehouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKey],
    pub layout: TableLayout,
}

impl TableDef {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Render `CREATE TABLE IF NOT EXISTS` for `dialect`
    pub fn create_sql(&self, dialect: &dyn SqlDialect) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| render_column(column, dialect))
            .collect();

        for fk in self.foreign_keys {
            lines.push(format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.name, fk.column, fk.references, fk.referenced_column
            ));
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            lines.join(",\n    ")
        );

        let layout = dialect.table_layout(&self.layout);
        if !layout.is_empty() {
            sql.push('\n');
            sql.push_str(&layout);
        }
        sql
    }

    pub fn drop_sql(&self, dialect: &dyn SqlDialect) -> String {
        dialect.drop_table(self.name)
    }
}

fn render_column(column: &ColumnDef, dialect: &dyn SqlDialect) -> String {
    if column.identity {
        return format!("{} {}", column.name, dialect.identity_primary_key());
    }

    let mut sql = format!("{} {}", column.name, dialect.column_type(column.ty));
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
    }
    sql
}

// =============================================================================
// Staging tables
// =============================================================================

pub const STAGING_EVENTS: TableDef = TableDef {
    name: "staging_events",
    columns: &[
        ColumnDef::new("artist", ColumnType::NVarChar(256)),
        ColumnDef::new("auth", ColumnType::NVarChar(10)),
        ColumnDef::new("firstName", ColumnType::NVarChar(256)),
        ColumnDef::new("gender", ColumnType::VarChar(1)),
        ColumnDef::new("itemInSession", ColumnType::SmallInt),
        ColumnDef::new("lastName", ColumnType::NVarChar(256)),
        ColumnDef::new("length", ColumnType::Double),
        ColumnDef::new("level", ColumnType::VarChar(4)),
        ColumnDef::new("location", ColumnType::NVarChar(256)),
        ColumnDef::new("method", ColumnType::VarChar(3)),
        ColumnDef::new("page", ColumnType::VarChar(20)),
        ColumnDef::new("registration", ColumnType::Double),
        ColumnDef::new("sessionId", ColumnType::SmallInt),
        ColumnDef::new("song", ColumnType::NVarChar(256)),
        ColumnDef::new("status", ColumnType::VarChar(3)),
        ColumnDef::new("ts", ColumnType::BigInt),
        ColumnDef::new("userAgent", ColumnType::NVarChar(256)),
        ColumnDef::new("userId", ColumnType::VarChar(18)),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Even,
        sort: Some(SortKey {
            kind: SortKind::Interleaved,
            columns: &["page", "ts", "artist", "userId", "song"],
        }),
    },
};

pub const STAGING_SONGS: TableDef = TableDef {
    name: "staging_songs",
    columns: &[
        ColumnDef::new("num_songs", ColumnType::SmallInt),
        ColumnDef::new("artist_id", ColumnType::Char(18)),
        ColumnDef::new("artist_latitude", ColumnType::Double),
        ColumnDef::new("artist_longitude", ColumnType::Double),
        ColumnDef::new("artist_location", ColumnType::NVarChar(256)),
        ColumnDef::new("artist_name", ColumnType::NVarChar(256)),
        ColumnDef::new("song_id", ColumnType::Char(18)),
        ColumnDef::new("title", ColumnType::NVarChar(256)),
        ColumnDef::new("duration", ColumnType::Double),
        ColumnDef::new("year", ColumnType::SmallInt),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Auto,
        sort: None,
    },
};

// =============================================================================
// Dimensions
// =============================================================================

pub const USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        // VARCHAR so ids compare equal to staging userId without padding
        ColumnDef::new("user_id", ColumnType::VarChar(18)).primary_key(),
        ColumnDef::new("first_name", ColumnType::NVarChar(256)).not_null(),
        ColumnDef::new("last_name", ColumnType::NVarChar(256)).not_null(),
        ColumnDef::new("gender", ColumnType::VarChar(1)),
        ColumnDef::new("level", ColumnType::VarChar(4)),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Key("user_id"),
        sort: Some(SortKey {
            kind: SortKind::Compound,
            columns: &["gender", "level"],
        }),
    },
};

pub const SONGS: TableDef = TableDef {
    name: "songs",
    columns: &[
        ColumnDef::new("song_id", ColumnType::Char(18)).primary_key(),
        ColumnDef::new("title", ColumnType::NVarChar(256)).not_null(),
        ColumnDef::new("artist_id", ColumnType::Char(18)).not_null(),
        ColumnDef::new("year", ColumnType::SmallInt),
        ColumnDef::new("duration", ColumnType::Double),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Key("song_id"),
        sort: Some(SortKey {
            kind: SortKind::Compound,
            columns: &["year"],
        }),
    },
};

pub const ARTISTS: TableDef = TableDef {
    name: "artists",
    columns: &[
        ColumnDef::new("artist_id", ColumnType::Char(18)).primary_key(),
        ColumnDef::new("name", ColumnType::NVarChar(256)).not_null(),
        ColumnDef::new("location", ColumnType::NVarChar(256)),
        ColumnDef::new("latitude", ColumnType::Double),
        ColumnDef::new("longitude", ColumnType::Double),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Key("artist_id"),
        sort: Some(SortKey {
            kind: SortKind::Compound,
            columns: &["location"],
        }),
    },
};

pub const TIME: TableDef = TableDef {
    name: "time",
    columns: &[
        ColumnDef::new("start_time", ColumnType::Timestamp).primary_key(),
        ColumnDef::new("hour", ColumnType::SmallInt).not_null(),
        ColumnDef::new("day", ColumnType::SmallInt).not_null(),
        ColumnDef::new("week", ColumnType::SmallInt).not_null(),
        ColumnDef::new("month", ColumnType::SmallInt).not_null(),
        ColumnDef::new("year", ColumnType::SmallInt).not_null(),
        ColumnDef::new("weekday", ColumnType::SmallInt).not_null(),
    ],
    foreign_keys: &[],
    layout: TableLayout {
        dist: DistStyle::Key("start_time"),
        sort: Some(SortKey {
            kind: SortKind::Compound,
            columns: &["start_time"],
        }),
    },
};

// =============================================================================
// Fact
// =============================================================================

pub const SONGPLAYS: TableDef = TableDef {
    name: "songplays",
    columns: &[
        ColumnDef::identity("songplay_id"),
        ColumnDef::new("start_time", ColumnType::Timestamp).not_null(),
        ColumnDef::new("user_id", ColumnType::VarChar(18)).not_null(),
        ColumnDef::new("level", ColumnType::VarChar(4)),
        ColumnDef::new("song_id", ColumnType::Char(18)),
        ColumnDef::new("artist_id", ColumnType::Char(18)),
        ColumnDef::new("session_id", ColumnType::SmallInt),
        ColumnDef::new("location", ColumnType::NVarChar(256)),
        ColumnDef::new("user_agent", ColumnType::NVarChar(256)),
    ],
    foreign_keys: &[
        ForeignKey {
            name: "fk_time",
            column: "start_time",
            references: "time",
            referenced_column: "start_time",
        },
        ForeignKey {
            name: "fk_user",
            column: "user_id",
            references: "users",
            referenced_column: "user_id",
        },
        ForeignKey {
            name: "fk_song",
            column: "song_id",
            references: "songs",
            referenced_column: "song_id",
        },
        ForeignKey {
            name: "fk_artist",
            column: "artist_id",
            references: "artists",
            referenced_column: "artist_id",
        },
    ],
    layout: TableLayout {
        dist: DistStyle::Even,
        sort: Some(SortKey {
            kind: SortKind::Compound,
            columns: &["start_time", "user_id", "song_id", "artist_id"],
        }),
    },
};

/// Creation order: staging, dimensions, then the fact table that references them
pub const ALL_TABLES: [&TableDef; 7] = [
    &STAGING_EVENTS,
    &STAGING_SONGS,
    &USERS,
    &SONGS,
    &ARTISTS,
    &TIME,
    &SONGPLAYS,
];

/// Tables the bulk loader fills
pub const STAGING_TABLES: [&TableDef; 2] = [&STAGING_EVENTS, &STAGING_SONGS];

/// Tables derived from staging
pub const WAREHOUSE_TABLES: [&TableDef; 5] = [&USERS, &SONGS, &ARTISTS, &TIME, &SONGPLAYS];

// =============================================================================
// Schema Manager
// =============================================================================

/// DROP statements, fact first
pub fn drop_statements(dialect: &dyn SqlDialect) -> Vec<String> {
    ALL_TABLES
        .iter()
        .rev()
        .map(|table| table.drop_sql(dialect))
        .collect()
}

/// CREATE statements in dependency order
pub fn create_statements(dialect: &dyn SqlDialect) -> Vec<String> {
    ALL_TABLES
        .iter()
        .map(|table| table.create_sql(dialect))
        .collect()
}

/// Remove every table if present
pub async fn drop_all(warehouse: &mut Warehouse) -> Result<(), DataError> {
    let dialect = warehouse.dialect();
    for table in ALL_TABLES.iter().rev() {
        tracing::debug!(table = table.name, "Dropping table");
        warehouse.execute(&table.drop_sql(dialect)).await?;
    }
    Ok(())
}

/// Create every table that does not exist yet
pub async fn create_all(warehouse: &mut Warehouse) -> Result<(), DataError> {
    let dialect = warehouse.dialect();
    for table in ALL_TABLES {
        tracing::debug!(table = table.name, "Creating table");
        let sql = table.create_sql(dialect);
        tracing::trace!(sql = %sql, "DDL");
        warehouse.execute(&sql).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::{RedshiftDialect, SqliteDialect};

    #[test]
    fn test_fact_is_created_last_and_dropped_first() {
        let create = create_statements(&SqliteDialect);
        assert!(create[0].contains("staging_events"));
        assert!(create[6].starts_with("CREATE TABLE IF NOT EXISTS songplays"));

        let drop = drop_statements(&SqliteDialect);
        assert_eq!(drop[0], "DROP TABLE IF EXISTS songplays");
        assert_eq!(drop[6], "DROP TABLE IF EXISTS staging_events");
    }

    #[test]
    fn test_redshift_songplays_ddl() {
        let sql = SONGPLAYS.create_sql(&RedshiftDialect);
        assert!(sql.contains("songplay_id INT IDENTITY(0, 1) NOT NULL PRIMARY KEY"));
        assert!(sql.contains("start_time TIMESTAMP NOT NULL"));
        assert!(sql.contains("CONSTRAINT fk_time FOREIGN KEY (start_time) REFERENCES time (start_time)"));
        assert!(sql.contains("CONSTRAINT fk_artist FOREIGN KEY (artist_id) REFERENCES artists (artist_id)"));
        assert!(sql.ends_with(
            ")\nDISTSTYLE EVEN\nCOMPOUND SORTKEY(start_time, user_id, song_id, artist_id)"
        ));
    }

    #[test]
    fn test_redshift_staging_layouts() {
        let events = STAGING_EVENTS.create_sql(&RedshiftDialect);
        assert!(events.contains("length DOUBLE PRECISION"));
        assert!(events.ends_with("INTERLEAVED SORTKEY(page, ts, artist, userId, song)"));

        let songs = STAGING_SONGS.create_sql(&RedshiftDialect);
        assert!(songs.ends_with(")\nDISTSTYLE AUTO"));
    }

    #[test]
    fn test_redshift_dimension_distkey() {
        let sql = USERS.create_sql(&RedshiftDialect);
        assert!(sql.contains("user_id VARCHAR(18) NOT NULL PRIMARY KEY"));
        assert!(sql.contains("DISTSTYLE KEY DISTKEY(user_id)"));
    }

    #[test]
    fn test_sqlite_ddl_has_no_layout() {
        let sql = TIME.create_sql(&SqliteDialect);
        assert!(sql.ends_with(")"));
        assert!(sql.contains("start_time TEXT NOT NULL PRIMARY KEY"));
        assert!(!sql.contains("SORTKEY"));

        let sql = SONGPLAYS.create_sql(&SqliteDialect);
        assert!(sql.contains("songplay_id INTEGER PRIMARY KEY AUTOINCREMENT"));
    }

    #[test]
    fn test_table_groups_partition_all_tables() {
        let mut names: Vec<&str> = STAGING_TABLES
            .iter()
            .chain(WAREHOUSE_TABLES.iter())
            .map(|t| t.name)
            .collect();
        names.sort();
        let mut all: Vec<&str> = ALL_TABLES.iter().map(|t| t.name).collect();
        all.sort();
        assert_eq!(names, all);
    }
}
