//! Transformer/Inserter
//!
//! Derives the four dimensions and the fact table from staging with one
//! set-based `INSERT ... SELECT` each, in dependency order: users, songs,
//! artists, time, then songplays.

use crate::core::constants::SONG_PLAY_PAGE;
use crate::data::sql::{DatePart, SqlDialect};
use crate::data::{DataError, Warehouse};

/// One derivation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub table: &'static str,
    pub sql: String,
}

/// Users keyed by id; when an id appears more than once the row with the
/// latest event wins (then paid over free, then by name and gender).
pub fn user_insert(dialect: &dyn SqlDialect) -> String {
    format!(
        "INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT userId, firstName, lastName, gender, level
FROM (
    SELECT userId, firstName, lastName, gender, level,
           ROW_NUMBER() OVER (
               PARTITION BY userId
               ORDER BY {}, level DESC, firstName, lastName, gender
           ) AS rn
    FROM staging_events
    WHERE userId IS NOT NULL
      AND firstName IS NOT NULL
      AND lastName IS NOT NULL
) ranked
WHERE rn = 1",
        dialect.order_by_with_nulls("ts", true, true)
    )
}

/// Songs keyed by id; conflicting catalog rows for one id resolve to the
/// lowest title, then artist, year and duration, NULLs last.
pub fn song_insert(dialect: &dyn SqlDialect) -> String {
    format!(
        "INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT song_id, title, artist_id, year, duration
FROM (
    SELECT song_id, title, artist_id, year, duration,
           ROW_NUMBER() OVER (
               PARTITION BY song_id
               ORDER BY {}
           ) AS rn
    FROM staging_songs
    WHERE song_id IS NOT NULL
) ranked
WHERE rn = 1",
        ascending_nulls_last(dialect, &["title", "artist_id", "year", "duration"])
    )
}

/// Artists keyed by id; conflicting rows resolve to the lowest latitude,
/// longitude, name and location, NULLs last, so located rows win.
pub fn artist_insert(dialect: &dyn SqlDialect) -> String {
    format!(
        "INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude
FROM (
    SELECT artist_id, artist_name, artist_location, artist_latitude, artist_longitude,
           ROW_NUMBER() OVER (
               PARTITION BY artist_id
               ORDER BY {}
           ) AS rn
    FROM staging_songs
    WHERE artist_id IS NOT NULL
) ranked
WHERE rn = 1",
        ascending_nulls_last(
            dialect,
            &[
                "artist_latitude",
                "artist_longitude",
                "artist_name",
                "artist_location",
            ],
        )
    )
}

fn ascending_nulls_last(dialect: &dyn SqlDialect, columns: &[&str]) -> String {
    columns
        .iter()
        .map(|col| dialect.order_by_with_nulls(col, false, true))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn time_insert(dialect: &dyn SqlDialect) -> String {
    let part = |part| dialect.date_part(part, "start_time");
    format!(
        "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT start_time,
       {} AS hour,
       {} AS day,
       {} AS week,
       {} AS month,
       {} AS year,
       {} AS weekday
FROM (
    SELECT DISTINCT {} AS start_time
    FROM staging_events
    WHERE page = '{}'
      AND ts IS NOT NULL
) plays",
        part(DatePart::Hour),
        part(DatePart::Day),
        part(DatePart::Week),
        part(DatePart::Month),
        part(DatePart::Year),
        part(DatePart::Weekday),
        dialect.epoch_millis_to_timestamp("ts"),
        SONG_PLAY_PAGE
    )
}

/// Song plays whose title, length and artist name match the catalog exactly
pub fn songplay_insert(dialect: &dyn SqlDialect) -> String {
    format!(
        "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT DISTINCT {} AS start_time,
       e.userId, e.level, s.song_id, a.artist_id, e.sessionId, e.location, e.userAgent
FROM staging_events e
JOIN songs s ON e.song = s.title AND e.length = s.duration
JOIN artists a ON e.artist = a.name
WHERE e.page = '{}'
  AND e.ts IS NOT NULL
  AND e.song IS NOT NULL
  AND e.userId IS NOT NULL",
        dialect.epoch_millis_to_timestamp("e.ts"),
        SONG_PLAY_PAGE
    )
}

/// All derivations in execution order
pub fn derivations(dialect: &dyn SqlDialect) -> Vec<Derivation> {
    vec![
        Derivation {
            table: "users",
            sql: user_insert(dialect),
        },
        Derivation {
            table: "songs",
            sql: song_insert(dialect),
        },
        Derivation {
            table: "artists",
            sql: artist_insert(dialect),
        },
        Derivation {
            table: "time",
            sql: time_insert(dialect),
        },
        Derivation {
            table: "songplays",
            sql: songplay_insert(dialect),
        },
    ]
}

/// Rows inserted into one warehouse table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInsert {
    pub table: &'static str,
    pub rows: u64,
}

/// Populate the warehouse tables from staging
///
/// Each statement commits on its own; a failure leaves the earlier tables
/// populated.
pub async fn populate_warehouse(warehouse: &mut Warehouse) -> Result<Vec<TableInsert>, DataError> {
    let mut inserts = Vec::new();
    for derivation in derivations(warehouse.dialect()) {
        tracing::debug!(table = derivation.table, "Populating table");
        tracing::trace!(sql = %derivation.sql, "Derivation");
        let rows = warehouse.execute(&derivation.sql).await?;
        tracing::debug!(table = derivation.table, rows, "Table populated");
        inserts.push(TableInsert {
            table: derivation.table,
            rows,
        });
    }
    Ok(inserts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sql::{RedshiftDialect, SqliteDialect};

    #[test]
    fn test_derivation_order() {
        let tables: Vec<&str> = derivations(&SqliteDialect).iter().map(|d| d.table).collect();
        assert_eq!(tables, vec!["users", "songs", "artists", "time", "songplays"]);
    }

    #[test]
    fn test_redshift_time_insert() {
        let sql = time_insert(&RedshiftDialect);
        assert!(sql.contains("EXTRACT(WEEK FROM start_time) AS week"));
        assert!(sql.contains("EXTRACT(DOW FROM start_time) AS weekday"));
        assert!(sql.contains(
            "SELECT DISTINCT TIMESTAMP WITH TIME ZONE 'epoch' + ts * INTERVAL '0.001 second' AS start_time"
        ));
        assert!(sql.contains("WHERE page = 'NextSong'"));
    }

    #[test]
    fn test_redshift_user_insert_latest_wins() {
        let sql = user_insert(&RedshiftDialect);
        assert!(sql.contains("ORDER BY ts DESC NULLS LAST, level DESC"));
        assert!(sql.contains("WHERE rn = 1"));
    }

    #[test]
    fn test_song_and_artist_keep_one_row_per_key() {
        let sql = song_insert(&RedshiftDialect);
        assert!(sql.contains("PARTITION BY song_id"));
        assert!(sql.contains("ORDER BY title ASC NULLS LAST, artist_id ASC NULLS LAST"));

        let sql = artist_insert(&SqliteDialect);
        assert!(sql.contains("PARTITION BY artist_id"));
        assert!(sql.contains(
            "ORDER BY CASE WHEN artist_latitude IS NULL THEN 1 ELSE 0 END, artist_latitude ASC"
        ));
        assert!(sql.contains("WHERE rn = 1"));
    }

    #[test]
    fn test_songplay_join_is_exact() {
        let sql = songplay_insert(&RedshiftDialect);
        assert!(sql.contains("JOIN songs s ON e.song = s.title AND e.length = s.duration"));
        assert!(sql.contains("JOIN artists a ON e.artist = a.name"));
        assert!(sql.contains("AND e.userId IS NOT NULL"));
    }
}
