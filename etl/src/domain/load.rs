//! Bulk Loader
//!
//! Fills the two staging tables from newline-delimited JSON objects, one bulk
//! operation per table and no transformation. Redshift runs the load itself
//! with `COPY`; the SQLite warehouse is loaded client-side with the same
//! field-mapping rules.

use serde_json::Value;

use super::jsonpaths::JsonPaths;
use super::schema::{STAGING_EVENTS, STAGING_SONGS, TableDef};
use crate::core::config::{AwsConfig, StagingSources};
use crate::core::constants::{JSON_FORMAT_AUTO, JSON_FORMAT_AUTO_IGNORECASE};
use crate::data::objects::{Location, open_store};
use crate::data::sql::{ColumnType, SqlValue};
use crate::data::{DataError, SqliteWarehouse, Warehouse};

/// How JSON fields map onto staging columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Keys equal column names
    Auto,
    /// Keys equal column names, compared without case
    AutoIgnoreCase,
    /// Location of a JSONPaths document, one path per column
    Paths(String),
}

impl JsonFormat {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case(JSON_FORMAT_AUTO) {
            Self::Auto
        } else if value.eq_ignore_ascii_case(JSON_FORMAT_AUTO_IGNORECASE) {
            Self::AutoIgnoreCase
        } else {
            Self::Paths(value.to_string())
        }
    }

    /// Argument of the `JSON` clause in COPY
    pub fn copy_argument(&self) -> &str {
        match self {
            Self::Auto => JSON_FORMAT_AUTO,
            Self::AutoIgnoreCase => JSON_FORMAT_AUTO_IGNORECASE,
            Self::Paths(location) => location,
        }
    }
}

/// One staging table and where its records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLoad {
    pub table: &'static TableDef,
    pub source: String,
    pub format: JsonFormat,
}

/// Loads for both staging tables, events first
pub fn staging_loads(sources: &StagingSources) -> [StagingLoad; 2] {
    [
        StagingLoad {
            table: &STAGING_EVENTS,
            source: sources.log_data.clone(),
            format: JsonFormat::parse(&sources.log_jsonpath),
        },
        StagingLoad {
            table: &STAGING_SONGS,
            source: sources.song_data.clone(),
            format: JsonFormat::Auto,
        },
    ]
}

/// Render the Redshift COPY for one staging load
pub fn copy_statement(load: &StagingLoad, iam_role_arn: &str, region: Option<&str>) -> String {
    let mut sql = format!(
        "COPY {} ({})\nFROM {}\nIAM_ROLE {}\nJSON {}",
        load.table.name,
        load.table.column_names().join(", "),
        quote_literal(&load.source),
        quote_literal(iam_role_arn),
        quote_literal(load.format.copy_argument()),
    );
    if let Some(region) = region {
        sql.push_str(&format!("\nREGION {}", quote_literal(region)));
    }
    sql.push_str("\nCOMPUPDATE ON");
    sql
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Result of loading one staging table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: &'static str,
    /// Source objects read (client-side loads only)
    pub objects: Option<usize>,
    pub rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Load both staging tables
///
/// Assumes the tables exist and are empty. The first failure aborts the
/// load; a table that was already loaded stays loaded.
pub async fn load_staging(
    warehouse: &mut Warehouse,
    sources: &StagingSources,
    iam_role_arn: Option<&str>,
    aws: &AwsConfig,
) -> Result<LoadReport, DataError> {
    let mut report = LoadReport::default();

    for load in staging_loads(sources) {
        tracing::info!(table = load.table.name, source = %load.source, "Loading staging table");

        let table_load = match warehouse {
            Warehouse::Redshift(redshift) => {
                let role = iam_role_arn.ok_or_else(|| {
                    DataError::Config("iam_role.arn is required for COPY".into())
                })?;
                require_s3_source(&load)?;
                let sql = copy_statement(&load, role, aws.region.as_deref());
                tracing::trace!(sql = %sql, "COPY");
                TableLoad {
                    table: load.table.name,
                    objects: None,
                    rows: redshift.execute(&sql).await?,
                }
            }
            Warehouse::Sqlite(sqlite) => load_client_side(sqlite, &load, aws).await?,
        };

        tracing::debug!(
            table = table_load.table,
            objects = ?table_load.objects,
            rows = table_load.rows,
            "Staging table loaded"
        );
        report.tables.push(table_load);
    }

    Ok(report)
}

/// Column mapping resolved for one load
enum FieldMapping {
    ByName { ignore_case: bool },
    Paths(JsonPaths),
}

async fn load_client_side(
    sqlite: &mut SqliteWarehouse,
    load: &StagingLoad,
    aws: &AwsConfig,
) -> Result<TableLoad, DataError> {
    let table = load.table;
    let mapping = resolve_mapping(load, aws).await?;

    let location = Location::parse(&load.source)?;
    let store = open_store(&location, aws).await?;
    let keys = store.list(&location.prefix()).await?;
    if keys.is_empty() {
        return Err(DataError::NotFound(location.to_string()));
    }

    let mut rows = Vec::new();
    for key in &keys {
        let object = object_name(&location, key);
        let bytes = store.get(key).await?;
        let before = rows.len();

        for (index, record) in serde_json::Deserializer::from_slice(&bytes)
            .into_iter::<Value>()
            .enumerate()
        {
            let record = record.map_err(|e| DataError::malformed(&object, index + 1, e))?;
            if !record.is_object() {
                return Err(DataError::malformed(
                    &object,
                    index + 1,
                    "expected a JSON object",
                ));
            }
            rows.push(map_record(&record, table, &mapping));
        }

        tracing::trace!(object = %object, records = rows.len() - before, "Parsed source object");
    }

    let inserted = sqlite
        .insert_rows(table.name, &table.column_names(), &rows)
        .await?;

    Ok(TableLoad {
        table: table.name,
        objects: Some(keys.len()),
        rows: inserted,
    })
}

async fn resolve_mapping(load: &StagingLoad, aws: &AwsConfig) -> Result<FieldMapping, DataError> {
    match &load.format {
        JsonFormat::Auto => Ok(FieldMapping::ByName { ignore_case: false }),
        JsonFormat::AutoIgnoreCase => Ok(FieldMapping::ByName { ignore_case: true }),
        JsonFormat::Paths(source) => {
            let location = Location::parse(source)?;
            let store = open_store(&location, aws).await?;
            let bytes = store.get(&location.prefix()).await?;
            let paths = JsonPaths::from_slice(&location.to_string(), &bytes)?;

            if paths.len() != load.table.columns.len() {
                return Err(DataError::jsonpaths(
                    &location.to_string(),
                    format!(
                        "{} paths for {} columns of {}",
                        paths.len(),
                        load.table.columns.len(),
                        load.table.name
                    ),
                ));
            }
            Ok(FieldMapping::Paths(paths))
        }
    }
}

fn object_name(location: &Location, key: &str) -> String {
    match location {
        Location::S3 { bucket, .. } => format!("s3://{}/{}", bucket, key),
        Location::Local(_) => key.to_string(),
    }
}

fn map_record(record: &Value, table: &TableDef, mapping: &FieldMapping) -> Vec<SqlValue> {
    match mapping {
        FieldMapping::Paths(paths) => paths
            .extract(record)
            .into_iter()
            .zip(table.columns)
            .map(|(value, column)| to_sql_value(value, column.ty))
            .collect(),
        FieldMapping::ByName { ignore_case } => table
            .columns
            .iter()
            .map(|column| {
                let value = if *ignore_case {
                    record.as_object().and_then(|fields| {
                        fields
                            .iter()
                            .find(|(key, _)| key.eq_ignore_ascii_case(column.name))
                            .map(|(_, value)| value)
                    })
                } else {
                    record.get(column.name)
                };
                to_sql_value(value, column.ty)
            })
            .collect(),
    }
}

/// Convert one JSON field for a column of type `ty`
fn to_sql_value(value: Option<&Value>, ty: ColumnType) -> SqlValue {
    let numeric = matches!(
        ty,
        ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt | ColumnType::Double
    );

    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) if numeric => SqlValue::Integer(i64::from(*b)),
        Some(Value::Bool(b)) => SqlValue::Text(b.to_string()),
        Some(Value::Number(n)) if ty == ColumnType::Double => {
            n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null)
        }
        Some(Value::Number(n)) if numeric => match n.as_i64() {
            Some(v) => SqlValue::Integer(v),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Some(Value::Number(n)) => SqlValue::Text(n.to_string()),
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => SqlValue::Text(nested.to_string()),
    }
}

/// COPY resolves its source on the cluster, which can only reach S3
fn require_s3_source(load: &StagingLoad) -> Result<(), DataError> {
    if load.source.starts_with("s3://") {
        Ok(())
    } else {
        Err(DataError::unsupported(
            "redshift",
            format!("COPY reads from s3:// only, got '{}'", load.source),
        ))
    }
}
