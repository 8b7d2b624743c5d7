use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_REDSHIFT_PORT, DEFAULT_SQLITE_PATH,
    JSON_FORMAT_AUTO, JSON_FORMAT_AUTO_IGNORECASE,
};

// =============================================================================
// Warehouse Backend Enum (Redshift or SQLite)
// =============================================================================

/// Warehouse engine the pipeline runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    /// Embedded warehouse for local runs (staging loaded client-side)
    #[default]
    Sqlite,
    /// Redshift cluster (staging loaded with server-side COPY)
    Redshift,
}

impl WarehouseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Redshift => "redshift",
        }
    }
}

impl fmt::Display for WarehouseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// SQLite configuration (nested under warehouse)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SqliteFileConfig {
    pub path: Option<String>,
}

/// Warehouse configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct WarehouseFileConfig {
    pub backend: Option<WarehouseBackend>,
    pub sqlite: Option<SqliteFileConfig>,
}

/// Cluster connection section
#[derive(Default, Clone, Deserialize)]
pub struct ClusterFileConfig {
    pub host: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_port: Option<u16>,
}

impl fmt::Debug for ClusterFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterFileConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &self.db_password.as_ref().map(|_| "[REDACTED]"))
            .field("db_port", &self.db_port)
            .finish()
    }
}

/// Bulk-load role section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IamRoleFileConfig {
    pub arn: Option<String>,
}

/// Object storage credentials section
#[derive(Default, Clone, Deserialize)]
pub struct AwsFileConfig {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
}

impl fmt::Debug for AwsFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsFileConfig")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Source locations section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct S3FileConfig {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub warehouse: Option<WarehouseFileConfig>,
    pub cluster: Option<ClusterFileConfig>,
    pub iam_role: Option<IamRoleFileConfig>,
    pub aws: Option<AwsFileConfig>,
    pub s3: Option<S3FileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `dst` when `src` carries a value
fn merge_field<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(warehouse) = other.warehouse {
            let current = self
                .warehouse
                .get_or_insert_with(WarehouseFileConfig::default);
            merge_field(&mut current.backend, warehouse.backend);
            if let Some(sqlite) = warehouse.sqlite {
                let current_sqlite = current.sqlite.get_or_insert_with(SqliteFileConfig::default);
                merge_field(&mut current_sqlite.path, sqlite.path);
            }
        }

        if let Some(cluster) = other.cluster {
            let current = self.cluster.get_or_insert_with(ClusterFileConfig::default);
            merge_field(&mut current.host, cluster.host);
            merge_field(&mut current.db_name, cluster.db_name);
            merge_field(&mut current.db_user, cluster.db_user);
            merge_field(&mut current.db_password, cluster.db_password);
            merge_field(&mut current.db_port, cluster.db_port);
        }

        if let Some(iam_role) = other.iam_role {
            let current = self.iam_role.get_or_insert_with(IamRoleFileConfig::default);
            merge_field(&mut current.arn, iam_role.arn);
        }

        if let Some(aws) = other.aws {
            let current = self.aws.get_or_insert_with(AwsFileConfig::default);
            merge_field(&mut current.key, aws.key);
            merge_field(&mut current.secret, aws.secret);
            merge_field(&mut current.region, aws.region);
            merge_field(&mut current.endpoint, aws.endpoint);
        }

        if let Some(s3) = other.s3 {
            let current = self.s3.get_or_insert_with(S3FileConfig::default);
            merge_field(&mut current.log_data, s3.log_data);
            merge_field(&mut current.log_jsonpath, s3.log_jsonpath);
            merge_field(&mut current.song_data, s3.song_data);
        }
    }
}

// =============================================================================
// Final (runtime) config
// =============================================================================

/// Cluster connection parameters
#[derive(Clone)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub port: u16,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"[REDACTED]")
            .field("port", &self.port)
            .finish()
    }
}

/// Warehouse connection settings
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub backend: WarehouseBackend,
    pub sqlite_path: String,
    /// Only populated for the redshift backend
    pub cluster: Option<ClusterConfig>,
    pub iam_role_arn: Option<String>,
}

/// Object storage access
#[derive(Clone, Default)]
pub struct AwsConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Source locations as configured (any may be missing)
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
}

/// Fully resolved staging inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingSources {
    /// Event log records
    pub log_data: String,
    /// JSONPaths document mapping event fields to staging columns
    pub log_jsonpath: String,
    /// Song catalog records
    pub song_data: String,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub aws: AwsConfig,
    pub sources: SourceConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.dwh-etl/dwh.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::resolve(file_config, cli)
    }

    /// Layer CLI/env overrides on top of a merged file config and validate
    pub fn resolve(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_warehouse = file_config.warehouse.unwrap_or_default();
        let file_sqlite = file_warehouse.sqlite.unwrap_or_default();
        let file_cluster = file_config.cluster.unwrap_or_default();
        let file_iam_role = file_config.iam_role.unwrap_or_default();
        let file_aws = file_config.aws.unwrap_or_default();
        let file_s3 = file_config.s3.unwrap_or_default();

        let backend = cli
            .backend
            .or(file_warehouse.backend)
            .unwrap_or_default();

        let sqlite_path = cli
            .sqlite_path
            .clone()
            .or(file_sqlite.path)
            .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string());

        // Cluster settings are only required (and only resolved) for redshift
        let cluster = match backend {
            WarehouseBackend::Redshift => Some(ClusterConfig {
                host: required(cli.host.clone().or(file_cluster.host), "cluster.host")?,
                db_name: required(cli.db_name.clone().or(file_cluster.db_name), "cluster.db_name")?,
                db_user: required(cli.db_user.clone().or(file_cluster.db_user), "cluster.db_user")?,
                db_password: required(
                    cli.db_password.clone().or(file_cluster.db_password),
                    "cluster.db_password",
                )?,
                port: cli
                    .port
                    .or(file_cluster.db_port)
                    .unwrap_or(DEFAULT_REDSHIFT_PORT),
            }),
            WarehouseBackend::Sqlite => None,
        };

        let config = Self {
            warehouse: WarehouseConfig {
                backend,
                sqlite_path,
                cluster,
                iam_role_arn: cli.iam_role_arn.clone().or(file_iam_role.arn),
            },
            aws: AwsConfig {
                access_key_id: file_aws.key,
                secret_access_key: file_aws.secret,
                region: cli.aws_region.clone().or(file_aws.region),
                endpoint: file_aws.endpoint,
            },
            sources: SourceConfig {
                log_data: cli.log_data.clone().or(file_s3.log_data),
                log_jsonpath: cli.log_jsonpath.clone().or(file_s3.log_jsonpath),
                song_data: cli.song_data.clone().or(file_s3.song_data),
            },
        };

        config.validate()?;

        tracing::debug!(
            backend = %config.warehouse.backend,
            "Configuration loaded"
        );
        tracing::trace!(config = ?config, "Final config");

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if let Some(cluster) = &self.warehouse.cluster {
            if cluster.port == 0 {
                anyhow::bail!("Configuration error: cluster.db_port must be greater than 0");
            }
            if cluster.host.trim().is_empty() {
                anyhow::bail!("Configuration error: cluster.host must not be empty");
            }
        }

        if self.warehouse.backend == WarehouseBackend::Sqlite
            && self.warehouse.sqlite_path.trim().is_empty()
        {
            anyhow::bail!("Configuration error: warehouse.sqlite.path must not be empty");
        }

        if self.aws.access_key_id.is_some() != self.aws.secret_access_key.is_some() {
            anyhow::bail!("Configuration error: aws.key and aws.secret must be set together");
        }

        Ok(())
    }

    /// Resolve the staging inputs, failing before any database work if one is missing
    pub fn staging_sources(&self) -> Result<StagingSources> {
        let sources = StagingSources {
            log_data: required(self.sources.log_data.clone(), "s3.log_data")?,
            log_jsonpath: required(self.sources.log_jsonpath.clone(), "s3.log_jsonpath")?,
            song_data: required(self.sources.song_data.clone(), "s3.song_data")?,
        };

        if self.warehouse.backend == WarehouseBackend::Redshift {
            if self.warehouse.iam_role_arn.is_none() {
                anyhow::bail!(
                    "Configuration error: iam_role.arn is required to load staging tables on redshift"
                );
            }
            for (key, location) in [
                ("s3.log_data", &sources.log_data),
                ("s3.log_jsonpath", &sources.log_jsonpath),
                ("s3.song_data", &sources.song_data),
            ] {
                let is_format_keyword = key == "s3.log_jsonpath"
                    && (location.eq_ignore_ascii_case(JSON_FORMAT_AUTO)
                        || location.eq_ignore_ascii_case(JSON_FORMAT_AUTO_IGNORECASE));
                if !is_format_keyword && !location.starts_with("s3://") {
                    anyhow::bail!(
                        "Configuration error: {} must be an s3:// location on redshift, got '{}'",
                        key,
                        location
                    );
                }
            }
        }

        Ok(sources)
    }
}

/// Require a non-empty configuration value
fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("Configuration error: {} is required", key),
    }
}

/// Get the profile config path (~/.dwh-etl/dwh.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
