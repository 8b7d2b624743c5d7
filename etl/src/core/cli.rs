use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::WarehouseBackend;
use super::constants::{
    ENV_AWS_REGION, ENV_BACKEND, ENV_CONFIG, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_USER, ENV_HOST,
    ENV_IAM_ROLE_ARN, ENV_LOG_DATA, ENV_LOG_JSONPATH, ENV_PORT, ENV_SONG_DATA, ENV_SQLITE_PATH,
};
use crate::domain::pipeline::Stage;

#[derive(Parser)]
#[command(name = "dwh-etl")]
#[command(version, about = "Load song and event logs into a star-schema warehouse", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Warehouse backend (redshift or sqlite)
    #[arg(long, global = true, env = ENV_BACKEND, value_parser = parse_backend)]
    pub backend: Option<WarehouseBackend>,

    /// SQLite database path (sqlite backend); ":memory:" for a throwaway run
    #[arg(long, global = true, env = ENV_SQLITE_PATH)]
    pub sqlite_path: Option<String>,

    /// Cluster endpoint (redshift backend)
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Cluster port (redshift backend)
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Database name (redshift backend)
    #[arg(long, global = true, env = ENV_DB_NAME)]
    pub db_name: Option<String>,

    /// Database user (redshift backend)
    #[arg(long, global = true, env = ENV_DB_USER)]
    pub db_user: Option<String>,

    /// Database password (redshift backend)
    #[arg(long, global = true, env = ENV_DB_PASSWORD, hide_env_values = true)]
    pub db_password: Option<String>,

    /// Role the cluster assumes to read the source bucket
    #[arg(long, global = true, env = ENV_IAM_ROLE_ARN)]
    pub iam_role_arn: Option<String>,

    /// Event log location (s3://bucket/prefix or local path)
    #[arg(long, global = true, env = ENV_LOG_DATA)]
    pub log_data: Option<String>,

    /// JSONPaths document for the event log
    #[arg(long, global = true, env = ENV_LOG_JSONPATH)]
    pub log_jsonpath: Option<String>,

    /// Song catalog location (s3://bucket/prefix or local path)
    #[arg(long, global = true, env = ENV_SONG_DATA)]
    pub song_data: Option<String>,

    /// Region of the source bucket
    #[arg(long, global = true, env = ENV_AWS_REGION)]
    pub aws_region: Option<String>,
}

/// Parse warehouse backend from CLI/env string
fn parse_backend(s: &str) -> Result<WarehouseBackend, String> {
    match s.to_lowercase().as_str() {
        "sqlite" => Ok(WarehouseBackend::Sqlite),
        "redshift" => Ok(WarehouseBackend::Redshift),
        _ => Err(format!(
            "Invalid warehouse backend '{}'. Valid options: redshift, sqlite",
            s
        )),
    }
}

/// Parse pipeline stage from CLI string
fn parse_stage(s: &str) -> Result<Stage, String> {
    Stage::parse(s).ok_or_else(|| {
        let names: Vec<&str> = Stage::ALL.iter().map(|stage| stage.name()).collect();
        format!(
            "Invalid stage '{}'. Valid options: {}",
            s,
            names.join(", ")
        )
    })
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Drop and recreate all staging and warehouse tables
    CreateTables,
    /// Load staging tables, populate the warehouse and report row counts
    Etl,
    /// Recreate tables, then run the full ETL
    Run,
    /// Report row counts for every table
    Counts,
    /// Print the statements a stage would run, without connecting
    Sql {
        /// Only print this stage
        #[arg(long, value_parser = parse_stage)]
        stage: Option<Stage>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub backend: Option<WarehouseBackend>,
    pub sqlite_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub iam_role_arn: Option<String>,
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
    pub aws_region: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        backend: cli.backend,
        sqlite_path: cli.sqlite_path,
        host: cli.host,
        port: cli.port,
        db_name: cli.db_name,
        db_user: cli.db_user,
        db_password: cli.db_password,
        iam_role_arn: cli.iam_role_arn,
        log_data: cli.log_data,
        log_jsonpath: cli.log_jsonpath,
        song_data: cli.song_data,
        aws_region: cli.aws_region,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("Redshift"), Ok(WarehouseBackend::Redshift));
        assert_eq!(parse_backend("sqlite"), Ok(WarehouseBackend::Sqlite));
        assert!(parse_backend("postgres").unwrap_err().contains("redshift, sqlite"));
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!(parse_stage("load-staging"), Ok(Stage::LoadStaging));
        assert!(parse_stage("vacuum").is_err());
    }

    #[test]
    fn test_cli_parses_subcommand_and_globals() {
        let cli = Cli::try_parse_from([
            "dwh-etl",
            "etl",
            "--backend",
            "redshift",
            "--port",
            "5440",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Etl));
        assert_eq!(cli.backend, Some(WarehouseBackend::Redshift));
        assert_eq!(cli.port, Some(5440));
    }

    #[test]
    fn test_cli_sql_stage() {
        let cli = Cli::try_parse_from(["dwh-etl", "sql", "--stage", "populate-warehouse"]).unwrap();
        match cli.command {
            Commands::Sql { stage } => assert_eq!(stage, Some(Stage::PopulateWarehouse)),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
