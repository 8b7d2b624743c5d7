//! Core application

use anyhow::{Context, Result};

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG, ENV_LOG_FORMAT};
use crate::data::Warehouse;
use crate::domain::{Pipeline, Stage, StageOutcome};

pub struct CoreApp {
    pub config: AppConfig,
}

/// Log line format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self {
            config: AppConfig::load(&cli_config)?,
        };

        let stages = Self::stages_for(&command);
        match command {
            Commands::Sql { .. } => app.print_statements(&stages),
            _ => app.execute(&stages).await,
        }
    }

    /// Stages a command covers, in order
    fn stages_for(command: &Commands) -> Vec<Stage> {
        match command {
            Commands::CreateTables => vec![Stage::DropTables, Stage::CreateTables],
            Commands::Etl => vec![
                Stage::LoadStaging,
                Stage::PopulateWarehouse,
                Stage::ReportCounts,
            ],
            Commands::Run | Commands::Sql { stage: None } => Stage::ALL.to_vec(),
            Commands::Counts => vec![Stage::ReportCounts],
            Commands::Sql { stage: Some(stage) } => vec![*stage],
        }
    }

    async fn execute(&self, stages: &[Stage]) -> Result<()> {
        // Configuration problems surface here, before connecting
        let pipeline = Pipeline::new(&self.config, stages)?;

        let mut warehouse = Warehouse::connect(&self.config.warehouse)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to {} warehouse",
                    self.config.warehouse.backend
                )
            })?;

        let result = pipeline.run(&mut warehouse).await;

        // Close even when a stage failed; the stage error takes precedence
        let closed = warehouse.close().await;
        let outcomes = result?;
        closed?;

        for outcome in &outcomes {
            if let StageOutcome::Counted(counts) = outcome {
                for count in counts {
                    println!("{}", count);
                }
            }
        }

        tracing::info!(stages = outcomes.len(), "Pipeline complete");
        Ok(())
    }

    /// Print what each stage would execute, without connecting
    fn print_statements(&self, stages: &[Stage]) -> Result<()> {
        let pipeline = Pipeline::new(&self.config, stages)?;

        for (stage, statements) in pipeline.statements() {
            println!("-- stage: {}", stage.name());
            for sql in statements {
                println!("{};\n", sql);
            }
        }
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_env_filter(filter);

        match LogFormat::parse(std::env::var(ENV_LOG_FORMAT).ok().as_deref()) {
            LogFormat::Json => builder.json().init(),
            LogFormat::Compact => builder.with_ansi(true).compact().init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("xml")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(None), LogFormat::Compact);
    }

    #[test]
    fn test_create_tables_drops_first() {
        assert_eq!(
            CoreApp::stages_for(&Commands::CreateTables),
            vec![Stage::DropTables, Stage::CreateTables]
        );
    }

    #[test]
    fn test_etl_does_not_touch_schema() {
        let stages = CoreApp::stages_for(&Commands::Etl);
        assert!(!stages.contains(&Stage::DropTables));
        assert!(!stages.contains(&Stage::CreateTables));
        assert_eq!(stages.last(), Some(&Stage::ReportCounts));
    }

    #[test]
    fn test_run_is_every_stage() {
        assert_eq!(CoreApp::stages_for(&Commands::Run), Stage::ALL.to_vec());
    }

    #[test]
    fn test_sql_stage_selection() {
        assert_eq!(
            CoreApp::stages_for(&Commands::Sql {
                stage: Some(Stage::PopulateWarehouse)
            }),
            vec![Stage::PopulateWarehouse]
        );
        assert_eq!(
            CoreApp::stages_for(&Commands::Sql { stage: None }).len(),
            5
        );
    }
}
