//! Ordered pipeline of named stages
//!
//! Each stage declares the tables that must exist before it runs. The runner
//! checks them against the live catalog, then executes stages strictly in
//! order and stops at the first failure. Any contiguous subset of stages can
//! be run on its own, e.g. the transformer against pre-seeded staging tables.

use anyhow::Result;

use super::load::{self, LoadReport, StagingLoad, copy_statement, staging_loads};
use super::schema::{self, STAGING_TABLES, WAREHOUSE_TABLES};
use super::transform::{self, TableInsert};
use super::verify::{self, TableCount};
use crate::core::config::{AppConfig, StagingSources, WarehouseBackend};
use crate::data::sql::dialect_for;
use crate::data::{DataError, Warehouse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DropTables,
    CreateTables,
    LoadStaging,
    PopulateWarehouse,
    ReportCounts,
}

impl Stage {
    /// Every stage, in execution order
    pub const ALL: [Stage; 5] = [
        Stage::DropTables,
        Stage::CreateTables,
        Stage::LoadStaging,
        Stage::PopulateWarehouse,
        Stage::ReportCounts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DropTables => "drop-tables",
            Self::CreateTables => "create-tables",
            Self::LoadStaging => "load-staging",
            Self::PopulateWarehouse => "populate-warehouse",
            Self::ReportCounts => "report-counts",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Tables that must exist before this stage runs
    pub fn requires(&self) -> Vec<&'static str> {
        match self {
            Self::DropTables | Self::CreateTables => Vec::new(),
            Self::LoadStaging => STAGING_TABLES.iter().map(|t| t.name).collect(),
            Self::PopulateWarehouse | Self::ReportCounts => STAGING_TABLES
                .iter()
                .chain(WAREHOUSE_TABLES.iter())
                .map(|t| t.name)
                .collect(),
        }
    }
}

/// What one stage did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Dropped,
    Created,
    Loaded(LoadReport),
    Populated(Vec<TableInsert>),
    Counted(Vec<TableCount>),
}

/// Fixed sequence of stages bound to one configuration
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    stages: Vec<Stage>,
    /// Resolved up front when the pipeline loads staging
    sources: Option<StagingSources>,
}

impl<'a> Pipeline<'a> {
    /// Build a pipeline, validating the inputs its stages need before any
    /// database work
    pub fn new(config: &'a AppConfig, stages: &[Stage]) -> Result<Self> {
        let mut stages = stages.to_vec();
        stages.sort_by_key(|stage| Stage::ALL.iter().position(|s| s == stage));
        stages.dedup();

        let sources = if stages.contains(&Stage::LoadStaging) {
            Some(config.staging_sources()?)
        } else {
            None
        };

        Ok(Self {
            config,
            stages,
            sources,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order against `warehouse`
    pub async fn run(&self, warehouse: &mut Warehouse) -> Result<Vec<StageOutcome>, DataError> {
        let mut outcomes = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            self.check_preconditions(*stage, warehouse).await?;

            let start = std::time::Instant::now();
            tracing::info!(stage = stage.name(), "Running stage");
            let outcome = self.run_stage(*stage, warehouse).await?;
            tracing::info!(
                stage = stage.name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Stage complete"
            );
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn check_preconditions(
        &self,
        stage: Stage,
        warehouse: &mut Warehouse,
    ) -> Result<(), DataError> {
        for table in stage.requires() {
            if !warehouse.table_exists(table).await? {
                return Err(DataError::Precondition {
                    stage: stage.name(),
                    table,
                });
            }
        }
        Ok(())
    }

    async fn run_stage(
        &self,
        stage: Stage,
        warehouse: &mut Warehouse,
    ) -> Result<StageOutcome, DataError> {
        match stage {
            Stage::DropTables => {
                schema::drop_all(warehouse).await?;
                Ok(StageOutcome::Dropped)
            }
            Stage::CreateTables => {
                schema::create_all(warehouse).await?;
                Ok(StageOutcome::Created)
            }
            Stage::LoadStaging => {
                let sources = self.sources.as_ref().ok_or_else(|| {
                    DataError::Config("Staging sources were not resolved".into())
                })?;
                let report = load::load_staging(
                    warehouse,
                    sources,
                    self.config.warehouse.iam_role_arn.as_deref(),
                    &self.config.aws,
                )
                .await?;
                tracing::info!(rows = report.total_rows(), "Staging loaded");
                Ok(StageOutcome::Loaded(report))
            }
            Stage::PopulateWarehouse => Ok(StageOutcome::Populated(
                transform::populate_warehouse(warehouse).await?,
            )),
            Stage::ReportCounts => {
                let counts = verify::report_counts(warehouse).await?;
                for count in &counts {
                    tracing::debug!(table = count.table, rows = count.rows, "{}", count);
                }
                Ok(StageOutcome::Counted(counts))
            }
        }
    }

    /// Statements each stage would execute on the configured backend
    pub fn statements(&self) -> Vec<(Stage, Vec<String>)> {
        let backend = self.config.warehouse.backend;
        let dialect = dialect_for(backend);

        self.stages
            .iter()
            .map(|stage| {
                let statements = match stage {
                    Stage::DropTables => schema::drop_statements(dialect),
                    Stage::CreateTables => schema::create_statements(dialect),
                    Stage::LoadStaging => self
                        .sources
                        .as_ref()
                        .map(|sources| self.load_statements(backend, sources))
                        .unwrap_or_default(),
                    Stage::PopulateWarehouse => transform::derivations(dialect)
                        .into_iter()
                        .map(|d| d.sql)
                        .collect(),
                    Stage::ReportCounts => verify::count_statements(),
                };
                (*stage, statements)
            })
            .collect()
    }

    fn load_statements(&self, backend: WarehouseBackend, sources: &StagingSources) -> Vec<String> {
        let role = self.config.warehouse.iam_role_arn.as_deref().unwrap_or_default();
        staging_loads(sources)
            .iter()
            .map(|load| match backend {
                WarehouseBackend::Redshift => {
                    copy_statement(load, role, self.config.aws.region.as_deref())
                }
                WarehouseBackend::Sqlite => describe_client_load(load),
            })
            .collect()
    }
}

fn describe_client_load(load: &StagingLoad) -> String {
    format!(
        "-- {}: client-side load of '{}' (json '{}')",
        load.table.name,
        load.source,
        load.format.copy_argument()
    )
}
