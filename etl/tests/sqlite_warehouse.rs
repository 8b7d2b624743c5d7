//! Integration tests: separate runs sharing one on-disk SQLite warehouse

use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use dwh_etl::core::cli::CliConfig;
use dwh_etl::core::config::AppConfig;
use dwh_etl::data::Warehouse;
use dwh_etl::domain::{Pipeline, Stage, StageOutcome};

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Source tree, JSON config file and database path under one temp dir
fn workspace() -> (TempDir, CliConfig) {
    let dir = TempDir::new().unwrap();
    let base = dir.path();

    let events = [
        json!({
            "artist": "Elena", "auth": "Logged In", "firstName": "Ryan", "gender": "M",
            "itemInSession": 0, "lastName": "Smith", "length": 269.58322, "level": "free",
            "location": "San Jose-Sunnyvale-Santa Clara, CA", "method": "PUT", "page": "NextSong",
            "registration": 1541016707796.0, "sessionId": 583, "song": "Setanta matins",
            "status": 200, "ts": 1541990796796_i64, "userAgent": "Mozilla/5.0", "userId": "26"
        }),
        json!({
            "artist": null, "auth": "Logged Out", "firstName": null, "gender": null,
            "itemInSession": 1, "lastName": null, "length": null, "level": "free",
            "location": null, "method": "GET", "page": "Home", "registration": null,
            "sessionId": 584, "song": null, "status": 200, "ts": 1541990800000_i64,
            "userAgent": null, "userId": ""
        }),
    ];
    let events: Vec<String> = events.iter().map(|e| e.to_string()).collect();
    write_file(
        &base.join("log_data/2018/11/2018-11-12-events.json"),
        &events.join("\n"),
    );

    write_file(
        &base.join("song_data/A/A/A/TRAAAAK128F9318786.json"),
        &json!({
            "num_songs": 1, "artist_id": "AR5KOSW1187FB35FF4", "artist_latitude": 49.80388,
            "artist_longitude": 15.47491, "artist_location": "Dubai UAE", "artist_name": "Elena",
            "song_id": "SOMZWCG12A8C13C222", "title": "Setanta matins",
            "duration": 269.58322, "year": 0
        })
        .to_string(),
    );

    let config_path = base.join("dwh.json");
    write_file(
        &config_path,
        &json!({
            "warehouse": {
                "backend": "sqlite",
                "sqlite": { "path": base.join("dwh.db").to_string_lossy() }
            },
            "s3": {
                "log_data": base.join("log_data").to_string_lossy(),
                "log_jsonpath": "auto",
                "song_data": base.join("song_data").to_string_lossy()
            }
        })
        .to_string(),
    );

    let cli = CliConfig {
        config: Some(config_path),
        ..Default::default()
    };
    (dir, cli)
}

async fn run(config: &AppConfig, stages: &[Stage]) -> Vec<StageOutcome> {
    let mut warehouse = Warehouse::connect(&config.warehouse).await.unwrap();
    let outcomes = Pipeline::new(config, stages)
        .unwrap()
        .run(&mut warehouse)
        .await
        .unwrap();
    warehouse.close().await.unwrap();
    outcomes
}

#[tokio::test]
async fn test_create_tables_then_etl_in_separate_runs() {
    let (dir, cli) = workspace();
    let config = AppConfig::load(&cli).unwrap();
    assert!(config.warehouse.sqlite_path.ends_with("dwh.db"));

    run(&config, &[Stage::DropTables, Stage::CreateTables]).await;
    assert!(dir.path().join("dwh.db").exists());

    let outcomes = run(
        &config,
        &[Stage::LoadStaging, Stage::PopulateWarehouse, Stage::ReportCounts],
    )
    .await;

    let Some(StageOutcome::Counted(counts)) = outcomes.last() else {
        panic!("etl should end with a count report");
    };
    let rows: Vec<(&str, i64)> = counts.iter().map(|c| (c.table, c.rows)).collect();
    assert_eq!(
        rows,
        vec![
            ("staging_events", 2),
            ("staging_songs", 1),
            ("users", 1),
            ("songs", 1),
            ("artists", 1),
            ("time", 1),
            ("songplays", 1),
        ]
    );
}

#[tokio::test]
async fn test_counts_survive_reconnect() {
    let (_dir, cli) = workspace();
    let config = AppConfig::load(&cli).unwrap();

    run(&config, &Stage::ALL).await;
    let outcomes = run(&config, &[Stage::ReportCounts]).await;

    let Some(StageOutcome::Counted(counts)) = outcomes.first() else {
        panic!("expected a count report");
    };
    assert_eq!(counts.len(), 7);
    assert!(counts.iter().all(|c| c.rows > 0));
}

#[tokio::test]
async fn test_etl_without_tables_fails_before_loading() {
    let (_dir, cli) = workspace();
    let config = AppConfig::load(&cli).unwrap();

    let mut warehouse = Warehouse::connect(&config.warehouse).await.unwrap();
    let result = Pipeline::new(&config, &[Stage::LoadStaging])
        .unwrap()
        .run(&mut warehouse)
        .await;
    assert!(result.is_err());
    assert!(!warehouse.table_exists("staging_events").await.unwrap());
    warehouse.close().await.unwrap();
}
