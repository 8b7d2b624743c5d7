// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "dwh_etl";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".dwh-etl";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "dwh.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "DWH_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "DWH_LOG";

/// Environment variable for the log line format (compact or json)
pub const ENV_LOG_FORMAT: &str = "DWH_LOG_FORMAT";

// =============================================================================
// Environment Variables - Warehouse
// =============================================================================

/// Environment variable for the warehouse backend (redshift or sqlite)
pub const ENV_BACKEND: &str = "DWH_BACKEND";

/// Environment variable for the SQLite database path
pub const ENV_SQLITE_PATH: &str = "DWH_SQLITE_PATH";

/// Environment variable for the cluster endpoint
pub const ENV_HOST: &str = "DWH_HOST";

/// Environment variable for the cluster port
pub const ENV_PORT: &str = "DWH_PORT";

/// Environment variable for the database name
pub const ENV_DB_NAME: &str = "DWH_DB_NAME";

/// Environment variable for the database user
pub const ENV_DB_USER: &str = "DWH_DB_USER";

/// Environment variable for the database password
pub const ENV_DB_PASSWORD: &str = "DWH_DB_PASSWORD";

/// Environment variable for the bulk-load role ARN
pub const ENV_IAM_ROLE_ARN: &str = "DWH_IAM_ROLE_ARN";

// =============================================================================
// Environment Variables - Sources
// =============================================================================

/// Environment variable for the event log location
pub const ENV_LOG_DATA: &str = "DWH_LOG_DATA";

/// Environment variable for the event log JSONPaths document
pub const ENV_LOG_JSONPATH: &str = "DWH_LOG_JSONPATH";

/// Environment variable for the song catalog location
pub const ENV_SONG_DATA: &str = "DWH_SONG_DATA";

/// Environment variable for the AWS region of the source bucket
pub const ENV_AWS_REGION: &str = "DWH_AWS_REGION";

// =============================================================================
// Warehouse Defaults
// =============================================================================

/// Default Redshift port
pub const DEFAULT_REDSHIFT_PORT: u16 = 5439;

/// Default SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "dwh.db";

/// Special SQLite path for a throwaway in-memory warehouse
pub const SQLITE_MEMORY_PATH: &str = ":memory:";

/// SQLite busy timeout
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Rows per INSERT chunk in the client-side staging loader
pub const LOCAL_COPY_BATCH_ROWS: usize = 500;

// =============================================================================
// Source Formats
// =============================================================================

/// Page value marking a song-play event
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// JSON format keyword: match keys to column names
pub const JSON_FORMAT_AUTO: &str = "auto";

/// JSON format keyword: match keys to column names, case-insensitive
pub const JSON_FORMAT_AUTO_IGNORECASE: &str = "auto ignorecase";
