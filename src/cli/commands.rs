//! CLI command implementations
//!
//! Every command loads the configuration first. Commands that serve
//! requests open the data directory through full recovery; a data
//! directory that fails recovery is never served.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::flights::FlightStore;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::order::{OrderRegistry, SequenceView};
use crate::storage::{Database, DatabaseOptions};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, write_error, write_json, write_response};
use super::requests::handle_line;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// WAL sync mode (optional, default "fsync")
    #[serde(default = "default_wal_sync_mode")]
    pub wal_sync_mode: String,

    /// Verify table consistency after WAL replay (optional, default true)
    #[serde(default = "default_verify_on_open")]
    pub verify_on_open: bool,

    /// Lowest log severity written to stderr (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_wal_sync_mode() -> String {
    "fsync".to_string()
}
fn default_verify_on_open() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| CliError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config =
            serde_json::from_str(&content).map_err(|source| CliError::ConfigMalformed {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::ConfigInvalid(
                "data_dir must not be empty".to_string(),
            ));
        }

        if self.wal_sync_mode != "fsync" {
            return Err(CliError::ConfigInvalid(format!(
                "Invalid wal_sync_mode: '{}'. Only 'fsync' is allowed.",
                self.wal_sync_mode
            )));
        }

        self.log_severity()?;

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(|e| CliError::ConfigInvalid(format!("Invalid log_level: {}", e)))
    }

    /// Options for opening the data directory
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            verify_on_open: self.verify_on_open,
        }
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run one command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Exec { config } => exec(&config),
        Command::Serve { config } => serve(&config),
        Command::Show { config } => show(&config),
    }
}

/// Create the data directory and an empty WAL
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.to_path_buf()));
    }

    let db = Database::open_with(data_dir, config.database_options()).map_err(|source| {
        CliError::OpenFailed {
            path: data_dir.to_path_buf(),
            source,
        }
    })?;
    close_database(db)?;

    write_response(json!({"initialized": true, "data_dir": config.data_dir}))
}

/// Execute one request from stdin
pub fn exec(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    let line = read_request()?;
    write_json(&handle_line(&db, &line))?;

    close_database(db)
}

/// Execute requests from stdin until EOF
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    log_event_with_fields(Event::Serving, &[("data_dir", &config.data_dir)]);

    for line in read_requests() {
        match line {
            Ok(line) => write_json(&handle_line(&db, &line))?,
            Err(e) => {
                // stdin failure ends the loop; the database still closes cleanly
                write_error(e.code(), e.status_code(), &e.to_string())?;
                break;
            }
        }
    }

    close_database(db)
}

/// Print the sequence as `START <-> ... <-> END`
pub fn show(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config)?;

    let flights = FlightStore::new(&db);
    let rendered = SequenceView::load(OrderRegistry::new(&db), &flights)?.to_string();
    println!("{}", rendered);

    close_database(db)
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("config", &config_path.display().to_string()),
            ("data_dir", &config.data_dir),
        ],
    );
    Ok(config)
}

/// A data directory is initialized once its WAL file exists
fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("wal").join("wal.log").exists()
}

fn open_database(config: &Config) -> CliResult<Database> {
    if !is_initialized(config.data_path()) {
        return Err(CliError::NotInitialized(config.data_path().to_path_buf()));
    }

    Database::open_with(config.data_path(), config.database_options()).map_err(|source| {
        CliError::OpenFailed {
            path: config.data_path().to_path_buf(),
            source,
        }
    })
}

fn close_database(db: Database) -> CliResult<()> {
    db.close().map_err(CliError::CloseFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("flightseq.json");
        let data_dir = temp_dir.path().join("data");

        let config = json!({
            "data_dir": data_dir.to_string_lossy(),
            "log_level": "error"
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    #[test]
    fn test_init_creates_wal() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        let data_dir = temp_dir.path().join("data");

        init(&config_path).unwrap();

        assert!(data_dir.join("wal").join("wal.log").exists());
        assert!(data_dir.join("clean_shutdown").exists());
    }

    #[test]
    fn test_init_refuses_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        init(&config_path).unwrap();

        let result = init(&config_path);
        assert!(matches!(result, Err(CliError::AlreadyInitialized(_))));
    }

    #[test]
    fn test_exec_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let result = exec(&config_path);
        assert!(matches!(result, Err(CliError::NotInitialized(_))));
    }

    #[test]
    fn test_corrupted_data_directory_is_not_served() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);
        init(&config_path).unwrap();

        let wal_path = temp_dir.path().join("data").join("wal").join("wal.log");
        fs::write(&wal_path, [0xAB; 9]).unwrap();

        let err = show(&config_path).unwrap_err();
        assert!(matches!(err, CliError::OpenFailed { .. }));
        assert!(err.is_fatal());
        assert_eq!(err.code(), "FSEQ_CLI_OPEN_FAILED");
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CliError::ConfigUnreadable { .. }));
    }

    #[test]
    fn test_show_after_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        init(&config_path).unwrap();
        show(&config_path).unwrap();
    }

    #[test]
    fn test_config_validates_sync_mode() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flightseq.json");

        let config = json!({
            "data_dir": temp_dir.path().join("data").to_string_lossy(),
            "wal_sync_mode": "none"
        });
        fs::write(&config_path, config.to_string()).unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(matches!(err, CliError::ConfigInvalid(_)));
        assert_eq!(err.code(), "FSEQ_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_validates_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flightseq.json");

        let config = json!({
            "data_dir": temp_dir.path().join("data").to_string_lossy(),
            "log_level": "chatty"
        });
        fs::write(&config_path, config.to_string()).unwrap();

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("flightseq.json");

        let config_json = json!({
            "data_dir": temp_dir.path().join("data").to_string_lossy()
        });
        fs::write(&config_path, config_json.to_string()).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.wal_sync_mode, "fsync");
        assert!(config.verify_on_open);
        assert_eq!(config.log_severity().unwrap(), Severity::Info);
        assert!(config.database_options().verify_on_open);
    }
}
