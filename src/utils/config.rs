use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::connection::ConnectionInfo;
use crate::db::runner::RunOptions;
use crate::db::validate::{DEFAULT_TIMEOUT, DEFAULT_WORKERS};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerConfig {
    pub saved_connections: Vec<ConnectionInfo>,
    pub stop_on_error: bool,
    pub transactional: bool,
    pub batched: bool,
    pub print_statements: bool,
    pub validator_workers: usize,
    pub validator_timeout_secs: u64,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self {
            saved_connections: Vec::new(),
            stop_on_error: true,
            transactional: false,
            batched: false,
            print_statements: false,
            validator_workers: DEFAULT_WORKERS,
            validator_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("dbrunner");
            path.push("config.json");
            path
        })
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::new(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(config) = serde_json::from_str(&content) {
                    return config;
                }
            }
        }
        Self::new()
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Execution defaults for runs that pass no explicit flags.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            stop_on_error: self.stop_on_error,
            transactional: self.transactional,
            batched: self.batched,
            print_statements: self.print_statements,
        }
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator_timeout_secs)
    }

    pub fn add_connection(&mut self, info: ConnectionInfo) {
        self.saved_connections.retain(|c| c.name != info.name);
        self.saved_connections.insert(0, info);
        self.saved_connections.truncate(20);
    }

    pub fn get_connection_by_name(&self, name: &str) -> Option<&ConnectionInfo> {
        self.saved_connections.iter().find(|c| c.name == name)
    }

    pub fn remove_connection(&mut self, name: &str) {
        self.saved_connections.retain(|c| c.name != name);
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}
