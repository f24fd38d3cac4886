//! Command line, environment and file configuration of both binaries
//!
//! Every setting can come from a flag, an environment variable or a JSON
//! configuration file. Flags and environment variables win over the file,
//! the file wins over the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::api::ApiConfig;
use crate::storage::{SnapshotConfig, StorageConfig};

const DEFAULT_ADDRESS: &str = "localhost:8080";
const DEFAULT_STORE_INTERVAL: u64 = 300;
const DEFAULT_FILE_STORAGE_PATH: &str = "/tmp/metrics-db.json";
const DEFAULT_REPORT_INTERVAL: u64 = 10;
const DEFAULT_POLL_INTERVAL: u64 = 2;

pub fn read_config_file<T>(path: &Path) -> anyhow::Result<T>
where
    T: DeserializeOwned + std::fmt::Debug,
{
    let file_content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid configuration file {}: {e}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Metric server
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tally-server", version)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(short = 'a', long, env = "ADDRESS")]
    pub address: Option<String>,

    /// Seconds between snapshots; 0 writes on every update
    #[arg(short = 'i', long, env = "STORE_INTERVAL")]
    pub store_interval: Option<u64>,

    /// Snapshot file; empty disables snapshots
    #[arg(short = 'f', long, env = "FILE_STORAGE_PATH")]
    pub file_storage_path: Option<String>,

    /// Load the snapshot on startup
    #[arg(short = 'r', long, env = "RESTORE")]
    pub restore: Option<bool>,

    /// Database connection string; selects SQL storage
    #[arg(short = 'd', long, env = "DATABASE_DSN")]
    pub database_dsn: Option<String>,

    /// Shared key for request signatures
    #[arg(short = 'k', long, env = "KEY")]
    pub key: Option<String>,

    /// JSON configuration file
    #[arg(short = 'c', long, env = "CONFIG")]
    pub config: Option<PathBuf>,
}

/// Server settings as they may appear in the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerFile {
    pub address: Option<String>,
    pub store_interval: Option<u64>,
    pub store_file: Option<String>,
    pub restore: Option<bool>,
    pub database_dsn: Option<String>,
    pub key: Option<String>,
}

/// Resolved server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub address: String,
    pub store_interval: Duration,
    pub file_storage_path: Option<PathBuf>,
    pub restore: bool,
    pub database_dsn: Option<String>,
    pub key: Option<String>,
}

impl ServerArgs {
    /// Merge with the configuration file (if any) and apply defaults
    pub fn resolve(self) -> anyhow::Result<ServerConfig> {
        let file: ServerFile = match &self.config {
            Some(path) => read_config_file(path)?,
            None => ServerFile::default(),
        };

        Ok(self.merge(file))
    }

    fn merge(self, file: ServerFile) -> ServerConfig {
        let file_storage_path = self
            .file_storage_path
            .or(file.store_file)
            .unwrap_or_else(|| DEFAULT_FILE_STORAGE_PATH.to_string());

        ServerConfig {
            address: self
                .address
                .or(file.address)
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            store_interval: Duration::from_secs(
                self.store_interval
                    .or(file.store_interval)
                    .unwrap_or(DEFAULT_STORE_INTERVAL),
            ),
            file_storage_path: (!file_storage_path.is_empty())
                .then(|| PathBuf::from(file_storage_path)),
            restore: self.restore.or(file.restore).unwrap_or(true),
            database_dsn: self
                .database_dsn
                .or(file.database_dsn)
                .filter(|dsn| !dsn.is_empty()),
            key: self.key.or(file.key).filter(|key| !key.is_empty()),
        }
    }
}

impl ServerConfig {
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            database_dsn: self.database_dsn.clone(),
            snapshot: SnapshotConfig {
                path: self.file_storage_path.clone(),
                interval: self.store_interval,
            },
            restore: self.restore,
        }
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            bind_addr: self.address.clone(),
        }
    }

    /// Whether the in-memory store needs a periodic snapshot writer
    pub fn needs_snapshot_ticker(&self) -> bool {
        self.database_dsn.is_none() && self.file_storage_path.is_some()
    }
}

/// Metric agent
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "tally-agent", version)]
pub struct AgentArgs {
    /// Server address as host:port
    #[arg(short = 'a', long, env = "ADDRESS")]
    pub address: Option<String>,

    /// Seconds between reports
    #[arg(short = 'r', long, env = "REPORT_INTERVAL")]
    pub report_interval: Option<u64>,

    /// Seconds between polls
    #[arg(short = 'p', long, env = "POLL_INTERVAL")]
    pub poll_interval: Option<u64>,

    /// Shared key for request signatures
    #[arg(short = 'k', long, env = "KEY")]
    pub key: Option<String>,

    /// JSON configuration file
    #[arg(short = 'c', long, env = "CONFIG")]
    pub config: Option<PathBuf>,
}

/// Agent settings as they may appear in the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentFile {
    pub address: Option<String>,
    pub report_interval: Option<u64>,
    pub poll_interval: Option<u64>,
    pub key: Option<String>,
}

/// Resolved agent configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub address: String,
    pub report_interval: Duration,
    pub poll_interval: Duration,
    pub key: Option<String>,
}

impl AgentArgs {
    /// Merge with the configuration file (if any) and apply defaults
    pub fn resolve(self) -> anyhow::Result<AgentConfig> {
        let file: AgentFile = match &self.config {
            Some(path) => read_config_file(path)?,
            None => AgentFile::default(),
        };

        self.merge(file)
    }

    fn merge(self, file: AgentFile) -> anyhow::Result<AgentConfig> {
        let report_interval = self
            .report_interval
            .or(file.report_interval)
            .unwrap_or(DEFAULT_REPORT_INTERVAL);
        let poll_interval = self
            .poll_interval
            .or(file.poll_interval)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        if report_interval == 0 || poll_interval == 0 {
            anyhow::bail!("report and poll intervals must be at least one second");
        }

        Ok(AgentConfig {
            address: self
                .address
                .or(file.address)
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            report_interval: Duration::from_secs(report_interval),
            poll_interval: Duration::from_secs(poll_interval),
            key: self.key.or(file.key).filter(|key| !key.is_empty()),
        })
    }
}
