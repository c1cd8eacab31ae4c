//! Process-boundary helpers shared by the binaries.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, StoreCredentials};
use crate::store::PredictionStore;
use crate::store::rest::RestStore;
use crate::store::sqlite::SqliteStore;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0:#}")]
    Store(anyhow::Error),
}

impl StartupError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            StartupError::Config(_) => ExitCode::from(EXIT_CONFIG),
            StartupError::Store(_) => ExitCode::from(EXIT_FAILURE),
        }
    }
}

/// Loads `.env.local` / `.env` and installs the stderr log subscriber.
pub fn init_process() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The embedded store when `--db` is given, otherwise the remote store
/// configured from the environment.
pub fn open_store(db_path: Option<PathBuf>) -> Result<Box<dyn PredictionStore>, StartupError> {
    match db_path {
        Some(path) => SqliteStore::open(&path)
            .map(|s| Box::new(s) as Box<dyn PredictionStore>)
            .map_err(StartupError::Store),
        None => {
            let creds = StoreCredentials::from_env()?;
            RestStore::new(&creds)
                .map(|s| Box::new(s) as Box<dyn PredictionStore>)
                .map_err(StartupError::Store)
        }
    }
}

/// Value of `--name=value` or `--name value`.
pub fn flag_value(args: &[String], name: &str) -> Option<String> {
    let long = format!("--{name}");
    let prefixed = format!("{long}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefixed) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == long
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn db_path_arg(args: &[String]) -> Option<PathBuf> {
    flag_value(args, "db").map(PathBuf::from)
}
