// ⚙️ Configuration - Process environment (with optional .env file)

use anyhow::{Context, Result};
use std::path::PathBuf;
use thiserror::Error;

/// URL prefix every route is served under
pub const PATH_PREFIX: &str = "/viz/asi";
pub const APP_TITLE: &str = "Annual Survey of Industries";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 4574;
const DEFAULT_INDICATOR_CSV: &str = "asi_indicator.csv";
const SUPPORTED_ENGINE: &str = "sqlite";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("unsupported database engine '{0}' (only sqlite is available)")]
    UnsupportedEngine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub indicator_csv: PathBuf,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = lookup("ENGINE").unwrap_or_else(|| SUPPORTED_ENGINE.to_string());
        if !engine.eq_ignore_ascii_case(SUPPORTED_ENGINE) {
            return Err(ConfigError::UnsupportedEngine(engine).into());
        }

        let database_path = lookup("ASI_DATABASE")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("ASI_DATABASE"))?;

        let indicator_csv = lookup("ASI_INDICATOR_CSV")
            .unwrap_or_else(|| DEFAULT_INDICATOR_CSV.to_string())
            .into();

        let host = lookup("ASI_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("ASI_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("ASI_PORT is not a valid port: '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        Ok(AppConfig {
            database_path,
            indicator_csv,
            host,
            port,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
