use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::error::DriverError;

const ENV_PREFIX: &str = "MEDIAN_";

/// Which structure holds the values the driver mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum BackendKind {
    Vec,
    Tree,
}

impl TryFrom<String> for BackendKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "vec" => Ok(BackendKind::Vec),
            "tree" => Ok(BackendKind::Tree),
            other => Err(format!("unknown backend `{other}`, expected `vec` or `tree`")),
        }
    }
}

/// Driver settings, read from `MEDIAN_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_max_value")]
    pub max_value: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_verify_each_step")]
    pub verify_each_step: bool,
    #[serde(default = "default_audit_interval_ms")]
    pub audit_interval_ms: u64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_size() -> usize {
    50
}

fn default_max_value() -> u32 {
    30
}

fn default_max_iterations() -> u64 {
    10_000
}

fn default_workers() -> usize {
    4
}

fn default_backend() -> BackendKind {
    BackendKind::Vec
}

fn default_verify_each_step() -> bool {
    true
}

fn default_audit_interval_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_value: default_max_value(),
            max_iterations: default_max_iterations(),
            workers: default_workers(),
            backend: default_backend(),
            verify_each_step: default_verify_each_step(),
            audit_interval_ms: default_audit_interval_ms(),
            seed: None,
            log_level: default_log_level(),
        }
    }
}

impl DriverConfig {
    /// Loads `.env` if there is one, then reads the process environment.
    pub fn from_env() -> Result<Self, DriverError> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn level(&self) -> Result<Level, DriverError> {
        Level::from_str(&self.log_level).map_err(|_| {
            DriverError::InvalidConfig(format!("unknown log level `{}`", self.log_level))
        })
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.max_size == 0 {
            return Err(DriverError::InvalidConfig("max_size must be positive".into()));
        }
        if self.max_value == 0 {
            return Err(DriverError::InvalidConfig("max_value must be positive".into()));
        }
        if self.workers == 0 {
            return Err(DriverError::InvalidConfig("workers must be positive".into()));
        }
        if self.audit_interval_ms == 0 {
            return Err(DriverError::InvalidConfig(
                "audit_interval_ms must be positive".into(),
            ));
        }
        self.level()?;
        Ok(())
    }
}
