use median_state::MedianError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unable to read the configuration from the environment: {0}")]
    Environment(#[from] envy::Error),
    #[error(transparent)]
    Median(#[from] MedianError),
    #[error("A driver task failed to complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}
