use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MedianError {
    #[error("invalid value `{0}`: only finite values are supported")]
    InvalidArgument(f64),
    #[error("no data")]
    NoData,
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

/// Rejects NaN and the infinities.
pub(crate) fn check_finite(value: f64) -> Result<f64, MedianError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MedianError::InvalidArgument(value))
    }
}
