//! Error types for the pairs signal pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures raised by the Johansen estimator for a single window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JohansenError {
    #[error("window has {rows} complete rows, at least {required} needed for a lag-1 VECM")]
    WindowTooShort { rows: usize, required: usize },

    #[error("singular {0} matrix")]
    SingularMatrix(&'static str),

    #[error("eigen-decomposition did not converge")]
    NoConvergence,

    #[error("auxiliary regression failed: {0}")]
    Regression(&'static str),

    #[error("non-finite value in window")]
    NonFinite,
}

/// Main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PairsError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Hedge ratios not available; call signals() before weights()")]
    MissingHedgeRatios,

    #[error("Hedge ratio estimation failed at step {step} ({timestamp}): {source}")]
    HedgeRatio {
        step: usize,
        timestamp: DateTime<Utc>,
        #[source]
        source: JohansenError,
    },

    #[error("No data loaded")]
    NoData,

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PairsError>;
