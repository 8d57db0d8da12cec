use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Insufficient history: {required} points required, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("No regressor rows remain after dropping indicator warm-up")]
    EmptyRegressorFrame,

    #[error("Model fit failed: {0}")]
    ModelFitError(String),

    #[error("Data source timed out after {0:.0?}")]
    DataSourceTimeout(Duration),

    #[error("Model fit timed out after {0:.0?}")]
    ModelFitTimeout(Duration),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Chart store error: {0}")]
    ChartStore(String),
}

impl ForecastError {
    /// Short machine-readable tag for per-symbol outcome reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataSourceUnavailable(_) => "data_source_unavailable",
            ForecastError::SymbolNotFound(_) => "symbol_not_found",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::EmptyRegressorFrame => "empty_regressor_frame",
            ForecastError::ModelFitError(_) => "model_fit_error",
            ForecastError::DataSourceTimeout(_) => "data_source_timeout",
            ForecastError::ModelFitTimeout(_) => "model_fit_timeout",
            ForecastError::InvalidRequest(_) => "invalid_request",
            ForecastError::ChartStore(_) => "chart_store_error",
        }
    }
}
