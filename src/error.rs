//! Error taxonomy for normalization, CSV input, model loading and prediction

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictorError>;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// A required feature was absent (or null) in the raw input
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field {field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field {field} does not accept the value {value}")]
    InvalidChoice { field: &'static str, value: f64 },

    /// No header alias matched a canonical field
    #[error("no column found for {field}. Available columns: {available:?}")]
    ColumnNotFound {
        field: &'static str,
        available: Vec<String>,
    },

    #[error("invalid CSV URL: {0}")]
    InvalidUrl(String),

    #[error("could not reach URL: {0}")]
    Network(String),

    #[error("server answered {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response does not look like a CSV file. Content-Type: {0:?}")]
    ContentType(String),

    #[error("CSV file is empty or has no data rows")]
    EmptyCsv,

    #[error("failed to parse CSV: {0}")]
    CsvParse(String),

    #[error("model is not available; check that the model artifact exists")]
    ModelUnavailable,

    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl PredictorError {
    /// True for errors caused by the caller's input rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PredictorError::MissingField { .. }
                | PredictorError::InvalidNumber { .. }
                | PredictorError::OutOfRange { .. }
                | PredictorError::InvalidChoice { .. }
                | PredictorError::ColumnNotFound { .. }
                | PredictorError::InvalidUrl(_)
                | PredictorError::EmptyCsv
                | PredictorError::CsvParse(_)
        )
    }
}
