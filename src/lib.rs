//! Math Score Predictor
//!
//! Predicts a student's math score from seven attributes with a pre-trained
//! linear regression model.
//!
//! - `features`: canonical feature order, raw → numeric normalization
//! - `utils/`: categorical synonym tables and CSV header aliases
//! - `data`: remote/local CSV loading with Polars
//! - `model`: artifact search, decoding and process-wide caching
//! - `predictor`: model invocation, clamping, rounding, confidence
//! - `form`: form controls, defaults and input echo
//! - `api_server`, `web/`: axum HTML form + JSON API (feature `api`)

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod form;
pub mod model;
pub mod predictor;
pub mod utils;

#[cfg(feature = "api")]
pub mod api_server;

#[cfg(feature = "api")]
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::CsvSource;
pub use error::{PredictorError, Result};
pub use features::{Feature, FeatureRecord, RawFeatures, RawValue, FEATURE_COUNT};
pub use form::FormSubmission;
pub use model::{global_loader, LinearRegression, LoadedModel, ModelLoader, Regressor};
pub use predictor::{PredictionResult, Predictor, CONFIDENCE};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
