//! CSV Data Source
//!
//! Loads a student row from a remote CSV URL or a local CSV file using Polars,
//! resolves the header aliases and returns the raw (un-normalized) features of
//! the first data row.
//!
//! Remote flow:
//! 1. Validate the URL (non-empty, ends in `.csv`) before any network call
//! 2. GET with a bounded timeout (30 s by default)
//! 3. Require a `Content-Type` containing `csv` or `text/plain`
//! 4. Parse the body (header row + data rows)

use crate::error::{PredictorError, Result};
use crate::features::{RawFeatures, RawValue};
use crate::utils::resolve_columns;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// Upper bound on a remote CSV download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Body and content type of a successful HTTP response
#[derive(Debug, Clone)]
pub struct HttpBody {
    /// Lowercased `Content-Type` header ("" when absent)
    pub content_type: String,
    pub text: String,
}

/// Blocking HTTP GET used by [`CsvSource`]
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpBody>;
}

/// ureq-backed fetcher with a whole-request timeout
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl HttpFetch for UreqFetcher {
    fn get(&self, url: &str) -> Result<HttpBody> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(PredictorError::HttpStatus {
                    status,
                    url: url.to_string(),
                })
            }
            Err(e) => return Err(PredictorError::Network(e.to_string())),
        };

        let content_type = response
            .header("content-type")
            .unwrap_or("")
            .to_lowercase();

        let text = response
            .into_string()
            .map_err(|e| PredictorError::Network(format!("failed to read body: {}", e)))?;

        Ok(HttpBody { content_type, text })
    }
}

/// Remote/local CSV loader
pub struct CsvSource {
    fetcher: Box<dyn HttpFetch>,
}

impl CsvSource {
    /// CSV source backed by a real HTTP client
    pub fn new(timeout: Duration) -> Self {
        Self::with_fetcher(UreqFetcher::new(timeout))
    }

    pub fn with_fetcher(fetcher: impl HttpFetch + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
        }
    }

    /// Download and parse a remote CSV file
    pub fn load_url(&self, url: &str) -> Result<DataFrame> {
        let url = validate_csv_url(url)?;

        tracing::info!("Fetching CSV from {}", url);
        let body = self.fetcher.get(url)?;
        check_content_type(&body.content_type)?;

        let df = parse_csv(&body.text)?;
        tracing::info!(
            "Loaded CSV from {}: {} rows × {} columns",
            url,
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// Download a remote CSV file and extract the first row's raw features
    pub fn features_from_url(&self, url: &str) -> Result<RawFeatures> {
        let df = self.load_url(url)?;
        first_row_features(&df)
    }
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

/// Check the URL shape before any network call; returns the trimmed URL
pub fn validate_csv_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(PredictorError::InvalidUrl("URL cannot be empty".to_string()));
    }
    if !url.to_lowercase().ends_with(".csv") {
        return Err(PredictorError::InvalidUrl(format!(
            "only CSV files are allowed, URL must end in .csv: {}",
            url
        )));
    }
    Ok(url)
}

/// Accept `text/csv`, `application/csv`, `text/plain` and friends
pub fn check_content_type(content_type: &str) -> Result<()> {
    let content_type = content_type.to_lowercase();
    if content_type.contains("csv") || content_type.contains("text/plain") {
        Ok(())
    } else {
        Err(PredictorError::ContentType(content_type))
    }
}

/// Parse CSV text (header row required) into a DataFrame
pub fn parse_csv(text: &str) -> Result<DataFrame> {
    if text.trim().is_empty() {
        return Err(PredictorError::EmptyCsv);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
        .map_err(|e| PredictorError::CsvParse(e.to_string()))?;

    if df.height() == 0 {
        return Err(PredictorError::EmptyCsv);
    }
    Ok(df)
}

/// Load a local CSV file
pub fn load_csv_file(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| PredictorError::CsvParse(format!("{}: {}", path.display(), e)))?
        .finish()
        .map_err(|e| PredictorError::CsvParse(format!("{}: {}", path.display(), e)))?;

    if df.height() == 0 {
        return Err(PredictorError::EmptyCsv);
    }
    tracing::info!("Loaded CSV file {:?}: {} rows", path, df.height());
    Ok(df)
}

/// Raw features of the first data row, keyed by canonical field name
///
/// Only the first row is used; any further rows are ignored.
pub fn first_row_features(df: &DataFrame) -> Result<RawFeatures> {
    if df.height() == 0 {
        return Err(PredictorError::EmptyCsv);
    }
    if df.height() > 1 {
        tracing::debug!("CSV has {} rows, using the first one", df.height());
    }

    let columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut raw = RawFeatures::default();
    for (feature, column) in resolve_columns(&columns)? {
        let cell = df
            .column(&column)
            .and_then(|c| c.get(0))
            .map_err(|e| PredictorError::CsvParse(e.to_string()))?;

        match any_value_to_raw(&cell) {
            Some(value) => {
                tracing::debug!("{} ← column '{}' = {}", feature, column, value);
                raw.insert(feature.name().to_string(), value);
            }
            // Null cells are treated like an absent field
            None => {
                return Err(PredictorError::MissingField {
                    field: feature.name(),
                })
            }
        }
    }

    Ok(raw)
}

/// Convert a Polars cell into a raw value (None for nulls)
fn any_value_to_raw(value: &AnyValue) -> Option<RawValue> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(RawValue::Text(s.to_string())),
        AnyValue::StringOwned(s) => Some(RawValue::Text(s.to_string())),
        AnyValue::Boolean(b) => Some(RawValue::Number(if *b { 1.0 } else { 0.0 })),
        other => match other.extract::<f64>() {
            Some(n) => Some(RawValue::Number(n)),
            None => Some(RawValue::Text(other.to_string())),
        },
    }
}
