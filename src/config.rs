//! Runtime configuration from environment variables
//!
//! | variable                 | default | meaning                                   |
//! |--------------------------|---------|-------------------------------------------|
//! | `PORT`                   | 3000    | HTTP server port                          |
//! | `MODEL_PATH`             | unset   | artifact tried before the default paths   |
//! | `CSV_FETCH_TIMEOUT_SECS` | 30      | cap on a remote CSV download              |

use crate::data::DEFAULT_FETCH_TIMEOUT;
use crate::model::default_candidates;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub model_path: Option<PathBuf>,
    pub csv_fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            model_path: None,
            csv_fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup; unparsable values keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(defaults.port);

        let model_path = lookup("MODEL_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let csv_fetch_timeout = lookup("CSV_FETCH_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.csv_fetch_timeout);

        Self {
            port,
            model_path,
            csv_fetch_timeout,
        }
    }

    /// Model paths in search order: `MODEL_PATH` first, then the defaults
    pub fn model_candidates(&self) -> Vec<PathBuf> {
        self.model_path
            .iter()
            .cloned()
            .chain(default_candidates())
            .collect()
    }

    pub fn log(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  PORT: {}", self.port);
        tracing::info!(
            "  MODEL_PATH: {}",
            self.model_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(default search)".to_string())
        );
        tracing::info!("  CSV_FETCH_TIMEOUT_SECS: {}", self.csv_fetch_timeout.as_secs());
    }
}
