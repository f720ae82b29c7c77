//! Model Loading
//!
//! Locates the pre-trained linear regression artifact, decodes it, and caches the
//! result for the lifetime of the loader (the process-wide loader lives forever).
//!
//! Search order: every candidate path in turn. For each existing file:
//! 1. JSON model document (preferred)
//! 2. `feature,coefficient` table decoded as UTF-8
//! 3. the same table decoded as Latin-1 (legacy exports)
//!
//! The first success wins. If nothing loads the loader reports `None` rather than
//! an error; callers surface that as "model unavailable".

use crate::error::{PredictorError, Result};
use crate::features::{Feature, FEATURE_COUNT};
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Artifact file name searched for in each candidate directory
pub const MODEL_FILE_NAME: &str = "lin_reg_model_opt.model";

const CANDIDATE_DIRS: [&str; 8] = [
    "app/models",
    "models",
    "model",
    ".",
    "../app/models",
    "../models",
    "../model",
    "..",
];

/// Default candidate paths, relative to the working directory, in priority order
pub fn default_candidates() -> Vec<PathBuf> {
    CANDIDATE_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(MODEL_FILE_NAME))
        .collect()
}

/// Regression model contract: one output per input row
pub trait Regressor: Send + Sync {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>>;

    /// Implementation type name reported in prediction metadata
    fn type_name(&self) -> &str;
}

/// Ordinary least squares model: `intercept + Σ coefficient_i × x_i`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
    model_type: String,
}

impl LinearRegression {
    pub fn new(coefficients: [f64; FEATURE_COUNT], intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            model_type: DEFAULT_MODEL_TYPE.to_string(),
        }
    }

    pub fn coefficients(&self) -> &[f64; FEATURE_COUNT] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn from_document(doc: ModelDocument) -> anyhow::Result<Self> {
        if let Some(names) = &doc.feature_names {
            let expected: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
            if names.iter().map(|s| s.as_str()).ne(expected.iter().copied()) {
                bail!(
                    "feature_names {:?} do not match the expected order {:?}",
                    names,
                    expected
                );
            }
        }

        let coefficients: [f64; FEATURE_COUNT] =
            doc.coefficients.as_slice().try_into().map_err(|_| {
                anyhow!(
                    "expected {} coefficients, found {}",
                    FEATURE_COUNT,
                    doc.coefficients.len()
                )
            })?;

        if !doc.intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            bail!("model parameters must be finite");
        }

        Ok(Self {
            coefficients,
            intercept: doc.intercept,
            model_type: doc.model_type,
        })
    }
}

impl Regressor for LinearRegression {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Result<Vec<f64>> {
        Ok(rows
            .iter()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(self.coefficients.iter())
                        .map(|(x, c)| x * c)
                        .sum::<f64>()
            })
            .collect())
    }

    fn type_name(&self) -> &str {
        &self.model_type
    }
}

const DEFAULT_MODEL_TYPE: &str = "LinearRegression";

fn default_model_type() -> String {
    DEFAULT_MODEL_TYPE.to_string()
}

/// Preferred on-disk format
#[derive(Debug, Deserialize)]
struct ModelDocument {
    #[serde(default = "default_model_type")]
    model_type: String,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Text decoding used for the coefficient table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Which strategy decoded an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Json,
    CoefficientTable(TextEncoding),
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Json => f.write_str("json"),
            ArtifactFormat::CoefficientTable(TextEncoding::Utf8) => f.write_str("table (utf-8)"),
            ArtifactFormat::CoefficientTable(TextEncoding::Latin1) => {
                f.write_str("table (latin-1)")
            }
        }
    }
}

/// A loaded model with its provenance
pub struct LoadedModel {
    model: Box<dyn Regressor>,
    source: PathBuf,
    format: ArtifactFormat,
}

impl LoadedModel {
    pub fn new(model: impl Regressor + 'static, source: PathBuf, format: ArtifactFormat) -> Self {
        Self {
            model: Box::new(model),
            source,
            format,
        }
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn type_name(&self) -> &str {
        self.model.type_name()
    }

    /// Path the artifact was loaded from
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("type", &self.type_name())
            .field("source", &self.source)
            .field("format", &self.format)
            .finish()
    }
}

/// Decode one artifact file, trying every format in priority order
pub fn load_artifact(path: &Path) -> anyhow::Result<LoadedModel> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read model artifact: {:?}", path))?;

    let json_error = match parse_json(&bytes) {
        Ok(model) => return Ok(LoadedModel::new(model, path.to_path_buf(), ArtifactFormat::Json)),
        Err(e) => e,
    };
    tracing::debug!("{:?}: not a JSON model ({}), trying coefficient table", path, json_error);

    if let Ok(text) = std::str::from_utf8(&bytes) {
        match parse_table(text) {
            Ok(model) => {
                return Ok(LoadedModel::new(
                    model,
                    path.to_path_buf(),
                    ArtifactFormat::CoefficientTable(TextEncoding::Utf8),
                ))
            }
            Err(e) => tracing::debug!("{:?}: UTF-8 table decode failed: {}", path, e),
        }
    }

    // Latin-1 maps every byte to the code point of the same value
    let latin1: String = bytes.iter().map(|&b| char::from(b)).collect();
    let model = parse_table(&latin1)
        .with_context(|| format!("{:?}: no decoding strategy succeeded (json: {})", path, json_error))?;

    Ok(LoadedModel::new(
        model,
        path.to_path_buf(),
        ArtifactFormat::CoefficientTable(TextEncoding::Latin1),
    ))
}

fn parse_json(bytes: &[u8]) -> anyhow::Result<LinearRegression> {
    let doc: ModelDocument =
        serde_json::from_slice(bytes).with_context(|| "Failed to parse model JSON")?;
    LinearRegression::from_document(doc)
}

/// Parse a `feature,coefficient` table (`#` lines are comments)
///
/// ```text
/// # exported 2024-01-01
/// feature,coefficient
/// intercept,-8.5
/// gender,13.0
/// ...
/// ```
fn parse_table(text: &str) -> anyhow::Result<LinearRegression> {
    let mut lines = text
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let header = lines.next().ok_or_else(|| anyhow!("empty coefficient table"))?;
    if !header.eq_ignore_ascii_case("feature,coefficient") {
        bail!("unexpected table header: {:?}", header);
    }

    let mut coefficients: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];
    let mut intercept = None;

    for line in lines {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            bail!("malformed row: {:?}", line);
        }
        let value: f64 = parts[1]
            .parse()
            .with_context(|| format!("invalid coefficient in row {:?}", line))?;
        if !value.is_finite() {
            bail!("non-finite coefficient in row {:?}", line);
        }

        let slot = if parts[0] == "intercept" {
            &mut intercept
        } else {
            let feature = Feature::from_name(parts[0])
                .ok_or_else(|| anyhow!("unknown feature: {:?}", parts[0]))?;
            &mut coefficients[feature.index()]
        };
        if slot.replace(value).is_some() {
            bail!("duplicate row for {:?}", parts[0]);
        }
    }

    let intercept = intercept.ok_or_else(|| anyhow!("missing intercept row"))?;
    let mut values = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        values[feature.index()] = coefficients[feature.index()]
            .ok_or_else(|| anyhow!("missing coefficient for {}", feature))?;
    }

    Ok(LinearRegression::new(values, intercept))
}

/// Candidate-path search with a once-only cached result
pub struct ModelLoader {
    candidates: Vec<PathBuf>,
    cached: OnceLock<Option<Arc<LoadedModel>>>,
    searches: AtomicUsize,
    probes: AtomicUsize,
}

impl ModelLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            cached: OnceLock::new(),
            searches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Loaded model, searching the candidates on the first call only
    pub fn load(&self) -> Option<Arc<LoadedModel>> {
        self.cached.get_or_init(|| self.search()).clone()
    }

    /// Like [`load`](Self::load), but unavailability is an error
    pub fn require(&self) -> Result<Arc<LoadedModel>> {
        self.load().ok_or(PredictorError::ModelUnavailable)
    }

    /// Number of times the filesystem search has run
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Number of candidate paths examined across all searches
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn search(&self) -> Option<Arc<LoadedModel>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Searching {} candidate model paths...", self.candidates.len());

        for path in &self.candidates {
            self.probes.fetch_add(1, Ordering::SeqCst);

            if !path.exists() {
                tracing::debug!("Model candidate {:?} does not exist", path);
                continue;
            }

            match load_artifact(path) {
                Ok(model) => {
                    tracing::info!(
                        "Loaded {} model from {:?} ({})",
                        model.type_name(),
                        path,
                        model.format()
                    );
                    return Some(Arc::new(model));
                }
                Err(e) => tracing::warn!("Failed to load model candidate {:?}: {:#}", path, e),
            }
        }

        tracing::warn!(
            "No model could be loaded from any of {} candidate paths",
            self.candidates.len()
        );
        None
    }
}

static GLOBAL_LOADER: OnceLock<ModelLoader> = OnceLock::new();

/// Process-wide loader
///
/// `candidates` is only consulted on the first call; later calls share the loader
/// (and its cached model) created then.
pub fn global_loader(candidates: impl FnOnce() -> Vec<PathBuf>) -> &'static ModelLoader {
    GLOBAL_LOADER.get_or_init(|| ModelLoader::new(candidates()))
}
