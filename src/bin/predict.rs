// One-shot math score prediction from the command line
//
// Usage:
//   cargo run --bin predict -- --reading 90 --writing 88 --gender female --prep completed
//   cargo run --bin predict -- --csv-url https://example.com/students.csv --json
//   cargo run --bin predict -- --csv-file data/students.csv
//
// Flags not given fall back to the form defaults.
// Exit codes: 0 success, 1 error, 2 model unavailable.

use anyhow::Context;
use clap::Parser;
use math_score_predictor::data::{first_row_features, load_csv_file};
use math_score_predictor::{
    global_loader, AppConfig, CsvSource, Feature, FeatureRecord, FormSubmission,
    PredictionResult, Predictor, RawFeatures, RawValue,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Predict a student's math score
///
/// Feature flags accept numbers or text ("male", "standard", "completed", ...).
/// They cannot be combined with a CSV source.
#[derive(Parser, Debug)]
#[command(name = "predict", version)]
struct Cli {
    /// Reading score (0-100)
    #[arg(long, value_name = "SCORE", conflicts_with_all = ["csv_url", "csv_file"])]
    reading: Option<String>,

    /// Writing score (0-100)
    #[arg(long, value_name = "SCORE", conflicts_with_all = ["csv_url", "csv_file"])]
    writing: Option<String>,

    /// Gender (male/female or 1/0)
    #[arg(long, conflicts_with_all = ["csv_url", "csv_file"])]
    gender: Option<String>,

    /// Lunch type (standard/free or 1/0)
    #[arg(long, conflicts_with_all = ["csv_url", "csv_file"])]
    lunch: Option<String>,

    /// Test preparation course (completed/none or 1/0)
    #[arg(long, conflicts_with_all = ["csv_url", "csv_file"])]
    prep: Option<String>,

    /// Ethnic group E (yes/no or 1/0)
    #[arg(long, conflicts_with_all = ["csv_url", "csv_file"])]
    group_e: Option<String>,

    /// Parental education is high school only (yes/no or 1/0)
    #[arg(long, conflicts_with_all = ["csv_url", "csv_file"])]
    parent_hs: Option<String>,

    /// Remote CSV file; the first row is used
    #[arg(long, value_name = "URL", conflicts_with = "csv_file")]
    csv_url: Option<String>,

    /// Local CSV file; the first row is used
    #[arg(long, value_name = "PATH")]
    csv_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Feature flags that were given, in canonical order
    fn overrides(&self) -> Vec<(Feature, &str)> {
        [
            (Feature::Gender, &self.gender),
            (Feature::Lunch, &self.lunch),
            (Feature::TestPreparationCourse, &self.prep),
            (Feature::ReadingScore, &self.reading),
            (Feature::WritingScore, &self.writing),
            (Feature::RaceEthnicityGroupE, &self.group_e),
            (Feature::ParentalLevelOfEducationHighSchool, &self.parent_hs),
        ]
        .into_iter()
        .filter_map(|(feature, value)| value.as_deref().map(|v| (feature, v)))
        .collect()
    }
}

/// Numbers stay numeric so "1" selects a dropdown value; anything else is text
fn flag_value(value: &str) -> RawValue {
    match value.trim().parse::<f64>() {
        Ok(n) => RawValue::Number(n),
        Err(_) => RawValue::Text(value.to_string()),
    }
}

fn raw_features(cli: &Cli, config: &AppConfig) -> anyhow::Result<RawFeatures> {
    if let Some(url) = &cli.csv_url {
        let source = CsvSource::new(config.csv_fetch_timeout);
        return source
            .features_from_url(url)
            .with_context(|| format!("loading CSV from {}", url));
    }

    if let Some(path) = &cli.csv_file {
        let df = load_csv_file(path).with_context(|| format!("reading {}", path.display()))?;
        return first_row_features(&df).context("resolving CSV columns");
    }

    let mut raw = FormSubmission::default().to_raw();
    for (feature, value) in cli.overrides() {
        raw.insert(feature.name().to_string(), flag_value(value));
    }
    Ok(raw)
}

fn print_text(result: &PredictionResult, record: &FeatureRecord) {
    println!("Predicted math score: {}", result.score_display());
    println!("Confidence: {}", result.confidence_display());
    println!(
        "Model: {} ({} features)",
        result.model_info.model_type, result.model_info.features_used
    );
    println!();
    for (label, value) in FormSubmission::from_record(record).echo() {
        println!("  {:<24} {}", label, value);
    }
}

fn run(cli: &Cli, predictor: Predictor, config: &AppConfig) -> anyhow::Result<()> {
    let raw = raw_features(cli, config)?;
    let (record, result) = predictor.predict_raw(&raw).context("prediction failed")?;

    if cli.json {
        let out = serde_json::json!({
            "prediction": result,
            "features": record,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_text(&result, &record);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "math_score_predictor=warn,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Exit code 2 is reserved for a missing model, so usage errors exit with 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = AppConfig::from_env();
    let model = match global_loader(|| config.model_candidates()).load() {
        Some(model) => model,
        None => {
            eprintln!("error: model is not available; check that the model artifact exists");
            return ExitCode::from(2);
        }
    };

    match run(&cli, Predictor::new(model), &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_equals_syntax_and_json_flag() {
        let cli = Cli::try_parse_from(["predict", "--reading=90", "--json"]).unwrap();
        assert_eq!(cli.reading.as_deref(), Some("90"));
        assert!(cli.json);
    }

    #[test]
    fn test_overrides_in_canonical_order() {
        let cli = Cli::try_parse_from([
            "predict", "--parent-hs", "yes", "--gender", "male", "--group-e", "1",
        ])
        .unwrap();
        assert_eq!(
            cli.overrides(),
            vec![
                (Feature::Gender, "male"),
                (Feature::RaceEthnicityGroupE, "1"),
                (Feature::ParentalLevelOfEducationHighSchool, "yes"),
            ]
        );
    }

    #[test]
    fn test_feature_flags_conflict_with_csv_sources() {
        let err = Cli::try_parse_from([
            "predict", "--csv-url", "https://example.com/a.csv", "--gender", "male",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["predict", "--csv-file", "a.csv", "--reading", "80"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_csv_sources_are_exclusive() {
        let err = Cli::try_parse_from([
            "predict", "--csv-url", "https://example.com/a.csv", "--csv-file", "a.csv",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = Cli::try_parse_from(["predict", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(flag_value(" 1 "), RawValue::Number(1.0));
        assert_eq!(flag_value("Male"), RawValue::Text("Male".to_string()));
    }

    #[test]
    fn test_defaults_fill_missing_flags() {
        let cli = Cli::try_parse_from(["predict", "--gender", "male"]).unwrap();
        let raw = raw_features(&cli, &AppConfig::default()).unwrap();
        let record = FeatureRecord::from_raw(&raw).unwrap();
        assert_eq!(record.to_vector(), [1.0, 1.0, 0.0, 85.0, 82.0, 0.0, 0.0]);
    }
}
