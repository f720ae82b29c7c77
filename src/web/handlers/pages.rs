// Page handlers for HTML rendering with Askama

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use askama::Template;
use serde::Deserialize;

use crate::api_server::{AppError, AppState};
use crate::error::PredictorError;
use crate::features::FeatureRecord;
use crate::form::{FormSubmission, NUMBER_FIELDS, SELECT_FIELDS};
use crate::predictor::{PredictionResult, CONFIDENCE};

// ============================================================================
// View Models
// ============================================================================

pub struct NumberView {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

pub struct OptionView {
    pub label: &'static str,
    pub value: f64,
    pub selected: bool,
}

pub struct SelectView {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<OptionView>,
}

pub struct EchoRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Default)]
pub struct ResultView {
    pub score: String,
    pub confidence: String,
    pub model_type: String,
    pub features_used: usize,
    pub source: String,
    pub echo: Vec<EchoRow>,
}

// ============================================================================
// Home Page
// ============================================================================

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub title: String,
    pub model_available: bool,
    pub model_type: String,
    pub model_source: String,
    pub confidence: String,
    pub numbers: Vec<NumberView>,
    pub selects: Vec<SelectView>,
    pub csv_url: String,
    pub has_error: bool,
    pub error_message: String,
    pub has_result: bool,
    pub result: ResultView,
}

impl HomeTemplate {
    fn new(state: &AppState, form: &FormSubmission) -> Self {
        let (model_type, model_source) = match &state.model {
            Some(m) => (m.type_name().to_string(), m.source().display().to_string()),
            None => (String::new(), String::new()),
        };

        let numbers = NUMBER_FIELDS
            .iter()
            .map(|f| NumberView {
                name: f.feature.name(),
                label: f.label,
                min: f.min,
                max: f.max,
                step: f.step,
                value: form.value(f.feature),
            })
            .collect();

        let selects = SELECT_FIELDS
            .iter()
            .map(|f| {
                let current = form.value(f.feature);
                SelectView {
                    name: f.feature.name(),
                    label: f.label,
                    options: f
                        .choices
                        .iter()
                        .map(|c| OptionView {
                            label: c.label,
                            value: c.value,
                            selected: c.value == current,
                        })
                        .collect(),
                }
            })
            .collect();

        Self {
            title: "Math Score Predictor".to_string(),
            model_available: state.model.is_some(),
            model_type,
            model_source,
            confidence: format!("{:.1}% (R² = {})", CONFIDENCE * 100.0, CONFIDENCE),
            numbers,
            selects,
            csv_url: String::new(),
            has_error: false,
            error_message: String::new(),
            has_result: false,
            result: ResultView::default(),
        }
    }

    fn with_result(mut self, form: &FormSubmission, prediction: &PredictionResult, source: &str) -> Self {
        self.has_result = true;
        self.result = ResultView {
            score: prediction.score_display(),
            confidence: prediction.confidence_display(),
            model_type: prediction.model_info.model_type.clone(),
            features_used: prediction.model_info.features_used,
            source: source.to_string(),
            echo: form
                .echo()
                .into_iter()
                .map(|(label, value)| EchoRow { label, value })
                .collect(),
        };
        self
    }

    fn with_error(mut self, message: String) -> Self {
        self.has_error = true;
        self.error_message = message;
        self
    }

    fn into_response_with(self, status: StatusCode) -> Response {
        let body = self.render().unwrap_or_else(|e| format!("Template error: {}", e));
        (status, Html(body)).into_response()
    }
}

pub async fn home_page(State(state): State<AppState>) -> impl IntoResponse {
    let form = FormSubmission::default();
    let mut template = HomeTemplate::new(&state, &form);
    if !template.model_available {
        template = template.with_error(PredictorError::ModelUnavailable.to_string());
    }
    template.into_response_with(StatusCode::OK)
}

// ============================================================================
// Form Submission
// ============================================================================

pub async fn predict_page(
    State(state): State<AppState>,
    payload: Result<Form<FormSubmission>, FormRejection>,
) -> Response {
    let form = match payload {
        Ok(Form(form)) => form,
        Err(rejection) => return rejected_form(&state, rejection),
    };
    let template = HomeTemplate::new(&state, &form);

    let outcome = form
        .validate()
        .and_then(|_| state.predictor())
        .and_then(|predictor| predictor.predict_raw(&form.to_raw()));

    match outcome {
        Ok((_, prediction)) => template
            .with_result(&form, &prediction, "form")
            .into_response_with(StatusCode::OK),
        Err(e) => {
            tracing::warn!("Form prediction failed: {}", e);
            let err = AppError::from(e);
            template
                .with_error(err.message())
                .into_response_with(err.status())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CsvForm {
    pub url: String,
}

pub async fn predict_csv_page(
    State(state): State<AppState>,
    payload: Result<Form<CsvForm>, FormRejection>,
) -> Response {
    let csv = match payload {
        Ok(Form(csv)) => csv,
        Err(rejection) => return rejected_form(&state, rejection),
    };
    let outcome = predict_from_csv(&state, csv.url.clone()).await;

    match outcome {
        Ok((record, prediction)) => {
            let form = FormSubmission::from_record(&record);
            let mut template = HomeTemplate::new(&state, &form)
                .with_result(&form, &prediction, csv.url.trim());
            template.csv_url = csv.url;
            template.into_response_with(StatusCode::OK)
        }
        Err(err) => {
            tracing::warn!("CSV prediction failed: {}", err.message());
            let mut template =
                HomeTemplate::new(&state, &FormSubmission::default()).with_error(err.message());
            template.csv_url = csv.url;
            template.into_response_with(err.status())
        }
    }
}

/// Undecodable form bodies re-render the default form with the error inline
fn rejected_form(state: &AppState, rejection: FormRejection) -> Response {
    let err = AppError::from(rejection);
    tracing::warn!("Form rejected ({}): {}", err.status(), err.message());
    HomeTemplate::new(state, &FormSubmission::default())
        .with_error(err.message())
        .into_response_with(err.status())
}

async fn predict_from_csv(
    state: &AppState,
    url: String,
) -> Result<(FeatureRecord, PredictionResult), AppError> {
    let predictor = state.predictor()?;
    let raw = state.fetch_csv_features(url).await?;
    Ok(predictor.predict_raw(&raw)?)
}
