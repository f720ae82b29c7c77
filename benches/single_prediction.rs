use criterion::{black_box, criterion_group, criterion_main, Criterion};
use math_score_predictor::data::{first_row_features, parse_csv};
use math_score_predictor::model::ArtifactFormat;
use math_score_predictor::{
    FeatureRecord, FormSubmission, LinearRegression, LoadedModel, Predictor, RawFeatures,
    RawValue,
};
use std::path::PathBuf;
use std::sync::Arc;

const STUDENT_CSV: &str = "reading score,writing score,gender,lunch,test_preparation_course,race_ethnicity_group_E,parental_level_of_education_high_school\n\
90,88,female,standard,completed,group E,high school\n";

fn predictor() -> Predictor {
    let model = LinearRegression::new([13.0, 3.4, -3.3, 0.29, 0.68, 4.9, 0.9], -8.5);
    Predictor::new(Arc::new(LoadedModel::new(
        model,
        PathBuf::from("bench"),
        ArtifactFormat::Json,
    )))
}

fn text_features() -> RawFeatures {
    [
        ("gender", "Male"),
        ("lunch", "standard"),
        ("test_preparation_course", "none"),
        ("reading_score", "85"),
        ("writing_score", "82"),
        ("race_ethnicity_group_E", "group C"),
        ("parental_level_of_education_high_school", "high school"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), RawValue::from(v)))
    .collect()
}

fn bench_prediction(c: &mut Criterion) {
    let predictor = predictor();
    let form = FormSubmission::default().to_raw();
    let text = text_features();

    c.bench_function("normalize + predict (form numbers)", |b| {
        b.iter(|| predictor.predict_raw(black_box(&form)))
    });

    c.bench_function("normalize + predict (text values)", |b| {
        b.iter(|| predictor.predict_raw(black_box(&text)))
    });

    let record = FeatureRecord::from_values([0.0, 1.0, 0.0, 85.0, 82.0, 0.0, 0.0]);
    c.bench_function("predict only", |b| {
        b.iter(|| predictor.predict(black_box(&record)))
    });
}

fn bench_csv_row(c: &mut Criterion) {
    c.bench_function("parse CSV + resolve first row", |b| {
        b.iter(|| {
            let df = parse_csv(black_box(STUDENT_CSV)).ok()?;
            first_row_features(&df).ok()
        })
    });
}

criterion_group!(benches, bench_prediction, bench_csv_row);
criterion_main!(benches);
