//! Feature Normalization
//!
//! Turns raw inputs (form selections, JSON bodies, CSV rows) into the fixed
//! 7-entry numeric record the regression model expects.
//!
//! Canonical order:
//! 1. gender
//! 2. lunch
//! 3. test_preparation_course
//! 4. reading_score
//! 5. writing_score
//! 6. race_ethnicity_group_E
//! 7. parental_level_of_education_high_school

use crate::error::{PredictorError, Result};
use crate::utils;
use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Number of model inputs
pub const FEATURE_COUNT: usize = 7;

/// One of the 7 model inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Gender,
    Lunch,
    TestPreparationCourse,
    ReadingScore,
    WritingScore,
    RaceEthnicityGroupE,
    ParentalLevelOfEducationHighSchool,
}

impl Feature {
    /// All features in canonical (model input) order
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Gender,
        Feature::Lunch,
        Feature::TestPreparationCourse,
        Feature::ReadingScore,
        Feature::WritingScore,
        Feature::RaceEthnicityGroupE,
        Feature::ParentalLevelOfEducationHighSchool,
    ];

    /// Field name used in raw inputs and in the model artifact
    pub fn name(self) -> &'static str {
        match self {
            Feature::Gender => "gender",
            Feature::Lunch => "lunch",
            Feature::TestPreparationCourse => "test_preparation_course",
            Feature::ReadingScore => "reading_score",
            Feature::WritingScore => "writing_score",
            Feature::RaceEthnicityGroupE => "race_ethnicity_group_E",
            Feature::ParentalLevelOfEducationHighSchool => {
                "parental_level_of_education_high_school"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Position in the model input vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Categorical features are 0/1 flags; the two scores are continuous
    pub fn is_categorical(self) -> bool {
        !matches!(self, Feature::ReadingScore | Feature::WritingScore)
    }

    /// Human-readable label for result pages and CLI output
    pub fn label(self) -> &'static str {
        match self {
            Feature::Gender => "Gender",
            Feature::Lunch => "Lunch type",
            Feature::TestPreparationCourse => "Test preparation course",
            Feature::ReadingScore => "Reading score",
            Feature::WritingScore => "Writing score",
            Feature::RaceEthnicityGroupE => "Ethnic group E",
            Feature::ParentalLevelOfEducationHighSchool => "Parental education",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw input cell before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

/// Field name → raw value, as supplied by a form, JSON body or CSV row
pub type RawFeatures = FxHashMap<String, RawValue>;

/// Validated model input: all 7 features, numeric, canonical order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Validate and normalize a raw field map
    ///
    /// Fails on the first missing field (in canonical order). Extra keys are ignored.
    pub fn from_raw(raw: &RawFeatures) -> Result<Self> {
        let mut values = [0.0; FEATURE_COUNT];

        for feature in Feature::ALL {
            let value = raw
                .get(feature.name())
                .ok_or(PredictorError::MissingField {
                    field: feature.name(),
                })?;
            values[feature.index()] = normalize_value(feature, value)?;
        }

        tracing::debug!("Normalized features: {:?}", values);
        Ok(Self { values })
    }

    /// Build a record from already-normalized values in canonical order
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Model input row in canonical order
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |&f| (f, self.values[f.index()]))
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

/// Normalize a single raw value for the given feature
///
/// - categorical text → 0/1 via synonym matching (unrecognized → 0)
/// - categorical numbers and continuous numbers pass through
/// - continuous text is parsed as a float
///
/// NaN and infinities are rejected wherever they appear.
pub fn normalize_value(feature: Feature, value: &RawValue) -> Result<f64> {
    let invalid = || PredictorError::InvalidNumber {
        field: feature.name(),
        value: value.to_string(),
    };

    match value {
        RawValue::Number(n) if n.is_finite() => Ok(*n),
        RawValue::Number(_) => Err(invalid()),
        RawValue::Text(text) if feature.is_categorical() => {
            Ok(utils::encode(feature, text))
        }
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(invalid),
    }
}

/// Raw features from a JSON object body
///
/// `null` counts as an absent field, booleans become 0/1, arrays and objects are
/// rejected. Keys other than the 7 feature names are ignored.
pub fn raw_features_from_json(object: &serde_json::Map<String, Value>) -> Result<RawFeatures> {
    let mut raw = RawFeatures::default();

    for feature in Feature::ALL {
        let invalid = |v: &Value| PredictorError::InvalidNumber {
            field: feature.name(),
            value: v.to_string(),
        };

        let value = match object.get(feature.name()) {
            None | Some(Value::Null) => continue,
            Some(Value::Number(n)) => n
                .as_f64()
                .map(RawValue::Number)
                .ok_or_else(|| invalid(&Value::Number(n.clone())))?,
            Some(Value::String(s)) => RawValue::Text(s.clone()),
            Some(Value::Bool(b)) => RawValue::Number(if *b { 1.0 } else { 0.0 }),
            Some(other) => return Err(invalid(other)),
        };
        raw.insert(feature.name().to_string(), value);
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn form_input() -> RawFeatures {
        let mut raw = RawFeatures::default();
        raw.insert("gender".into(), 1.0.into());
        raw.insert("lunch".into(), 1.0.into());
        raw.insert("test_preparation_course".into(), 0.0.into());
        raw.insert("reading_score".into(), 85.0.into());
        raw.insert("writing_score".into(), 82.0.into());
        raw.insert("race_ethnicity_group_E".into(), 0.0.into());
        raw.insert("parental_level_of_education_high_school".into(), 1.0.into());
        raw
    }

    #[test]
    fn test_canonical_order() {
        let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "gender",
                "lunch",
                "test_preparation_course",
                "reading_score",
                "writing_score",
                "race_ethnicity_group_E",
                "parental_level_of_education_high_school",
            ]
        );
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(Feature::from_name(f.name()), Some(*f));
        }
    }

    #[test]
    fn test_complete_input_produces_seven_keys_in_order() {
        let record = FeatureRecord::from_raw(&form_input()).unwrap();
        assert_eq!(record.len(), FEATURE_COUNT);
        assert_eq!(record.to_vector(), [1.0, 1.0, 0.0, 85.0, 82.0, 0.0, 1.0]);

        let json = serde_json::to_string(&record).unwrap();
        let keys_in_order = [
            "\"gender\"",
            "\"lunch\"",
            "\"test_preparation_course\"",
            "\"reading_score\"",
            "\"writing_score\"",
            "\"race_ethnicity_group_E\"",
            "\"parental_level_of_education_high_school\"",
        ];
        let positions: Vec<usize> = keys_in_order
            .iter()
            .map(|k| json.find(k).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for feature in Feature::ALL {
            let mut raw = form_input();
            raw.remove(feature.name());
            match FeatureRecord::from_raw(&raw) {
                Err(PredictorError::MissingField { field }) => assert_eq!(field, feature.name()),
                other => panic!("expected missing field error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let mut raw = form_input();
        raw.insert("math_score".into(), 70.0.into());
        assert!(FeatureRecord::from_raw(&raw).is_ok());
    }

    #[test]
    fn test_text_scores_are_parsed() {
        let mut raw = form_input();
        raw.insert("reading_score".into(), " 91.5 ".into());
        let record = FeatureRecord::from_raw(&raw).unwrap();
        assert_relative_eq!(record.get(Feature::ReadingScore), 91.5);

        raw.insert("writing_score".into(), "ninety".into());
        assert!(matches!(
            FeatureRecord::from_raw(&raw),
            Err(PredictorError::InvalidNumber { field: "writing_score", .. })
        ));
    }

    #[test]
    fn test_gender_text_mapping() {
        assert_eq!(normalize_value(Feature::Gender, &"Male".into()).unwrap(), 1.0);
        assert_eq!(normalize_value(Feature::Gender, &"MALE".into()).unwrap(), 1.0);
        assert_eq!(normalize_value(Feature::Gender, &"Female".into()).unwrap(), 0.0);
        assert_eq!(normalize_value(Feature::Gender, &"robot".into()).unwrap(), 0.0);
    }

    #[test]
    fn test_non_finite_numbers_are_invalid() {
        for text in ["NaN", "inf", "-infinity"] {
            assert!(matches!(
                normalize_value(Feature::ReadingScore, &text.into()),
                Err(PredictorError::InvalidNumber { field: "reading_score", .. })
            ));
        }
        assert!(matches!(
            normalize_value(Feature::Lunch, &f64::NAN.into()),
            Err(PredictorError::InvalidNumber { field: "lunch", .. })
        ));
    }

    #[test]
    fn test_json_null_is_a_missing_field() {
        let body: serde_json::Map<String, Value> = serde_json::from_str(
            r#"{"gender": "male", "lunch": null, "test_preparation_course": true,
                "reading_score": 85, "writing_score": "82",
                "race_ethnicity_group_E": false,
                "parental_level_of_education_high_school": 0, "comment": [1, 2]}"#,
        )
        .unwrap();
        let raw = raw_features_from_json(&body).unwrap();
        assert!(!raw.contains_key("lunch"));
        assert!(!raw.contains_key("comment"));
        assert_eq!(raw["test_preparation_course"], RawValue::Number(1.0));
        assert!(matches!(
            FeatureRecord::from_raw(&raw),
            Err(PredictorError::MissingField { field: "lunch" })
        ));
    }

    #[test]
    fn test_json_arrays_are_rejected() {
        let body: serde_json::Map<String, Value> =
            serde_json::from_str(r#"{"reading_score": [85]}"#).unwrap();
        assert!(matches!(
            raw_features_from_json(&body),
            Err(PredictorError::InvalidNumber { field: "reading_score", .. })
        ));
    }

    #[test]
    fn test_raw_value_from_json() {
        let raw: RawFeatures =
            serde_json::from_str(r#"{"gender": "male", "reading_score": 90}"#).unwrap();
        assert_eq!(raw["gender"], RawValue::Text("male".into()));
        assert_eq!(raw["reading_score"], RawValue::Number(90.0));
    }
}
