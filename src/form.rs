//! Form definitions
//!
//! The interactive form has two number inputs (reading and writing score) and five
//! dropdowns. Each dropdown offers exactly two labelled choices mapped to 0/1.

use crate::error::{PredictorError, Result};
use crate::features::{Feature, FeatureRecord, RawFeatures};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub label: &'static str,
    pub value: f64,
}

/// Dropdown for a categorical feature
#[derive(Debug, Clone, Copy)]
pub struct SelectField {
    pub feature: Feature,
    pub label: &'static str,
    /// First choice is the default selection
    pub choices: [Choice; 2],
}

impl SelectField {
    pub fn choice_for(&self, value: f64) -> Option<&Choice> {
        self.choices.iter().find(|c| c.value == value)
    }
}

/// Number input for a continuous feature
#[derive(Debug, Clone, Copy)]
pub struct NumberField {
    pub feature: Feature,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

pub static NUMBER_FIELDS: [NumberField; 2] = [
    NumberField {
        feature: Feature::ReadingScore,
        label: "Reading score (0-100)",
        min: 0.0,
        max: 100.0,
        step: 0.1,
        default: 85.0,
    },
    NumberField {
        feature: Feature::WritingScore,
        label: "Writing score (0-100)",
        min: 0.0,
        max: 100.0,
        step: 0.1,
        default: 82.0,
    },
];

pub static SELECT_FIELDS: [SelectField; 5] = [
    SelectField {
        feature: Feature::Gender,
        label: "Gender",
        choices: [
            Choice { label: "Female", value: 0.0 },
            Choice { label: "Male", value: 1.0 },
        ],
    },
    SelectField {
        feature: Feature::Lunch,
        label: "Lunch type",
        choices: [
            Choice { label: "Standard", value: 1.0 },
            Choice { label: "Free/Reduced", value: 0.0 },
        ],
    },
    SelectField {
        feature: Feature::TestPreparationCourse,
        label: "Test preparation course",
        choices: [
            Choice { label: "None", value: 0.0 },
            Choice { label: "Completed", value: 1.0 },
        ],
    },
    SelectField {
        feature: Feature::RaceEthnicityGroupE,
        label: "Ethnic group E",
        choices: [
            Choice { label: "No", value: 0.0 },
            Choice { label: "Yes", value: 1.0 },
        ],
    },
    SelectField {
        feature: Feature::ParentalLevelOfEducationHighSchool,
        label: "Parental education",
        choices: [
            Choice { label: "Other level", value: 0.0 },
            Choice { label: "High school only", value: 1.0 },
        ],
    },
];

pub fn select_field(feature: Feature) -> Option<&'static SelectField> {
    SELECT_FIELDS.iter().find(|f| f.feature == feature)
}

/// One submitted form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub reading_score: f64,
    pub writing_score: f64,
    pub gender: f64,
    pub lunch: f64,
    pub test_preparation_course: f64,
    #[serde(rename = "race_ethnicity_group_E")]
    pub race_ethnicity_group_e: f64,
    pub parental_level_of_education_high_school: f64,
}

impl Default for FormSubmission {
    fn default() -> Self {
        let first = |feature| {
            select_field(feature)
                .map(|f| f.choices[0].value)
                .unwrap_or(0.0)
        };
        Self {
            reading_score: NUMBER_FIELDS[0].default,
            writing_score: NUMBER_FIELDS[1].default,
            gender: first(Feature::Gender),
            lunch: first(Feature::Lunch),
            test_preparation_course: first(Feature::TestPreparationCourse),
            race_ethnicity_group_e: first(Feature::RaceEthnicityGroupE),
            parental_level_of_education_high_school: first(
                Feature::ParentalLevelOfEducationHighSchool,
            ),
        }
    }
}

impl FormSubmission {
    /// Form state matching an already-normalized record (e.g. one loaded from CSV)
    pub fn from_record(record: &FeatureRecord) -> Self {
        Self {
            reading_score: record.get(Feature::ReadingScore),
            writing_score: record.get(Feature::WritingScore),
            gender: record.get(Feature::Gender),
            lunch: record.get(Feature::Lunch),
            test_preparation_course: record.get(Feature::TestPreparationCourse),
            race_ethnicity_group_e: record.get(Feature::RaceEthnicityGroupE),
            parental_level_of_education_high_school: record
                .get(Feature::ParentalLevelOfEducationHighSchool),
        }
    }

    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Gender => self.gender,
            Feature::Lunch => self.lunch,
            Feature::TestPreparationCourse => self.test_preparation_course,
            Feature::ReadingScore => self.reading_score,
            Feature::WritingScore => self.writing_score,
            Feature::RaceEthnicityGroupE => self.race_ethnicity_group_e,
            Feature::ParentalLevelOfEducationHighSchool => {
                self.parental_level_of_education_high_school
            }
        }
    }

    /// Scores must lie in their input range; dropdowns must hold one of their choices
    pub fn validate(&self) -> Result<()> {
        for field in &NUMBER_FIELDS {
            let value = self.value(field.feature);
            if !(field.min..=field.max).contains(&value) {
                return Err(PredictorError::OutOfRange {
                    field: field.feature.name(),
                    value,
                    min: field.min,
                    max: field.max,
                });
            }
        }
        for field in &SELECT_FIELDS {
            let value = self.value(field.feature);
            if field.choice_for(value).is_none() {
                return Err(PredictorError::InvalidChoice {
                    field: field.feature.name(),
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn to_raw(&self) -> RawFeatures {
        Feature::ALL
            .iter()
            .map(|&f| (f.name().to_string(), self.value(f).into()))
            .collect()
    }

    /// Label/value pairs describing the inputs, in canonical order
    pub fn echo(&self) -> Vec<(&'static str, String)> {
        Feature::ALL
            .iter()
            .map(|&feature| {
                let value = self.value(feature);
                let shown = match select_field(feature).and_then(|f| f.choice_for(value)) {
                    Some(choice) => choice.label.to_string(),
                    None => format!("{:.1}", value),
                };
                (feature.label(), shown)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dropdown_has_two_distinct_choices() {
        for field in &SELECT_FIELDS {
            assert!(field.feature.is_categorical());
            let values: Vec<f64> = field.choices.iter().map(|c| c.value).collect();
            assert!(values.contains(&0.0) && values.contains(&1.0), "{}", field.label);
        }
        assert_eq!(SELECT_FIELDS.len() + NUMBER_FIELDS.len(), 7);
    }

    #[test]
    fn test_defaults() {
        let form = FormSubmission::default();
        assert_eq!(form.reading_score, 85.0);
        assert_eq!(form.writing_score, 82.0);
        assert_eq!(form.gender, 0.0);
        assert_eq!(form.lunch, 1.0);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let form = FormSubmission {
            reading_score: 101.0,
            ..Default::default()
        };
        assert!(matches!(
            form.validate(),
            Err(PredictorError::OutOfRange { field: "reading_score", .. })
        ));

        let form = FormSubmission {
            lunch: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            form.validate(),
            Err(PredictorError::InvalidChoice { field: "lunch", .. })
        ));
    }

    #[test]
    fn test_to_raw_normalizes() {
        let form = FormSubmission {
            gender: 1.0,
            ..Default::default()
        };
        let record = FeatureRecord::from_raw(&form.to_raw()).unwrap();
        assert_eq!(record.to_vector(), [1.0, 1.0, 0.0, 85.0, 82.0, 0.0, 0.0]);
    }

    #[test]
    fn test_echo_uses_labels() {
        let echo = FormSubmission::default().echo();
        assert_eq!(echo.len(), 7);
        assert_eq!(echo[0], ("Gender", "Female".to_string()));
        assert_eq!(echo[1], ("Lunch type", "Standard".to_string()));
        assert_eq!(echo[3], ("Reading score", "85.0".to_string()));
    }

    #[test]
    fn test_deserialize_field_names() {
        let json = r#"{"reading_score": 70, "writing_score": 71, "gender": 1, "lunch": 0,
            "test_preparation_course": 1, "race_ethnicity_group_E": 1,
            "parental_level_of_education_high_school": 0}"#;
        let form: FormSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(form.race_ethnicity_group_e, 1.0);
    }

    #[test]
    fn test_from_record_round_trips_form_values() {
        let record = FeatureRecord::from_values([1.0, 0.0, 1.0, 90.0, 88.0, 1.0, 0.0]);
        let form = FormSubmission::from_record(&record);
        assert!(form.validate().is_ok());
        assert_eq!(FeatureRecord::from_raw(&form.to_raw()).unwrap(), record);
        assert_eq!(form.echo()[2], ("Test preparation course", "Completed".to_string()));
    }
}
