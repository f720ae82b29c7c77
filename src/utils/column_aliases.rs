//! Column-name resolution for tabular input
//!
//! Uploaded CSV files rarely use the model's field names, so each feature accepts a
//! short ordered list of header aliases (including Spanish ones). The first alias
//! present in the header wins. Matching is exact.

use crate::error::{PredictorError, Result};
use crate::features::Feature;

pub fn aliases(feature: Feature) -> &'static [&'static str] {
    match feature {
        Feature::ReadingScore => &[
            "reading score",
            "reading_score",
            "reading",
            "read_score",
            "lectura",
        ],
        Feature::WritingScore => &[
            "writing score",
            "writing_score",
            "writing",
            "write_score",
            "escritura",
        ],
        Feature::Gender => &["gender", "sex", "genero", "género"],
        Feature::Lunch => &["lunch", "almuerzo", "lunch_type"],
        Feature::TestPreparationCourse => &[
            "test preparation course",
            "test_preparation_course",
            "preparation",
            "curso_preparacion",
        ],
        Feature::RaceEthnicityGroupE => &[
            "race_ethnicity_group_E",
            "race",
            "ethnicity",
            "race/ethnicity",
        ],
        Feature::ParentalLevelOfEducationHighSchool => &[
            "parental_level_of_education_high_school",
            "parental_level_of_education",
            "parental level of education",
            "parent_education",
            "educacion_padres",
        ],
    }
}

/// Find the header column used for a feature
pub fn resolve_column<'a>(feature: Feature, columns: &'a [String]) -> Result<&'a str> {
    aliases(feature)
        .iter()
        .find_map(|alias| columns.iter().find(|c| c.as_str() == *alias))
        .map(|c| c.as_str())
        .ok_or_else(|| PredictorError::ColumnNotFound {
            field: feature.name(),
            available: columns.to_vec(),
        })
}

/// Resolve every feature, in canonical order
pub fn resolve_columns(columns: &[String]) -> Result<Vec<(Feature, String)>> {
    Feature::ALL
        .iter()
        .map(|&feature| {
            resolve_column(feature, columns).map(|name| (feature, name.to_string()))
        })
        .collect()
}
