//! Categorical Encoding
//!
//! Text answers for the five categorical features are matched (case-insensitive,
//! trimmed) against a small list of English and Spanish synonyms. A match encodes
//! as 1.0; anything else encodes as 0.0.

use crate::features::Feature;

const GENDER_POSITIVE: &[&str] = &["male", "masculino", "m"];
const LUNCH_POSITIVE: &[&str] = &["standard", "estándar", "estandar"];
const TEST_PREP_POSITIVE: &[&str] = &["completed", "completado", "yes", "sí", "si"];
const GROUP_E_POSITIVE: &[&str] = &["group e", "grupo e", "e", "yes", "sí", "si"];
const HIGH_SCHOOL_POSITIVE: &[&str] = &["high school", "secundaria", "high_school"];

/// Lowercase synonyms that encode as 1.0 for a feature (empty for continuous features)
pub fn synonyms(feature: Feature) -> &'static [&'static str] {
    match feature {
        Feature::Gender => GENDER_POSITIVE,
        Feature::Lunch => LUNCH_POSITIVE,
        Feature::TestPreparationCourse => TEST_PREP_POSITIVE,
        Feature::RaceEthnicityGroupE => GROUP_E_POSITIVE,
        Feature::ParentalLevelOfEducationHighSchool => HIGH_SCHOOL_POSITIVE,
        Feature::ReadingScore | Feature::WritingScore => &[],
    }
}

/// Encode a text answer as 0.0 or 1.0
pub fn encode(feature: Feature, text: &str) -> f64 {
    if is_recognized(feature, text) {
        1.0
    } else {
        // Unrecognized values silently become 0; a typo degrades the prediction
        tracing::debug!("{}: '{}' did not match any synonym, encoding as 0", feature, text);
        0.0
    }
}

/// Whether the text matches a positive synonym for the feature
pub fn is_recognized(feature: Feature, text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    synonyms(feature).contains(&normalized.as_str())
}
