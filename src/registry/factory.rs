//! Factory functions for looking up disease descriptors
//!
//! This module is the single place where per-disease rules live; everything
//! downstream consumes the returned [`DiseaseDescriptor`] generically.

use crate::error::{PipelineError, Result};

use super::{CategoricalEncoding, DiseaseDescriptor, RowFilter, TargetRule};

/// Default trainer iteration cap
const DEFAULT_MAX_ITER: usize = 200;

/// Gender levels observed in the diabetes dataset
const DIABETES_GENDER_LEVELS: &[&str] = &["Female", "Male", "Other"];

/// Smoking-history levels after the "No Info" sentinel rows are removed
const DIABETES_SMOKING_LEVELS: &[&str] = &["current", "ever", "former", "never", "not current"];

const ANEMIA: DiseaseDescriptor = DiseaseDescriptor {
    key: "anemia",
    display_name: "Anemia",
    source_file: "anemia.csv",
    target: Some(TargetRule::Column { name: "Result" }),
    categorical: &[],
    excluded_features: &[],
    row_filters: &[],
    // The anemia fit historically needs more iterations to settle
    max_iter: 500,
    holdout: false,
};

const ASTHMA: DiseaseDescriptor = DiseaseDescriptor {
    key: "asthma",
    display_name: "Asthma",
    source_file: "asthma.csv",
    target: Some(TargetRule::AnyFlag {
        name: "Asthma",
        columns: &["Severity_Mild", "Severity_Moderate"],
    }),
    categorical: &[],
    excluded_features: &["Severity_None"],
    row_filters: &[],
    max_iter: DEFAULT_MAX_ITER,
    holdout: true,
};

const BREAST_CANCER: DiseaseDescriptor = DiseaseDescriptor {
    key: "breast_cancer",
    display_name: "Breast Cancer",
    source_file: "breast_cancer.csv",
    target: Some(TargetRule::Column { name: "diagnosis" }),
    categorical: &[],
    excluded_features: &[],
    row_filters: &[],
    max_iter: DEFAULT_MAX_ITER,
    holdout: true,
};

const DIABETES: DiseaseDescriptor = DiseaseDescriptor {
    key: "diabetes",
    display_name: "Diabetes",
    source_file: "diabetes.csv",
    target: Some(TargetRule::Column { name: "diabetes" }),
    categorical: &[
        CategoricalEncoding {
            column: "gender",
            levels: DIABETES_GENDER_LEVELS,
        },
        CategoricalEncoding {
            column: "smoking_history",
            levels: DIABETES_SMOKING_LEVELS,
        },
    ],
    excluded_features: &[],
    row_filters: &[RowFilter::ExcludeValue {
        column: "smoking_history",
        value: "no info",
    }],
    max_iter: DEFAULT_MAX_ITER,
    holdout: true,
};

// Stroke is split across custodians but has no trainer; the descriptor
// deliberately carries no target rule.
const STROKE: DiseaseDescriptor = DiseaseDescriptor {
    key: "stroke",
    display_name: "Stroke",
    source_file: "stroke.csv",
    target: None,
    categorical: &[],
    excluded_features: &[],
    row_filters: &[],
    max_iter: DEFAULT_MAX_ITER,
    holdout: true,
};

const ALL_DISEASES: [DiseaseDescriptor; 5] = [ANEMIA, ASTHMA, BREAST_CANCER, DIABETES, STROKE];

/// All supported diseases, in processing order
#[must_use]
pub fn all_descriptors() -> &'static [DiseaseDescriptor] {
    &ALL_DISEASES
}

/// Look up a disease descriptor by its canonical key
pub fn descriptor_from_key(key: &str) -> Result<DiseaseDescriptor> {
    let lower = key.to_lowercase();
    all_descriptors()
        .iter()
        .find(|d| d.key == lower)
        .copied()
        .ok_or_else(|| PipelineError::schema(format!("Unknown disease: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_key() {
        let disease = descriptor_from_key("diabetes").unwrap();
        assert_eq!(disease.key, "diabetes");
        assert_eq!(disease.source_file, "diabetes.csv");
        assert!(disease.trainable());

        // Case-insensitive lookup
        assert!(descriptor_from_key("Anemia").is_ok());
        assert!(descriptor_from_key("gout").is_err());
    }

    #[test]
    fn test_diabetes_encoding_vocabulary() {
        let disease = descriptor_from_key("diabetes").unwrap();
        assert_eq!(disease.categorical.len(), 2);
        assert_eq!(disease.categorical[0].column, "gender");
        assert_eq!(disease.categorical[0].levels, DIABETES_GENDER_LEVELS);
        assert_eq!(disease.categorical[1].column, "smoking_history");
        // The sentinel level never appears in the vocabulary
        assert!(!disease.categorical[1].levels.contains(&"No Info"));
    }

    #[test]
    fn test_anemia_iteration_cap() {
        let disease = descriptor_from_key("anemia").unwrap();
        assert_eq!(disease.max_iter, 500);
        assert!(!disease.holdout);
    }

    #[test]
    fn test_stroke_is_not_trainable() {
        let disease = descriptor_from_key("stroke").unwrap();
        assert!(!disease.trainable());
    }
}
