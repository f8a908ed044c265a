//! Per-site model training.
//!
//! One logistic-regression model is fitted per (disease, custodian) pair on
//! that custodian's partition alone; no weights are shared or aggregated
//! across sites.

pub mod logistic;

pub use logistic::{LogisticModel, LogisticRegression};

use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::PipelineConfig;
use crate::encode::{ClassLabel, EncodedMatrix};
use crate::error::{PipelineError, Result};
use crate::registry::DiseaseDescriptor;

/// Settings for one training run
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Gradient-descent step size
    pub learning_rate: f64,
    /// L2 regularization strength
    pub l2_penalty: f64,
    /// Gradient tolerance for early stopping
    pub tolerance: f64,
    /// Iteration cap
    pub max_iter: usize,
    /// Seed for the stratified holdout split
    pub seed: u64,
    /// Fraction held out for evaluation; 0 trains on the whole partition
    pub holdout_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            l2_penalty: 1.0,
            tolerance: 1e-4,
            max_iter: 200,
            seed: 42,
            holdout_fraction: 0.2,
        }
    }
}

impl TrainConfig {
    /// Build the training settings for one disease under a pipeline config
    #[must_use]
    pub fn for_disease(config: &PipelineConfig, disease: &DiseaseDescriptor) -> Self {
        Self {
            learning_rate: config.learning_rate,
            l2_penalty: config.l2_penalty,
            tolerance: config.tolerance,
            max_iter: disease.max_iter,
            seed: config.seed,
            holdout_fraction: if disease.holdout {
                config.holdout_fraction
            } else {
                0.0
            },
        }
    }
}

/// A fitted model together with its feature schema and class labels
#[derive(Debug, Clone)]
pub struct SiteModel {
    /// The fitted logistic-regression parameters
    pub model: LogisticModel,
    /// Ordered feature names the coefficients were fit against
    pub feature_names: Vec<String>,
    /// Ordered class labels; the model's class indices point into this
    pub classes: Vec<ClassLabel>,
    /// Accuracy on the held-out rows, when a holdout was taken
    pub holdout_accuracy: Option<f64>,
}

impl SiteModel {
    /// Predicted class labels for a feature matrix
    #[must_use]
    pub fn predict_labels(&self, x: &Array2<f64>) -> Vec<ClassLabel> {
        self.model
            .predict(x)
            .into_iter()
            .map(|idx| self.classes[idx.min(self.classes.len() - 1)].clone())
            .collect()
    }
}

/// Train one custodian's model from its encoded partition
///
/// # Errors
/// Returns a `DataError` when the partition is empty or holds a single
/// class only
pub fn train_site(encoded: &EncodedMatrix, config: &TrainConfig) -> Result<SiteModel> {
    let rows = encoded.x.nrows();
    if rows == 0 {
        return Err(PipelineError::data("partition is empty"));
    }
    if encoded.classes.len() < 2 {
        let only = encoded
            .classes
            .first()
            .map_or_else(|| "<none>".to_string(), ToString::to_string);
        return Err(PipelineError::data(format!(
            "degenerate fit: label '{}' holds the single class {only}",
            encoded.label_name
        )));
    }

    let (train_idx, test_idx) = if config.holdout_fraction > 0.0 {
        stratified_holdout(&encoded.y, config.holdout_fraction, config.seed)
    } else {
        ((0..rows).collect(), Vec::new())
    };

    let x_train = encoded.x.select(Axis(0), &train_idx);
    let y_train = encoded.y.select(Axis(0), &train_idx);

    let trainer = LogisticRegression {
        learning_rate: config.learning_rate,
        l2_penalty: config.l2_penalty,
        max_iter: config.max_iter,
        tolerance: config.tolerance,
    };
    let model = trainer.fit(&x_train, &y_train);
    if !model.converged {
        warn!(
            "Fit did not converge within {} iterations; exporting the parameters as-is",
            config.max_iter
        );
    }

    let holdout_accuracy = if test_idx.is_empty() {
        None
    } else {
        let x_test = encoded.x.select(Axis(0), &test_idx);
        let y_test = encoded.y.select(Axis(0), &test_idx);
        let accuracy = accuracy(&model.predict(&x_test), &y_test);
        debug!(
            "Holdout accuracy on {} rows: {:.3}",
            test_idx.len(),
            accuracy
        );
        Some(accuracy)
    };

    Ok(SiteModel {
        model,
        feature_names: encoded.feature_names.clone(),
        classes: encoded.classes.clone(),
        holdout_accuracy,
    })
}

/// Split row indices into train and test sets, stratified by label
///
/// Each class contributes `round(count * fraction)` rows to the test set,
/// but always keeps at least one row in training, so a stratified holdout
/// can never strip a class from the fit.
#[must_use]
pub fn stratified_holdout(y: &Array1<f64>, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for positive in [false, true] {
        let mut indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|&(_, &v)| (v > 0.5) == positive)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        indices.shuffle(&mut rng);

        let n_test = ((indices.len() as f64) * fraction).round() as usize;
        let n_test = n_test.min(indices.len() - 1);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Fraction of predictions matching the 0/1 label vector
fn accuracy(predictions: &[usize], y: &Array1<f64>) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(y.iter())
        .filter(|(p, y)| (**p == 1) == (**y > 0.5))
        .count();
    correct as f64 / predictions.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_matrix() -> EncodedMatrix {
        EncodedMatrix {
            x: array![
                [-4.0],
                [-3.0],
                [-2.0],
                [-1.0],
                [-0.5],
                [0.5],
                [1.0],
                [2.0],
                [3.0],
                [4.0]
            ],
            y: array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            feature_names: vec!["marker".to_string()],
            classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
            label_name: "Result".to_string(),
        }
    }

    #[test]
    fn test_train_site_fits_and_evaluates() {
        let encoded = separable_matrix();
        let site = train_site(&encoded, &TrainConfig::default()).unwrap();

        assert_eq!(site.feature_names, vec!["marker"]);
        assert_eq!(site.classes.len(), 2);
        let accuracy = site.holdout_accuracy.unwrap();
        assert!(accuracy >= 0.5, "holdout accuracy {accuracy} too low");
    }

    #[test]
    fn test_train_site_without_holdout() {
        let encoded = separable_matrix();
        let config = TrainConfig {
            holdout_fraction: 0.0,
            ..TrainConfig::default()
        };
        let site = train_site(&encoded, &config).unwrap();
        assert!(site.holdout_accuracy.is_none());
        assert_eq!(site.predict_labels(&encoded.x).len(), 10);
    }

    #[test]
    fn test_single_class_partition_is_a_data_error() {
        let encoded = EncodedMatrix {
            x: array![[1.0], [2.0], [3.0]],
            y: array![0.0, 0.0, 0.0],
            feature_names: vec!["marker".to_string()],
            classes: vec![ClassLabel::Int(1)],
            label_name: "Result".to_string(),
        };
        let err = train_site(&encoded, &TrainConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
        assert!(err.to_string().contains("single class"));
    }

    #[test]
    fn test_empty_partition_is_a_data_error() {
        let encoded = EncodedMatrix {
            x: Array2::zeros((0, 1)),
            y: Array1::zeros(0),
            feature_names: vec!["marker".to_string()],
            classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
            label_name: "Result".to_string(),
        };
        let err = train_site(&encoded, &TrainConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_stratified_holdout_partitions_indices() {
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let (train, test) = stratified_holdout(&y, 0.2, 42);

        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        // One held-out row per class
        assert_eq!(test.iter().filter(|&&i| y[i] > 0.5).count(), 1);
    }

    #[test]
    fn test_stratified_holdout_keeps_tiny_classes_in_training() {
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0];
        let (train, test) = stratified_holdout(&y, 0.5, 42);

        // The lone positive row must stay in training
        assert!(train.iter().any(|&i| y[i] > 0.5));
        assert!(test.iter().all(|&i| y[i] < 0.5));
    }

    #[test]
    fn test_holdout_is_deterministic() {
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        assert_eq!(
            stratified_holdout(&y, 0.25, 42),
            stratified_holdout(&y, 0.25, 42)
        );
    }
}
