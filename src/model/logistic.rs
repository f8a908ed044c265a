//! L2-regularized binary logistic regression fit by gradient descent.
//!
//! Class weights are inversely proportional to class frequency, which
//! counteracts label imbalance without resampling. Features are
//! standardized internally for the descent and the learned parameters are
//! mapped back to the raw feature space, so the fitted model evaluates
//! `w·x + b` directly on unscaled inputs.

use ndarray::{Array1, Array2};

/// Hyperparameters for a logistic-regression fit
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Gradient-descent step size
    pub learning_rate: f64,
    /// L2 regularization strength (the intercept is not penalized)
    pub l2_penalty: f64,
    /// Iteration cap; reaching it is not an error
    pub max_iter: usize,
    /// Stop early once the gradient infinity-norm falls below this
    pub tolerance: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            l2_penalty: 1.0,
            max_iter: 200,
            tolerance: 1e-4,
        }
    }
}

/// A fitted binary logistic-regression model in raw feature space
#[derive(Debug, Clone)]
pub struct LogisticModel {
    /// One coefficient per feature
    pub weights: Array1<f64>,
    /// Intercept term
    pub intercept: f64,
    /// Whether the gradient tolerance was reached within the iteration cap
    pub converged: bool,
    /// Iterations actually run
    pub iterations: usize,
}

/// Numerically-stable sigmoid
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// Fit on a feature matrix and a 0/1 label vector
    ///
    /// Callers guarantee a non-empty matrix holding both classes; see the
    /// trainer entry point for the degenerate-partition checks.
    #[must_use]
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> LogisticModel {
        let rows = x.nrows();
        let cols = x.ncols();

        // Standardize each feature for the descent; constant features keep
        // scale 1 so the mapping back stays well-defined.
        let mut mean = Array1::<f64>::zeros(cols);
        let mut scale = Array1::<f64>::ones(cols);
        for j in 0..cols {
            let column = x.column(j);
            let m = column.mean().unwrap_or(0.0);
            let variance = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / rows as f64;
            let s = variance.sqrt();
            mean[j] = m;
            if s > 1e-12 {
                scale[j] = s;
            }
        }
        let xs = (x - &mean) / &scale;

        // Balanced class weights: n / (2 * count_c)
        let positive_count = y.iter().filter(|&&v| v > 0.5).count();
        let weight_pos = rows as f64 / (2.0 * positive_count.max(1) as f64);
        let weight_neg = rows as f64 / (2.0 * (rows - positive_count).max(1) as f64);
        let sample_weights: Array1<f64> =
            y.mapv(|v| if v > 0.5 { weight_pos } else { weight_neg });
        let weight_sum = sample_weights.sum();

        let mut w = Array1::<f64>::zeros(cols);
        let mut b = 0.0_f64;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            let z = xs.dot(&w) + b;
            let p = z.mapv(sigmoid);
            let err = (&p - y) * &sample_weights;

            let grad_w = xs.t().dot(&err) / weight_sum + &w * (self.l2_penalty / weight_sum);
            let grad_b = err.sum() / weight_sum;

            let grad_norm = grad_w.iter().fold(grad_b.abs(), |m, g| m.max(g.abs()));

            w.scaled_add(-self.learning_rate, &grad_w);
            b -= self.learning_rate * grad_b;
            iterations = iter + 1;

            if grad_norm < self.tolerance {
                converged = true;
                break;
            }
        }

        // Map parameters back to the raw feature space:
        // w_raw = w / scale, b_raw = b - sum(w_raw * mean)
        let mut weights = Array1::<f64>::zeros(cols);
        let mut intercept = b;
        for j in 0..cols {
            let wj = w[j] / scale[j];
            weights[j] = wj;
            intercept -= wj * mean[j];
        }

        LogisticModel {
            weights,
            intercept,
            converged,
            iterations,
        }
    }
}

impl LogisticModel {
    /// Raw decision values `w·x + b`, one per row
    #[must_use]
    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.intercept
    }

    /// Positive-class probabilities
    #[must_use]
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_function(x).mapv(sigmoid)
    }

    /// Predicted class indices (0 or 1), thresholded at 0.5
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        self.predict_proba(x)
            .iter()
            .map(|&p| usize::from(p >= 0.5))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_separable_data() {
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let model = LogisticRegression::default().fit(&x, &y);
        assert_eq!(model.predict(&x), vec![0, 0, 1, 1]);
        assert!(model.weights[0] > 0.0);
    }

    #[test]
    fn test_decision_function_sign_matches_predictions() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [3.0, 4.0], [4.0, 3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let model = LogisticRegression::default().fit(&x, &y);
        let decisions = model.decision_function(&x);
        let predictions = model.predict(&x);
        for (d, p) in decisions.iter().zip(&predictions) {
            assert_eq!(*p == 1, *d >= 0.0);
        }
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let x = array![[-1.0], [1.0]];
        let y = array![0.0, 1.0];

        let trainer = LogisticRegression {
            max_iter: 1,
            ..LogisticRegression::default()
        };
        let model = trainer.fit(&x, &y);
        assert!(!model.converged);
        assert_eq!(model.iterations, 1);
    }

    #[test]
    fn test_imbalanced_labels_still_separate() {
        // 8 negatives, 2 positives; balanced weights keep the minority
        // class from being drowned out.
        let x = array![
            [-4.0],
            [-3.5],
            [-3.0],
            [-2.5],
            [-2.0],
            [-1.5],
            [-1.0],
            [-0.5],
            [2.0],
            [3.0]
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];

        let model = LogisticRegression::default().fit(&x, &y);
        assert_eq!(model.predict(&x), vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_raw_space_parameters() {
        // Features with very different scales; the returned parameters must
        // apply to unscaled inputs.
        let x = array![[100.0, 0.1], [200.0, 0.2], [300.0, 0.3], [400.0, 0.4]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let model = LogisticRegression::default().fit(&x, &y);
        let direct: Vec<usize> = x
            .rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row
                    .iter()
                    .zip(model.weights.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    + model.intercept;
                usize::from(z >= 0.0)
            })
            .collect();
        assert_eq!(direct, model.predict(&x));
    }
}
