//! Evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// F1 / precision / recall for one prediction set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
}

impl ClassificationMetrics {
    /// Compute metrics with 1.0 as the positive class.
    ///
    /// Works for 0/1 as well as the -1/1 encoding the source dataset uses;
    /// the positive label is fixed so a degenerate all-negative prediction
    /// cannot score as a perfect positive predictor.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let positive = 1.0;

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t_pos = (*t - positive).abs() < 1e-10;
            let p_pos = (*p - positive).abs() < 1e-10;
            match (t_pos, p_pos) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            f1_score,
            precision,
            recall,
        }
    }
}

/// Coefficient of determination.
///
/// The trainer ranks classifier candidates by this score on predicted labels.
/// That is the reference behavior, kept deliberately: the value is only used
/// as a relative ranking signal, never reported as a goodness measure.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res > 0.0 {
        0.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_predictions() {
        let y = array![1.0, 0.0, 1.0, 1.0];
        let m = ClassificationMetrics::compute(&y, &y);
        assert_eq!(m.f1_score, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(r2_score(&y, &y), 1.0);
    }

    #[test]
    fn test_signed_labels() {
        let y_true = array![1.0, -1.0, 1.0, -1.0];
        let y_pred = array![1.0, 1.0, 1.0, -1.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred);
        // tp = 2, fp = 1, fn = 0
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.recall, 1.0);
        assert!(m.f1_score > 0.0 && m.f1_score < 1.0);
    }

    #[test]
    fn test_degenerate_predictions_stay_in_range() {
        let y_true = array![1.0, 1.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred);
        assert_eq!(m.f1_score, 0.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
    }

    #[test]
    fn test_all_negative_predictions_do_not_score_as_positive() {
        // with no positive labels anywhere there are no true positives
        let y = array![-1.0, -1.0, -1.0];
        let m = ClassificationMetrics::compute(&y, &y);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_r2_ranks_better_predictions_higher() {
        let y = array![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let good = array![1.0, -1.0, 1.0, -1.0, 1.0, 1.0];
        let bad = array![-1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
        assert!(r2_score(&y, &good) > r2_score(&y, &bad));
    }
}
