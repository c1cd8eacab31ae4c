use thiserror::Error;

/// Inverse regularisation strength, matching the common `C = 1.0` default.
const DEFAULT_INVERSE_REG: f64 = 1.0;
const MAX_NEWTON_ITERS: usize = 100;
const NEWTON_TOL: f64 = 1e-10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("cannot fit calibration on an empty training set")]
    EmptyTrainingSet,
    #[error("features ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },
}

/// Single-feature binary probability model: no-vig home probability in,
/// calibrated home-win probability out.
pub trait Calibrator {
    fn fit(&mut self, features: &[f64], labels: &[bool]) -> Result<(), CalibrationError>;

    fn predict_probability(&self, feature: f64) -> f64;
}

/// Passes the market probability straight through.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCalibrator;

impl Calibrator for IdentityCalibrator {
    fn fit(&mut self, features: &[f64], labels: &[bool]) -> Result<(), CalibrationError> {
        check_inputs(features, labels)
    }

    fn predict_probability(&self, feature: f64) -> f64 {
        feature.clamp(0.0, 1.0)
    }
}

/// Platt-style logistic regression `p = σ(w·x + b)` with an L2 penalty on `w`.
#[derive(Debug, Clone, Copy)]
pub struct LogisticCalibrator {
    pub weight: f64,
    pub intercept: f64,
    inverse_reg: f64,
    fitted: bool,
}

impl Default for LogisticCalibrator {
    fn default() -> Self {
        Self::new(DEFAULT_INVERSE_REG)
    }
}

impl LogisticCalibrator {
    pub fn new(inverse_reg: f64) -> Self {
        Self {
            weight: 0.0,
            intercept: 0.0,
            inverse_reg: inverse_reg.max(1e-6),
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn objective(&self, w: f64, b: f64, xs: &[f64], ys: &[bool]) -> f64 {
        let mut total = 0.5 * w * w / self.inverse_reg;
        for (x, y) in xs.iter().zip(ys) {
            let z = w * x + b;
            total += softplus(z) - if *y { z } else { 0.0 };
        }
        total
    }
}

impl Calibrator for LogisticCalibrator {
    fn fit(&mut self, features: &[f64], labels: &[bool]) -> Result<(), CalibrationError> {
        check_inputs(features, labels)?;

        let mut w = 0.0_f64;
        let mut b = 0.0_f64;
        let mut current = self.objective(w, b, features, labels);

        for _ in 0..MAX_NEWTON_ITERS {
            let mut g_w = w / self.inverse_reg;
            let mut g_b = 0.0_f64;
            let mut h_ww = 1.0 / self.inverse_reg;
            let mut h_wb = 0.0_f64;
            let mut h_bb = 0.0_f64;
            for (x, y) in features.iter().zip(labels) {
                let p = sigmoid(w * x + b);
                let r = p - if *y { 1.0 } else { 0.0 };
                let s = p * (1.0 - p);
                g_w += r * x;
                g_b += r;
                h_ww += s * x * x;
                h_wb += s * x;
                h_bb += s;
            }

            let det = h_ww * h_bb - h_wb * h_wb;
            if det <= 1e-12 {
                break;
            }
            let dw = (h_bb * g_w - h_wb * g_b) / det;
            let db = (h_ww * g_b - h_wb * g_w) / det;

            // Halve the Newton step until the penalised log-loss stops increasing.
            let mut step = 1.0_f64;
            let mut next = self.objective(w - dw, b - db, features, labels);
            while next > current && step > 1e-8 {
                step *= 0.5;
                next = self.objective(w - step * dw, b - step * db, features, labels);
            }
            w -= step * dw;
            b -= step * db;
            current = next;

            if (step * dw).abs().max((step * db).abs()) < NEWTON_TOL {
                break;
            }
        }

        self.weight = w;
        self.intercept = b;
        self.fitted = true;
        Ok(())
    }

    fn predict_probability(&self, feature: f64) -> f64 {
        if !self.fitted {
            return 0.5;
        }
        sigmoid(self.weight * feature + self.intercept).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    fn empty() -> Self {
        Self {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

pub fn evaluate(predictions: &[f64], labels: &[bool]) -> Metrics {
    if predictions.is_empty() || predictions.len() != labels.len() {
        return Metrics::empty();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, y) in predictions.iter().zip(labels) {
        let p = p.clamp(0.0, 1.0);
        let target = if *y { 1.0 } else { 0.0 };
        brier_sum += (p - target).powi(2);

        let actual_prob = (if *y { p } else { 1.0 - p }).clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();

        if (p >= 0.5) == *y {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

/// Reliability table: predictions bucketed into `bins` equal-width buckets.
pub fn calibration_bins(predictions: &[f64], labels: &[bool], bins: usize) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, y) in predictions.iter().zip(labels) {
        let p = p.clamp(0.0, 1.0);
        let idx = ((p * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += p;
        if *y {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

fn check_inputs(features: &[f64], labels: &[bool]) -> Result<(), CalibrationError> {
    if features.len() != labels.len() {
        return Err(CalibrationError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if features.is_empty() {
        return Err(CalibrationError::EmptyTrainingSet);
    }
    Ok(())
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CalibrationError, Calibrator, IdentityCalibrator, LogisticCalibrator, calibration_bins,
        evaluate,
    };

    /// Deterministic Bernoulli draws with success rate equal to the feature.
    fn market_like_sample(n: usize) -> (Vec<f64>, Vec<bool>) {
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for i in 0..n {
            let x = 0.05 + 0.9 * i as f64 / (n - 1) as f64;
            let u = ((i * 7919) % 1000) as f64 / 1000.0;
            xs.push(x);
            ys.push(u < x);
        }
        (xs, ys)
    }

    #[test]
    fn empty_training_set_is_an_error() {
        let mut model = LogisticCalibrator::default();
        assert_eq!(model.fit(&[], &[]), Err(CalibrationError::EmptyTrainingSet));
        assert!(!model.is_fitted());
        assert_eq!(model.predict_probability(0.7), 0.5);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut model = IdentityCalibrator;
        assert!(matches!(
            model.fit(&[0.4, 0.6], &[true]),
            Err(CalibrationError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn logistic_fit_is_monotone_and_bounded() {
        let (xs, ys) = market_like_sample(400);
        let mut model = LogisticCalibrator::default();
        model.fit(&xs, &ys).expect("fit");
        assert!(model.weight > 0.0);

        let mut prev = -1.0;
        for step in 0..=20 {
            let p = model.predict_probability(step as f64 / 20.0);
            assert!((0.0..=1.0).contains(&p));
            assert!(p > prev);
            prev = p;
        }
        let mid = model.predict_probability(0.5);
        assert!((mid - 0.5).abs() < 0.15, "mid {mid}");
    }

    #[test]
    fn logistic_fit_survives_single_class_labels() {
        let xs = vec![0.3, 0.5, 0.7];
        let ys = vec![true, true, true];
        let mut model = LogisticCalibrator::default();
        model.fit(&xs, &ys).expect("fit");
        let p = model.predict_probability(0.5);
        assert!(p.is_finite() && p > 0.5 && p <= 1.0);
    }

    #[test]
    fn identity_passes_through() {
        let mut model = IdentityCalibrator;
        model.fit(&[0.2], &[false]).expect("fit");
        assert_eq!(model.predict_probability(0.55), 0.55);
        assert_eq!(model.predict_probability(1.4), 1.0);
    }

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let m = evaluate(&[1.0, 0.0, 1.0], &[true, false, true]);
        assert_eq!(m.samples, 3);
        assert!(m.brier < 1e-12);
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn bins_cover_every_prediction() {
        let preds = [0.05, 0.15, 0.55, 0.95, 1.0];
        let labels = [false, false, true, true, true];
        let bins = calibration_bins(&preds, &labels, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), preds.len());
        assert_eq!(bins[9].count, 2);
        assert_eq!(bins[9].actual_rate, 1.0);
    }
}
