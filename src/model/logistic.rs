use super::ProbabilityModel;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2_penalty: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 400,
            l2_penalty: 1e-4,
        }
    }
}

/// Binary logistic regression over standardized inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl LogisticRegression {
    /// Fit by full-batch gradient descent. Labels are `true` for phishing.
    pub fn fit(
        feature_names: Vec<String>,
        samples: &[Vec<f64>],
        labels: &[bool],
        params: TrainingParams,
    ) -> Result<Self> {
        if samples.is_empty() {
            bail!("cannot train on an empty dataset");
        }
        if samples.len() != labels.len() {
            bail!(
                "sample count {} does not match label count {}",
                samples.len(),
                labels.len()
            );
        }
        let dims = feature_names.len();
        if let Some(bad) = samples.iter().position(|s| s.len() != dims) {
            bail!(
                "sample {} has {} features, expected {}",
                bad,
                samples[bad].len(),
                dims
            );
        }

        let n = samples.len() as f64;
        let mut means = vec![0.0; dims];
        for sample in samples {
            for (mean, value) in means.iter_mut().zip(sample) {
                *mean += value / n;
            }
        }
        let mut scales = vec![0.0; dims];
        for sample in samples {
            for ((scale, value), mean) in scales.iter_mut().zip(sample).zip(&means) {
                *scale += (value - mean).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = scale.sqrt();
            if *scale < 1e-12 {
                *scale = 1.0;
            }
        }

        let standardized: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| standardize(s, &means, &scales))
            .collect();

        let mut weights = vec![0.0; dims];
        let mut bias = 0.0;
        for epoch in 0..params.epochs {
            let mut grad_w = vec![0.0; dims];
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (x, &label) in standardized.iter().zip(labels) {
                let target = if label { 1.0 } else { 0.0 };
                let p = sigmoid(dot(&weights, x) + bias);
                let err = p - target;
                for (g, xi) in grad_w.iter_mut().zip(x) {
                    *g += err * xi;
                }
                grad_b += err;
                loss -= target * p.max(1e-12).ln() + (1.0 - target) * (1.0 - p).max(1e-12).ln();
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * (g / n + params.l2_penalty * *w);
            }
            bias -= params.learning_rate * grad_b / n;

            if epoch % 100 == 0 {
                log::debug!("epoch {}: log loss {:.4}", epoch, loss / n);
            }
        }

        Ok(Self {
            feature_names,
            weights,
            bias,
            means,
            scales,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.weights.len()
    }

    /// Fraction of samples whose thresholded prediction matches the label.
    pub fn accuracy(&self, samples: &[Vec<f64>], labels: &[bool]) -> Result<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (sample, &label) in samples.iter().zip(labels) {
            if (self.predict_probability(sample)? > 0.5) == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }

    fn check_shape(&self) -> Result<()> {
        let dims = self.weights.len();
        if self.means.len() != dims || self.scales.len() != dims {
            bail!(
                "corrupt model: {} weights, {} means, {} scales",
                dims,
                self.means.len(),
                self.scales.len()
            );
        }
        Ok(())
    }
}

impl ProbabilityModel for LogisticRegression {
    fn predict_probability(&self, features: &[f64]) -> Result<f64> {
        self.check_shape()?;
        if features.len() != self.dimensions() {
            bail!(
                "model expects {} features, got {}",
                self.dimensions(),
                features.len()
            );
        }
        if features.iter().any(|v| !v.is_finite()) {
            bail!("feature vector contains a non-finite value");
        }
        let x = standardize(features, &self.means, &self.scales);
        let p = sigmoid(dot(&self.weights, &x) + self.bias);
        if !p.is_finite() {
            bail!("model produced a non-finite probability");
        }
        Ok(p)
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

fn standardize(sample: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    sample
        .iter()
        .zip(means)
        .zip(scales)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..50 {
            let v = i as f64 / 10.0;
            samples.push(vec![v, 1.0]);
            labels.push(v > 2.5);
        }
        (samples, labels)
    }

    #[test]
    fn test_fit_learns_separable_data() {
        let (samples, labels) = separable();
        let model = LogisticRegression::fit(
            vec!["x".to_string(), "constant".to_string()],
            &samples,
            &labels,
            TrainingParams::default(),
        )
        .unwrap();

        assert!(model.accuracy(&samples, &labels).unwrap() > 0.9);
        assert!(model.predict_probability(&[4.9, 1.0]).unwrap() > 0.8);
        assert!(model.predict_probability(&[0.0, 1.0]).unwrap() < 0.2);
        // zero-variance feature must not produce NaN
        assert_eq!(model.scales[1], 1.0);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let (samples, labels) = separable();
        let model = LogisticRegression::fit(
            vec!["x".to_string(), "constant".to_string()],
            &samples,
            &labels,
            TrainingParams::default(),
        )
        .unwrap();
        assert!(model.predict_probability(&[1.0]).is_err());
        assert!(model.predict_probability(&[f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let names = vec!["x".to_string()];
        assert!(LogisticRegression::fit(names.clone(), &[], &[], TrainingParams::default())
            .is_err());
        assert!(LogisticRegression::fit(
            names.clone(),
            &[vec![1.0]],
            &[true, false],
            TrainingParams::default()
        )
        .is_err());
        assert!(LogisticRegression::fit(
            names,
            &[vec![1.0, 2.0]],
            &[true],
            TrainingParams::default()
        )
        .is_err());
    }

    #[test]
    fn test_corrupt_model_is_an_error() {
        let model = LogisticRegression {
            feature_names: vec!["x".to_string()],
            weights: vec![1.0],
            bias: 0.0,
            means: vec![],
            scales: vec![1.0],
        };
        assert!(model.predict_probability(&[1.0]).is_err());
    }
}
