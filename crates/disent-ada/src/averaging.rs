use std::fmt;
use std::str::FromStr;

use disent_core::{DisentError, GaussianPosterior};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Rule used to merge a pair of diagonal Gaussian posteriors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AverageMode {
    /// Arithmetic mean of means and variances (Ada-GVAE).
    #[default]
    Gvae,
    /// Precision-weighted product of Gaussians (Ada-ML-VAE).
    MlVae,
}

impl AverageMode {
    /// Every registered mode, in key order.
    pub const ALL: [AverageMode; 2] = [AverageMode::Gvae, AverageMode::MlVae];

    /// Configuration key of the mode.
    pub fn key(self) -> &'static str {
        match self {
            AverageMode::Gvae => "gvae",
            AverageMode::MlVae => "ml-vae",
        }
    }

    /// Registered configuration keys.
    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|mode| mode.key()).collect()
    }

    /// Merges two posteriors of identical shape into their average.
    pub fn combine(
        self,
        first: &GaussianPosterior,
        second: &GaussianPosterior,
    ) -> Result<GaussianPosterior, DisentError> {
        first.ensure_same_shape(second)?;
        let (mean, logvar) = match self {
            AverageMode::Gvae => average_gvae(first, second),
            AverageMode::MlVae => average_ml_vae(first, second),
        };
        GaussianPosterior::new(mean, logvar)
    }
}

impl fmt::Display for AverageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AverageMode {
    type Err = DisentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AverageMode::ALL
            .into_iter()
            .find(|mode| mode.key() == value)
            .ok_or_else(|| DisentError::unknown_key("average_mode", value, &AverageMode::keys()))
    }
}

/// Arithmetic mean of the two distributions. Returns `(mean, ln(variance))`.
fn average_gvae(
    first: &GaussianPosterior,
    second: &GaussianPosterior,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let (rows, cols) = first.shape();
    let (m1, lv1) = (first.mean(), first.logvar());
    let (m2, lv2) = (second.mean(), second.logvar());
    let mean = DMatrix::from_fn(rows, cols, |r, c| (m1[(r, c)] + m2[(r, c)]) * 0.5);
    let logvar = DMatrix::from_fn(rows, cols, |r, c| {
        let variance = (lv1[(r, c)].exp() + lv2[(r, c)].exp()) * 0.5;
        variance.ln()
    });
    (mean, logvar)
}

/// Product of the two distributions. For diagonal covariances the matrix
/// inverse is the element-wise reciprocal, so the combined precision is the
/// sum of precisions and the mean is precision-weighted.
fn average_ml_vae(
    first: &GaussianPosterior,
    second: &GaussianPosterior,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let (rows, cols) = first.shape();
    let (m1, lv1) = (first.mean(), first.logvar());
    let (m2, lv2) = (second.mean(), second.logvar());
    let mut mean = DMatrix::zeros(rows, cols);
    let mut logvar = DMatrix::zeros(rows, cols);
    for r in 0..rows {
        for c in 0..cols {
            let prec1 = lv1[(r, c)].exp().recip();
            let prec2 = lv2[(r, c)].exp().recip();
            let variance = (prec1 + prec2).recip();
            mean[(r, c)] = (m1[(r, c)] * prec1 + m2[(r, c)] * prec2) * variance;
            logvar[(r, c)] = variance.ln();
        }
    }
    (mean, logvar)
}
