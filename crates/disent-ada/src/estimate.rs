use std::fmt;
use std::str::FromStr;

use disent_core::{DisentError, ErrorInfo, GaussianPosterior};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Divergence used to score how much each latent dimension changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `KL(first || second)` per element.
    #[default]
    Kl,
    /// Mean of both KL directions, invariant to swapping the pair.
    SymmetricKl,
}

impl ThresholdMode {
    /// Every registered mode, in key order.
    pub const ALL: [ThresholdMode; 2] = [ThresholdMode::Kl, ThresholdMode::SymmetricKl];

    /// Configuration key of the mode.
    pub fn key(self) -> &'static str {
        match self {
            ThresholdMode::Kl => "kl",
            ThresholdMode::SymmetricKl => "symmetric_kl",
        }
    }

    /// Registered configuration keys.
    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|mode| mode.key()).collect()
    }

    /// Per-element divergences between the pair under this mode.
    pub fn deltas(
        self,
        first: &GaussianPosterior,
        second: &GaussianPosterior,
    ) -> Result<DMatrix<f64>, DisentError> {
        match self {
            ThresholdMode::Kl => kl_deltas(first, second),
            ThresholdMode::SymmetricKl => symmetric_kl_deltas(first, second),
        }
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ThresholdMode {
    type Err = DisentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ThresholdMode::ALL
            .into_iter()
            .find(|mode| mode.key() == value)
            .ok_or_else(|| DisentError::unknown_key("thresh_mode", value, &ThresholdMode::keys()))
    }
}

/// Outcome of the change estimator for one batch of pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Per-pair, per-dimension divergences, `[batch, latent_dim]`.
    pub kl_deltas: DMatrix<f64>,
    /// Per-pair thresholds, `[batch, 1]`.
    pub thresholds: DMatrix<f64>,
    /// `true` where the dimension is judged unchanged, `[batch, latent_dim]`.
    pub unchanged: DMatrix<bool>,
}

impl Estimate {
    /// Number of entries judged unchanged across the batch.
    pub fn unchanged_count(&self) -> usize {
        self.unchanged.iter().filter(|flag| **flag).count()
    }

    /// Number of entries judged changed across the batch.
    pub fn changed_count(&self) -> usize {
        self.unchanged.len() - self.unchanged_count()
    }
}

/// Closed-form KL divergence `KL(N(m1, v1) || N(m2, v2))` evaluated per
/// latent dimension:
///
/// `0.5 * (v1/v2 + (m2 - m1)^2 / v2 - 1 + (lv2 - lv1))`
pub fn kl_deltas(
    first: &GaussianPosterior,
    second: &GaussianPosterior,
) -> Result<DMatrix<f64>, DisentError> {
    first.ensure_same_shape(second)?;
    let (rows, cols) = first.shape();
    let (m1, lv1) = (first.mean(), first.logvar());
    let (m2, lv2) = (second.mean(), second.logvar());
    Ok(DMatrix::from_fn(rows, cols, |r, c| {
        let var2 = lv2[(r, c)].exp();
        let diff = m2[(r, c)] - m1[(r, c)];
        0.5 * (lv1[(r, c)].exp() / var2 + diff * diff / var2 - 1.0 + (lv2[(r, c)] - lv1[(r, c)]))
    }))
}

/// `0.5 * (KL(first || second) + KL(second || first))` per element.
pub fn symmetric_kl_deltas(
    first: &GaussianPosterior,
    second: &GaussianPosterior,
) -> Result<DMatrix<f64>, DisentError> {
    let forward = kl_deltas(first, second)?;
    let backward = kl_deltas(second, first)?;
    Ok((forward + backward) * 0.5)
}

/// Midpoint between the largest and smallest delta of each row, `[batch, 1]`.
///
/// An empty batch yields an empty `[0, 1]` threshold.
pub fn kl_threshold(kl_deltas: &DMatrix<f64>) -> Result<DMatrix<f64>, DisentError> {
    if kl_deltas.nrows() == 0 {
        return Ok(DMatrix::zeros(0, 1));
    }
    if kl_deltas.ncols() == 0 {
        return Err(DisentError::Contract(
            ErrorInfo::new(
                "empty-deltas",
                "thresholds need at least one latent dimension",
            )
            .with_shape("kl_deltas", kl_deltas.shape()),
        ));
    }
    let thresholds = kl_deltas.row_iter().map(|row| {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = row.iter().copied().fold(f64::INFINITY, f64::min);
        0.5 * (max + min)
    });
    Ok(DMatrix::from_iterator(kl_deltas.nrows(), 1, thresholds))
}

/// `kl_deltas < thresholds`, broadcasting the `[batch, 1]` thresholds across
/// each row. Ties count as changed.
pub fn unchanged_mask(
    kl_deltas: &DMatrix<f64>,
    thresholds: &DMatrix<f64>,
) -> Result<DMatrix<bool>, DisentError> {
    if thresholds.shape() != (kl_deltas.nrows(), 1) {
        return Err(DisentError::Contract(
            ErrorInfo::new("threshold-shape", "thresholds must have shape [batch, 1]")
                .with_shape("kl_deltas", kl_deltas.shape())
                .with_shape("thresholds", thresholds.shape()),
        ));
    }
    let (rows, cols) = kl_deltas.shape();
    Ok(DMatrix::from_fn(rows, cols, |r, c| {
        kl_deltas[(r, c)] < thresholds[(r, 0)]
    }))
}

/// Estimates which latent dimensions stayed the same between each pair.
pub fn estimate_unchanged(
    first: &GaussianPosterior,
    second: &GaussianPosterior,
    mode: ThresholdMode,
) -> Result<Estimate, DisentError> {
    let kl_deltas = mode.deltas(first, second)?;
    let thresholds = kl_threshold(&kl_deltas)?;
    let unchanged = unchanged_mask(&kl_deltas, &thresholds)?;
    Ok(Estimate {
        kl_deltas,
        thresholds,
        unchanged,
    })
}
