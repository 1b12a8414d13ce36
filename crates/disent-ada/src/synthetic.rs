//! Synthetic ground-truth pairs for exercising the change estimator.
//!
//! Factor vectors are drawn uniformly; the second observation of each pair
//! differs from the first in exactly `k` factors. An oracle encoder places
//! factor `i` on latent dimension `i` with a little Gaussian noise, so the
//! truly changed dimensions are known.

use disent_core::{DisentError, ErrorInfo, GaussianPosterior, RngHandle};
use nalgebra::DMatrix;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn sampler_error(code: &str, message: impl Into<String>) -> DisentError {
    DisentError::Config(ErrorInfo::new(code, message))
}

fn default_factor_sizes() -> Vec<usize> {
    vec![3, 6, 40, 32, 32]
}

fn default_k() -> usize {
    1
}

fn default_noise_std() -> f64 {
    0.05
}

fn default_logvar() -> f64 {
    -4.0
}

fn default_spacing() -> f64 {
    1.0
}

/// Settings of the synthetic pair sampler and oracle encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSamplerConfig {
    /// Number of values each ground-truth factor can take.
    #[serde(default = "default_factor_sizes")]
    pub factor_sizes: Vec<usize>,
    /// Factors that differ between the two observations of a pair.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Standard deviation of the encoder noise added to each mean.
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    /// Constant log-variance reported by the encoder.
    #[serde(default = "default_logvar")]
    pub logvar: f64,
    /// Latent distance between neighbouring factor values.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
}

impl Default for PairSamplerConfig {
    fn default() -> Self {
        Self {
            factor_sizes: default_factor_sizes(),
            k: default_k(),
            noise_std: default_noise_std(),
            logvar: default_logvar(),
            spacing: default_spacing(),
        }
    }
}

impl PairSamplerConfig {
    /// Number of ground-truth factors (and latent dimensions).
    pub fn num_factors(&self) -> usize {
        self.factor_sizes.len()
    }

    /// Checks the settings can produce pairs.
    pub fn validate(&self) -> Result<(), DisentError> {
        if self.factor_sizes.is_empty() {
            return Err(sampler_error("no-factors", "at least one factor is required"));
        }
        if self.k > self.num_factors() {
            return Err(DisentError::Config(
                ErrorInfo::new("k-too-large", "cannot change more factors than exist")
                    .with_context("k", self.k.to_string())
                    .with_context("num_factors", self.num_factors().to_string()),
            ));
        }
        let min_size = if self.k > 0 { 2 } else { 1 };
        if let Some(pos) = self.factor_sizes.iter().position(|size| *size < min_size) {
            return Err(DisentError::Config(
                ErrorInfo::new("factor-size", "factor too small to be sampled or changed")
                    .with_context("factor", pos.to_string())
                    .with_context("size", self.factor_sizes[pos].to_string()),
            ));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(sampler_error("noise-std", "noise_std must be finite and >= 0"));
        }
        if !self.logvar.is_finite() || !self.spacing.is_finite() {
            return Err(sampler_error("non-finite", "logvar and spacing must be finite"));
        }
        Ok(())
    }
}

/// A batch of synthetic observation pairs and their encodings.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticPairs {
    /// Factor values of the first observation of each pair.
    pub first_factors: Vec<Vec<usize>>,
    /// Factor values of the second observation of each pair.
    pub second_factors: Vec<Vec<usize>>,
    /// Encoded first observations.
    pub first: GaussianPosterior,
    /// Encoded second observations.
    pub second: GaussianPosterior,
    /// Ground truth: `true` where the factor differs within the pair.
    pub changed: DMatrix<bool>,
}

impl SyntheticPairs {
    /// Factors scaled to `[0, 1]`, `[batch, num_factors]`, for use as
    /// reconstruction targets.
    pub fn normalized_targets(&self, config: &PairSamplerConfig) -> [DMatrix<f64>; 2] {
        [
            normalize(&self.first_factors, &config.factor_sizes),
            normalize(&self.second_factors, &config.factor_sizes),
        ]
    }
}

fn normalize(factors: &[Vec<usize>], sizes: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(factors.len(), sizes.len(), |r, c| {
        if sizes[c] > 1 {
            factors[r][c] as f64 / (sizes[c] - 1) as f64
        } else {
            0.0
        }
    })
}

/// Samples `batch` pairs differing in exactly `config.k` factors.
pub fn sample_pairs(
    config: &PairSamplerConfig,
    batch: usize,
    rng: &mut RngHandle,
) -> Result<SyntheticPairs, DisentError> {
    config.validate()?;
    if batch == 0 {
        return Err(sampler_error("empty-batch", "batch size must be positive"));
    }
    let num_factors = config.num_factors();
    let mut first_factors = Vec::with_capacity(batch);
    let mut second_factors = Vec::with_capacity(batch);
    let mut changed = DMatrix::from_element(batch, num_factors, false);

    for row in 0..batch {
        let first: Vec<usize> = config
            .factor_sizes
            .iter()
            .map(|size| rng.gen_range(0..*size))
            .collect();
        let mut second = first.clone();
        for factor in index::sample(rng.inner_mut(), num_factors, config.k).into_vec() {
            // Uniform over the other values of the factor.
            let mut value = rng.gen_range(0..config.factor_sizes[factor] - 1);
            if value >= first[factor] {
                value += 1;
            }
            second[factor] = value;
            changed[(row, factor)] = true;
        }
        first_factors.push(first);
        second_factors.push(second);
    }

    let first = encode(config, &first_factors, rng)?;
    let second = encode(config, &second_factors, rng)?;
    Ok(SyntheticPairs {
        first_factors,
        second_factors,
        first,
        second,
        changed,
    })
}

fn encode(
    config: &PairSamplerConfig,
    factors: &[Vec<usize>],
    rng: &mut RngHandle,
) -> Result<GaussianPosterior, DisentError> {
    let rows = factors.len();
    let cols = config.num_factors();
    let noise = rng.normal_matrix(rows, cols);
    let mean = DMatrix::from_fn(rows, cols, |r, c| {
        factors[r][c] as f64 * config.spacing + config.noise_std * noise[(r, c)]
    });
    GaussianPosterior::new(mean, DMatrix::from_element(rows, cols, config.logvar))
}

/// Agreement between an estimated unchanged mask and the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStats {
    /// Fraction of entries classified correctly.
    pub accuracy: f64,
    /// Of the entries estimated unchanged, the fraction truly unchanged.
    pub unchanged_precision: Option<f64>,
    /// Of the truly unchanged entries, the fraction estimated unchanged.
    pub unchanged_recall: Option<f64>,
    /// Pairs whose whole row was classified correctly.
    pub exact_pairs: usize,
    /// Pairs evaluated.
    pub pairs: usize,
}

/// Compares `estimated_unchanged` with the ground-truth `changed` mask.
pub fn recovery_stats(
    estimated_unchanged: &DMatrix<bool>,
    changed: &DMatrix<bool>,
) -> Result<RecoveryStats, DisentError> {
    if estimated_unchanged.shape() != changed.shape() || changed.is_empty() {
        return Err(DisentError::Contract(
            ErrorInfo::new("recovery-shape", "masks must be non-empty and equally shaped")
                .with_shape("estimated", estimated_unchanged.shape())
                .with_shape("changed", changed.shape()),
        ));
    }
    let mut correct = 0usize;
    let mut true_pos = 0usize;
    let mut predicted_pos = 0usize;
    let mut actual_pos = 0usize;
    for (estimated, changed) in estimated_unchanged.iter().zip(changed.iter()) {
        let truth = !*changed;
        if *estimated == truth {
            correct += 1;
        }
        if *estimated {
            predicted_pos += 1;
        }
        if truth {
            actual_pos += 1;
        }
        if *estimated && truth {
            true_pos += 1;
        }
    }
    let exact_pairs = (0..changed.nrows())
        .filter(|&r| (0..changed.ncols()).all(|c| estimated_unchanged[(r, c)] != changed[(r, c)]))
        .count();
    let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
    Ok(RecoveryStats {
        accuracy: correct as f64 / changed.len() as f64,
        unchanged_precision: ratio(true_pos, predicted_pos),
        unchanged_recall: ratio(true_pos, actual_pos),
        exact_pairs,
        pairs: changed.nrows(),
    })
}
