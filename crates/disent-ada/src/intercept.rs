//! Adaptive averaging of paired posteriors before sampling.
//!
//! The interceptor estimates which latent dimensions are shared by the two
//! observations of a pair and replaces those entries of *both* posteriors with
//! the averaged posterior. Entries judged changed keep their original values,
//! so the two outputs can only differ on the changed dimensions.
//!
//! Running the interceptor on its own output is not idempotent in general:
//! a second pass averages the already averaged entries again, and under
//! `ml-vae` each pass halves their variance.

use disent_core::{DisentError, ErrorInfo, GaussianPosterior};
use nalgebra::DMatrix;
use tracing::debug;

use crate::averaging::AverageMode;
use crate::config::AdaVaeConfig;
use crate::estimate::{estimate_unchanged, Estimate, ThresholdMode};

/// Posterior interceptor for the Ada-GVAE / Ada-ML-VAE frameworks.
///
/// The averaging and threshold modes are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdaInterceptor {
    average_mode: AverageMode,
    thresh_mode: ThresholdMode,
}

/// Posteriors returned by [`AdaInterceptor::intercept`].
#[derive(Debug, Clone, PartialEq)]
pub struct Intercepted {
    /// First posterior with unchanged dimensions averaged.
    pub first: GaussianPosterior,
    /// Second posterior with unchanged dimensions averaged.
    pub second: GaussianPosterior,
    /// The averaged posterior the masked entries were taken from.
    pub averaged: GaussianPosterior,
    /// Deltas, thresholds and mask behind the update.
    pub estimate: Estimate,
}

impl Intercepted {
    /// `(mean1, logvar1, mean2, logvar2)`.
    pub fn into_parts(self) -> (DMatrix<f64>, DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
        let (mean1, logvar1) = self.first.into_parts();
        let (mean2, logvar2) = self.second.into_parts();
        (mean1, logvar1, mean2, logvar2)
    }
}

impl AdaInterceptor {
    /// Number of paired observations consumed per step.
    pub const REQUIRED_OBSERVATIONS: usize = 2;

    /// Creates an interceptor with the given modes.
    pub fn new(average_mode: AverageMode, thresh_mode: ThresholdMode) -> Self {
        Self {
            average_mode,
            thresh_mode,
        }
    }

    /// Creates an interceptor from configuration keys such as `"ml-vae"` and
    /// `"kl"`, failing on unregistered keys.
    pub fn from_keys(average_mode: &str, thresh_mode: &str) -> Result<Self, DisentError> {
        Ok(Self::new(average_mode.parse()?, thresh_mode.parse()?))
    }

    /// Creates an interceptor from an Ada-VAE configuration.
    pub fn from_config(config: &AdaVaeConfig) -> Self {
        Self::new(config.average_mode, config.thresh_mode)
    }

    /// Configured averaging rule.
    pub fn average_mode(&self) -> AverageMode {
        self.average_mode
    }

    /// Configured delta divergence.
    pub fn thresh_mode(&self) -> ThresholdMode {
        self.thresh_mode
    }

    /// Averages the dimensions of `first` and `second` estimated as unchanged.
    ///
    /// Both posteriors are consumed; the returned values replace them.
    pub fn intercept(
        &self,
        first: GaussianPosterior,
        second: GaussianPosterior,
    ) -> Result<Intercepted, DisentError> {
        let estimate = estimate_unchanged(&first, &second, self.thresh_mode)?;
        let averaged = self.average_mode.combine(&first, &second)?;
        let mask = &estimate.unchanged;

        debug!(
            batch = first.batch_size(),
            latent_dim = first.latent_dim(),
            unchanged = estimate.unchanged_count(),
            average_mode = %self.average_mode,
            "intercepted posterior pair"
        );

        let first = masked_update(mask, &averaged, first)?;
        let second = masked_update(mask, &averaged, second)?;
        Ok(Intercepted {
            first,
            second,
            averaged,
            estimate,
        })
    }

    /// Variant of [`AdaInterceptor::intercept`] taking every observation of a
    /// step; anything other than exactly two posteriors is a contract violation.
    pub fn intercept_many(
        &self,
        posteriors: Vec<GaussianPosterior>,
    ) -> Result<Intercepted, DisentError> {
        let count = posteriors.len();
        let mut iter = posteriors.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(first), Some(second), None) => self.intercept(first, second),
            _ => Err(DisentError::Contract(
                ErrorInfo::new(
                    "observation-arity",
                    "adaptive averaging requires exactly two paired observations",
                )
                .with_context("expected", Self::REQUIRED_OBSERVATIONS.to_string())
                .with_context("found", count.to_string()),
            )),
        }
    }
}

/// `where(mask, averaged, original)` for both mean and logvar.
fn masked_update(
    mask: &DMatrix<bool>,
    averaged: &GaussianPosterior,
    original: GaussianPosterior,
) -> Result<GaussianPosterior, DisentError> {
    let (rows, cols) = original.shape();
    let (orig_mean, orig_logvar) = original.into_parts();
    let (ave_mean, ave_logvar) = (averaged.mean(), averaged.logvar());
    let mean = DMatrix::from_fn(rows, cols, |r, c| {
        if mask[(r, c)] {
            ave_mean[(r, c)]
        } else {
            orig_mean[(r, c)]
        }
    });
    let logvar = DMatrix::from_fn(rows, cols, |r, c| {
        if mask[(r, c)] {
            ave_logvar[(r, c)]
        } else {
            orig_logvar[(r, c)]
        }
    });
    GaussianPosterior::new(mean, logvar)
}
