//! Diagonal Gaussian posteriors produced by an encoder.

use nalgebra::{DMatrix, Scalar};
use serde::{Deserialize, Serialize};

use crate::errors::{DisentError, ErrorInfo};

/// Independent per-dimension Gaussian posterior for a batch of observations.
///
/// `mean` and `logvar` are `[batch, latent_dim]` matrices with one row per
/// observation. The log-variance is a natural logarithm and carries no sign
/// constraint, so `exp(logvar)` is always a valid variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PosteriorRows", into = "PosteriorRows")]
pub struct GaussianPosterior {
    mean: DMatrix<f64>,
    logvar: DMatrix<f64>,
}

impl GaussianPosterior {
    /// Creates a posterior, rejecting `mean`/`logvar` pairs of differing shape.
    pub fn new(mean: DMatrix<f64>, logvar: DMatrix<f64>) -> Result<Self, DisentError> {
        if mean.shape() != logvar.shape() {
            return Err(DisentError::Contract(
                ErrorInfo::new(
                    "posterior-shape-mismatch",
                    "mean and logvar must have identical shapes",
                )
                .with_shape("mean", mean.shape())
                .with_shape("logvar", logvar.shape()),
            ));
        }
        Ok(Self { mean, logvar })
    }

    /// Builds a posterior from row-major nested vectors.
    pub fn from_rows(mean: &[Vec<f64>], logvar: &[Vec<f64>]) -> Result<Self, DisentError> {
        Self::new(matrix_from_rows(mean)?, matrix_from_rows(logvar)?)
    }

    /// Standard normal posterior `N(0, 1)` of the given shape.
    pub fn standard_normal(batch: usize, latent_dim: usize) -> Self {
        Self {
            mean: DMatrix::zeros(batch, latent_dim),
            logvar: DMatrix::zeros(batch, latent_dim),
        }
    }

    /// Posterior means, `[batch, latent_dim]`.
    pub fn mean(&self) -> &DMatrix<f64> {
        &self.mean
    }

    /// Posterior natural log-variances, `[batch, latent_dim]`.
    pub fn logvar(&self) -> &DMatrix<f64> {
        &self.logvar
    }

    /// Element-wise variances `exp(logvar)`.
    pub fn variance(&self) -> DMatrix<f64> {
        self.logvar.map(f64::exp)
    }

    /// `(batch, latent_dim)`.
    pub fn shape(&self) -> (usize, usize) {
        self.mean.shape()
    }

    /// Number of observations in the batch.
    pub fn batch_size(&self) -> usize {
        self.mean.nrows()
    }

    /// Number of latent dimensions.
    pub fn latent_dim(&self) -> usize {
        self.mean.ncols()
    }

    /// Fails with a contract violation unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &GaussianPosterior) -> Result<(), DisentError> {
        if self.shape() != other.shape() {
            return Err(DisentError::Contract(
                ErrorInfo::new(
                    "pair-shape-mismatch",
                    "paired posteriors must have identical shapes",
                )
                .with_shape("first", self.shape())
                .with_shape("second", other.shape()),
            ));
        }
        Ok(())
    }

    /// Consumes the posterior returning `(mean, logvar)`.
    pub fn into_parts(self) -> (DMatrix<f64>, DMatrix<f64>) {
        (self.mean, self.logvar)
    }
}

/// Row-major serialized form of a [`GaussianPosterior`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorRows {
    /// One row of means per observation.
    #[serde(with = "crate::float_serde::rows")]
    pub mean: Vec<Vec<f64>>,
    /// One row of log-variances per observation.
    #[serde(with = "crate::float_serde::rows")]
    pub logvar: Vec<Vec<f64>>,
}

impl TryFrom<PosteriorRows> for GaussianPosterior {
    type Error = DisentError;

    fn try_from(rows: PosteriorRows) -> Result<Self, Self::Error> {
        GaussianPosterior::from_rows(&rows.mean, &rows.logvar)
    }
}

impl From<GaussianPosterior> for PosteriorRows {
    fn from(posterior: GaussianPosterior) -> Self {
        PosteriorRows {
            mean: matrix_to_rows(&posterior.mean),
            logvar: matrix_to_rows(&posterior.logvar),
        }
    }
}

/// Builds a matrix from row-major nested vectors, rejecting ragged input.
///
/// An empty slice yields a `0 x 0` matrix.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, DisentError> {
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != ncols) {
        return Err(DisentError::Contract(
            ErrorInfo::new("ragged-rows", "all rows must have the same length")
                .with_context("row", idx.to_string())
                .with_context("expected", ncols.to_string())
                .with_context("found", row.len().to_string()),
        ));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(rows.len(), ncols, &flat))
}

/// Converts a matrix into row-major nested vectors.
pub fn matrix_to_rows<T: Scalar + Copy>(matrix: &DMatrix<T>) -> Vec<Vec<T>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}
