use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use disent_core::{DisentError, ErrorInfo, GaussianPosterior};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BetaVaeConfig;

/// Reduction applied to a `[batch, dims]` matrix of element losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LossReduction {
    /// Mean over every element.
    Mean,
    /// Sum over each row, then mean over the batch.
    #[default]
    MeanSum,
}

impl LossReduction {
    /// Every registered reduction, in key order.
    pub const ALL: [LossReduction; 2] = [LossReduction::Mean, LossReduction::MeanSum];

    /// Configuration key of the reduction.
    pub fn key(self) -> &'static str {
        match self {
            LossReduction::Mean => "mean",
            LossReduction::MeanSum => "mean_sum",
        }
    }

    /// Reduces element losses to a scalar.
    pub fn reduce(self, losses: &DMatrix<f64>) -> Result<f64, DisentError> {
        if losses.is_empty() {
            return Err(DisentError::Contract(
                ErrorInfo::new("empty-loss", "cannot reduce an empty loss matrix")
                    .with_shape("losses", losses.shape()),
            ));
        }
        Ok(match self {
            LossReduction::Mean => losses.sum() / losses.len() as f64,
            LossReduction::MeanSum => losses.sum() / losses.nrows() as f64,
        })
    }
}

impl FromStr for LossReduction {
    type Err = DisentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LossReduction::ALL
            .into_iter()
            .find(|reduction| reduction.key() == value)
            .ok_or_else(|| {
                let keys: Vec<_> = LossReduction::ALL.iter().map(|r| r.key()).collect();
                DisentError::unknown_key("loss_reduction", value, &keys)
            })
    }
}

/// Reconstruction likelihood comparing unactivated decoder outputs to targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconLoss {
    /// Squared error after mapping outputs from `[-1, 1]` to `[0, 1]`.
    Mse,
    /// Binary cross entropy on logits.
    #[default]
    Bce,
    /// Bernoulli negative log-likelihood; numerically identical to `Bce`.
    Bernoulli,
    /// Unit-variance Gaussian negative log-likelihood.
    Normal,
}

impl ReconLoss {
    /// Every registered loss, in key order.
    pub const ALL: [ReconLoss; 4] = [
        ReconLoss::Mse,
        ReconLoss::Bce,
        ReconLoss::Bernoulli,
        ReconLoss::Normal,
    ];

    /// Configuration key of the loss.
    pub fn key(self) -> &'static str {
        match self {
            ReconLoss::Mse => "mse",
            ReconLoss::Bce => "bce",
            ReconLoss::Bernoulli => "bernoulli",
            ReconLoss::Normal => "normal",
        }
    }

    /// Final activation of the model output for this likelihood.
    pub fn activate(self, x: f64) -> f64 {
        match self {
            ReconLoss::Mse | ReconLoss::Normal => 0.5 * (x + 1.0),
            ReconLoss::Bce | ReconLoss::Bernoulli => 1.0 / (1.0 + (-x).exp()),
        }
    }

    /// Per-element losses for unactivated outputs `x_recon` against `target`.
    pub fn element_losses(
        self,
        x_recon: &DMatrix<f64>,
        target: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, DisentError> {
        if x_recon.shape() != target.shape() {
            return Err(DisentError::Contract(
                ErrorInfo::new("recon-shape-mismatch", "reconstruction and target shapes differ")
                    .with_shape("x_recon", x_recon.shape())
                    .with_shape("target", target.shape()),
            ));
        }
        if self == ReconLoss::Normal {
            warn_normal_once();
        }
        Ok(x_recon.zip_map(target, |x, t| match self {
            ReconLoss::Mse => {
                let diff = self.activate(x) - t;
                diff * diff
            }
            ReconLoss::Bce | ReconLoss::Bernoulli => bce_with_logits(x, t),
            ReconLoss::Normal => {
                let diff = t - self.activate(x);
                0.5 * diff * diff + 0.5 * TAU.ln()
            }
        }))
    }

    /// Reduced reconstruction loss.
    pub fn compute(
        self,
        x_recon: &DMatrix<f64>,
        target: &DMatrix<f64>,
        reduction: LossReduction,
    ) -> Result<f64, DisentError> {
        reduction.reduce(&self.element_losses(x_recon, target)?)
    }
}

impl fmt::Display for ReconLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ReconLoss {
    type Err = DisentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReconLoss::ALL
            .into_iter()
            .find(|loss| loss.key() == value)
            .ok_or_else(|| {
                let keys: Vec<_> = ReconLoss::ALL.iter().map(|l| l.key()).collect();
                DisentError::unknown_key("recon_loss", value, &keys)
            })
    }
}

fn warn_normal_once() {
    static WARNED: Once = Once::new();
    WARNED.call_once(|| {
        warn!("using normal distribution for reconstruction loss, this is not recommended");
    });
}

/// Stable `BCE(sigmoid(x), t)`: `max(x, 0) - x*t + ln(1 + exp(-|x|))`.
fn bce_with_logits(x: f64, t: f64) -> f64 {
    x.max(0.0) - x * t + (-x.abs()).exp().ln_1p()
}

/// KL divergence of each posterior element from the standard normal prior,
/// `0.5 * (m^2 + exp(lv) - lv - 1)`, reduced with `reduction`.
pub fn kl_normal_loss(
    posterior: &GaussianPosterior,
    reduction: LossReduction,
) -> Result<f64, DisentError> {
    let elements = posterior
        .mean()
        .zip_map(posterior.logvar(), |m, lv| 0.5 * (m * m + lv.exp() - lv - 1.0));
    reduction.reduce(&elements)
}

/// Scalar terms of a VAE objective averaged over the observation branches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossBreakdown {
    /// `recon_loss + beta * kl_loss`.
    pub loss: f64,
    /// Mean reconstruction loss over branches.
    pub recon_loss: f64,
    /// Mean prior KL over branches.
    pub kl_loss: f64,
    /// `-(recon_loss + kl_loss)`.
    pub elbo: f64,
}

/// Beta-VAE objective summed over each observation branch and divided by the
/// number of branches.
///
/// With one branch this is the Beta-VAE loss; with the two intercepted
/// posteriors of a pair it is the Ada-VAE loss
/// `((recon1 + recon2) + beta * (kl1 + kl2)) / 2`.
pub fn vae_loss(
    config: &BetaVaeConfig,
    targets: &[DMatrix<f64>],
    recons: &[DMatrix<f64>],
    posteriors: &[GaussianPosterior],
) -> Result<LossBreakdown, DisentError> {
    let branches = posteriors.len();
    if branches == 0 || targets.len() != branches || recons.len() != branches {
        return Err(DisentError::Contract(
            ErrorInfo::new(
                "branch-count",
                "targets, reconstructions and posteriors must pair up one to one",
            )
            .with_context("targets", targets.len().to_string())
            .with_context("recons", recons.len().to_string())
            .with_context("posteriors", branches.to_string()),
        ));
    }
    let mut recon_total = 0.0;
    let mut kl_total = 0.0;
    for ((target, recon), posterior) in targets.iter().zip(recons).zip(posteriors) {
        recon_total += config
            .recon_loss
            .compute(recon, target, config.loss_reduction)?;
        kl_total += kl_normal_loss(posterior, config.loss_reduction)?;
    }
    let n = branches as f64;
    let recon_loss = recon_total / n;
    let kl_loss = kl_total / n;
    Ok(LossBreakdown {
        loss: (recon_total + config.beta * kl_total) / n,
        recon_loss,
        kl_loss,
        elbo: -(recon_loss + kl_loss),
    })
}
