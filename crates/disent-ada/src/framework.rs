use disent_core::{DisentError, GaussianPosterior};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::config::{AdaVaeConfig, BetaVaeConfig};
use crate::intercept::AdaInterceptor;
use crate::loss::{vae_loss, LossBreakdown};

/// Capabilities a training loop must honour for a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameworkSpec {
    /// Registry name.
    pub name: &'static str,
    /// Whether posteriors must pass through an interceptor before sampling.
    pub requires_intercept: bool,
    /// Observations encoded per training step.
    pub required_observations: usize,
    /// One line summary.
    pub description: &'static str,
}

const BETA_VAE: FrameworkSpec = FrameworkSpec {
    name: "beta_vae",
    requires_intercept: false,
    required_observations: 1,
    description: "Beta-VAE with a single observation per step",
};

const ADA_VAE: FrameworkSpec = FrameworkSpec {
    name: "ada_vae",
    requires_intercept: true,
    required_observations: AdaInterceptor::REQUIRED_OBSERVATIONS,
    description: "Ada-GVAE / Ada-ML-VAE averaging the unchanged latents of paired observations",
};

/// Every registered framework.
pub fn framework_registry() -> Vec<FrameworkSpec> {
    vec![ADA_VAE, BETA_VAE]
}

/// Configured framework.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "framework", rename_all = "snake_case")]
pub enum Framework {
    /// Unsupervised Beta-VAE.
    BetaVae(BetaVaeConfig),
    /// Weakly supervised adaptive-averaging VAE.
    AdaVae(AdaVaeConfig),
}

impl Framework {
    /// Looks up `name` in the registry. The Beta-VAE keeps only the objective
    /// part of `config`.
    pub fn from_name(name: &str, config: AdaVaeConfig) -> Result<Self, DisentError> {
        match name {
            "beta_vae" => Ok(Framework::BetaVae(config.vae)),
            "ada_vae" => Ok(Framework::AdaVae(config)),
            other => {
                let names: Vec<_> = framework_registry().iter().map(|spec| spec.name).collect();
                Err(DisentError::unknown_key("framework", other, &names))
            }
        }
    }

    /// Capability descriptor of the framework.
    pub fn spec(&self) -> FrameworkSpec {
        match self {
            Framework::BetaVae(_) => BETA_VAE,
            Framework::AdaVae(_) => ADA_VAE,
        }
    }

    /// Objective settings.
    pub fn vae_config(&self) -> &BetaVaeConfig {
        match self {
            Framework::BetaVae(config) => config,
            Framework::AdaVae(config) => &config.vae,
        }
    }

    /// Interceptor for frameworks flagged with `requires_intercept`.
    pub fn interceptor(&self) -> Option<AdaInterceptor> {
        match self {
            Framework::BetaVae(_) => None,
            Framework::AdaVae(config) => Some(AdaInterceptor::from_config(config)),
        }
    }

    /// Loss over every observation branch of a step.
    pub fn compute_loss(
        &self,
        targets: &[DMatrix<f64>],
        recons: &[DMatrix<f64>],
        posteriors: &[GaussianPosterior],
    ) -> Result<LossBreakdown, DisentError> {
        vae_loss(self.vae_config(), targets, recons, posteriors)
    }
}
