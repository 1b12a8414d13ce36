use std::fs;
use std::path::Path;

use disent_core::{DisentError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::averaging::AverageMode;
use crate::estimate::ThresholdMode;
use crate::framework::Framework;
use crate::loss::{LossReduction, ReconLoss};

fn default_framework() -> String {
    "ada_vae".to_string()
}

fn default_beta() -> f64 {
    4.0
}

fn default_average_mode() -> String {
    AverageMode::default().key().to_string()
}

fn default_thresh_mode() -> String {
    ThresholdMode::default().key().to_string()
}

fn default_recon_loss() -> String {
    ReconLoss::default().key().to_string()
}

fn default_loss_reduction() -> String {
    LossReduction::default().key().to_string()
}

fn default_master_seed() -> u64 {
    0x0ADA_5EED_u64
}

/// Settings shared by every VAE objective.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetaVaeConfig {
    /// Weight of the prior KL term.
    pub beta: f64,
    /// Reconstruction likelihood.
    pub recon_loss: ReconLoss,
    /// Reduction applied to element losses.
    pub loss_reduction: LossReduction,
}

impl Default for BetaVaeConfig {
    fn default() -> Self {
        Self {
            beta: default_beta(),
            recon_loss: ReconLoss::default(),
            loss_reduction: LossReduction::default(),
        }
    }
}

/// Ada-GVAE / Ada-ML-VAE settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AdaVaeConfig {
    /// Objective settings inherited from the Beta-VAE.
    #[serde(flatten)]
    pub vae: BetaVaeConfig,
    /// Rule used to merge the pair's posteriors.
    pub average_mode: AverageMode,
    /// Divergence used to score changed dimensions.
    pub thresh_mode: ThresholdMode,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed from which every substream is derived.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
        }
    }
}

/// Fully resolved experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentConfig {
    /// Framework and its objective settings.
    #[serde(flatten)]
    pub framework: Framework,
    /// Seeding policy.
    pub seed_policy: SeedPolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            framework: Framework::AdaVae(AdaVaeConfig::default()),
            seed_policy: SeedPolicy::default(),
        }
    }
}

/// On-disk form of [`ExperimentConfig`]. Mode keys stay strings until
/// `ConfigFile::resolve` so unknown keys surface as configuration errors
/// that name the valid set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_framework")]
    framework: String,
    #[serde(default = "default_beta")]
    beta: f64,
    #[serde(default = "default_average_mode")]
    average_mode: String,
    #[serde(default = "default_thresh_mode")]
    thresh_mode: String,
    #[serde(default = "default_recon_loss")]
    recon_loss: String,
    #[serde(default = "default_loss_reduction")]
    loss_reduction: String,
    #[serde(default)]
    seed_policy: SeedPolicy,
}

impl ConfigFile {
    fn resolve(self) -> Result<ExperimentConfig, DisentError> {
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(DisentError::Config(
                ErrorInfo::new("invalid-beta", "beta must be finite and non-negative")
                    .with_context("beta", self.beta.to_string()),
            ));
        }
        let vae = BetaVaeConfig {
            beta: self.beta,
            recon_loss: self.recon_loss.parse()?,
            loss_reduction: self.loss_reduction.parse()?,
        };
        let ada = AdaVaeConfig {
            vae,
            average_mode: self.average_mode.parse()?,
            thresh_mode: self.thresh_mode.parse()?,
        };
        let framework = Framework::from_name(&self.framework, ada)?;
        Ok(ExperimentConfig {
            framework,
            seed_policy: self.seed_policy,
        })
    }
}

/// Parses a YAML experiment configuration.
pub fn config_from_yaml(text: &str) -> Result<ExperimentConfig, DisentError> {
    let file: ConfigFile = serde_yaml::from_str(text).map_err(|err| {
        DisentError::Serde(ErrorInfo::new("config-yaml", err.to_string()))
    })?;
    file.resolve()
}

/// Parses a JSON experiment configuration.
pub fn config_from_json(text: &str) -> Result<ExperimentConfig, DisentError> {
    let file: ConfigFile = serde_json::from_str(text).map_err(|err| {
        DisentError::Serde(ErrorInfo::new("config-json", err.to_string()))
    })?;
    file.resolve()
}

/// Loads a configuration file, choosing JSON for `.json` paths and YAML
/// otherwise.
pub fn load_config(path: &Path) -> Result<ExperimentConfig, DisentError> {
    let text = fs::read_to_string(path).map_err(|err| {
        DisentError::Serde(
            ErrorInfo::new("config-read", "failed to read configuration file")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => config_from_json(&text),
        _ => config_from_yaml(&text),
    }
}
