//! Adaptive posterior averaging for weakly supervised VAE training.
//!
//! Pairs of observations that differ in a few ground-truth factors are
//! encoded into diagonal Gaussian posteriors. [`AdaInterceptor`] estimates
//! which latent dimensions stayed the same across each pair and replaces them
//! in both posteriors by an average ([`AverageMode::Gvae`] or
//! [`AverageMode::MlVae`]), before sampling and decoding.

mod averaging;
mod config;
mod estimate;
mod framework;
mod hash;
mod intercept;
mod loss;
mod report;
mod step;
mod synthetic;

pub use averaging::AverageMode;
pub use config::{
    config_from_json, config_from_yaml, load_config, AdaVaeConfig, BetaVaeConfig,
    ExperimentConfig, SeedPolicy,
};
pub use estimate::{
    estimate_unchanged, kl_deltas, kl_threshold, symmetric_kl_deltas, unchanged_mask, Estimate,
    ThresholdMode,
};
pub use framework::{framework_registry, Framework, FrameworkSpec};
pub use hash::{stable_hash_string, to_canonical_json_bytes};
pub use intercept::{AdaInterceptor, Intercepted};
pub use loss::{kl_normal_loss, vae_loss, LossBreakdown, LossReduction, ReconLoss};
pub use report::{
    build_intercept_report, pair_from_json, report_from_json, report_to_json, InterceptReport,
    PosteriorPair, REPORT_SCHEMA,
};
pub use step::{reparameterize, training_step, Decoder, StepOutput};
pub use synthetic::{
    recovery_stats, sample_pairs, PairSamplerConfig, RecoveryStats, SyntheticPairs,
};
