use disent_core::{
    matrix_to_rows, DisentError, ErrorInfo, GaussianPosterior, RunProvenance, SchemaVersion,
};
use serde::{Deserialize, Serialize};

use crate::averaging::AverageMode;
use crate::estimate::ThresholdMode;
use crate::hash::stable_hash_string;
use crate::intercept::AdaInterceptor;

/// Schema of [`InterceptReport`] payloads.
pub const REPORT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

fn map_err(err: serde_json::Error, code: &str) -> DisentError {
    DisentError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Encoded posteriors of a batch of observation pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorPair {
    /// Posteriors of the first observation of each pair.
    pub first: GaussianPosterior,
    /// Posteriors of the second observation of each pair.
    pub second: GaussianPosterior,
}

/// Everything an intercept call computed, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptReport {
    /// Payload schema.
    pub schema_version: SchemaVersion,
    /// Hashes of inputs and settings.
    pub provenance: RunProvenance,
    /// Averaging rule used.
    pub average_mode: AverageMode,
    /// Delta divergence used.
    pub thresh_mode: ThresholdMode,
    /// Pairs in the batch.
    pub batch_size: usize,
    /// Latent dimensions per posterior.
    pub latent_dim: usize,
    /// Per-dimension deltas, one row per pair.
    #[serde(with = "disent_core::float_serde::rows")]
    pub kl_deltas: Vec<Vec<f64>>,
    /// One threshold per pair.
    #[serde(with = "disent_core::float_serde::values")]
    pub thresholds: Vec<f64>,
    /// Unchanged mask, one row per pair.
    pub unchanged: Vec<Vec<bool>>,
    /// Entries judged unchanged across the batch.
    pub unchanged_count: usize,
    /// Averaged posterior.
    pub averaged: GaussianPosterior,
    /// First posterior after the update.
    pub first: GaussianPosterior,
    /// Second posterior after the update.
    pub second: GaussianPosterior,
    /// Content hash of the report with this field left empty.
    pub report_hash: String,
}

/// Runs `interceptor` on `pair` and captures the result.
pub fn build_intercept_report(
    interceptor: &AdaInterceptor,
    pair: PosteriorPair,
) -> Result<InterceptReport, DisentError> {
    let input_hash = stable_hash_string(&pair)?;
    let config_hash =
        stable_hash_string(&(interceptor.average_mode(), interceptor.thresh_mode()))?;
    let provenance = RunProvenance {
        config_hash,
        input_hash,
        seed: None,
        tool_versions: Default::default(),
    }
    .with_tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let (batch_size, latent_dim) = pair.first.shape();
    let intercepted = interceptor.intercept(pair.first, pair.second)?;
    let estimate = &intercepted.estimate;

    let mut report = InterceptReport {
        schema_version: REPORT_SCHEMA,
        provenance,
        average_mode: interceptor.average_mode(),
        thresh_mode: interceptor.thresh_mode(),
        batch_size,
        latent_dim,
        kl_deltas: matrix_to_rows(&estimate.kl_deltas),
        thresholds: estimate.thresholds.iter().copied().collect(),
        unchanged: matrix_to_rows(&estimate.unchanged),
        unchanged_count: estimate.unchanged_count(),
        averaged: intercepted.averaged.clone(),
        first: intercepted.first.clone(),
        second: intercepted.second.clone(),
        report_hash: String::new(),
    };
    report.report_hash = stable_hash_string(&report)?;
    Ok(report)
}

/// Restores a posterior pair from JSON.
pub fn pair_from_json(json: &str) -> Result<PosteriorPair, DisentError> {
    serde_json::from_str(json).map_err(|err| map_err(err, "pair-deserialize"))
}

/// Serialises an intercept report to JSON.
pub fn report_to_json(report: &InterceptReport) -> Result<String, DisentError> {
    serde_json::to_string_pretty(report).map_err(|err| map_err(err, "report-serialize"))
}

/// Restores an intercept report from JSON.
pub fn report_from_json(json: &str) -> Result<InterceptReport, DisentError> {
    serde_json::from_str(json).map_err(|err| map_err(err, "report-deserialize"))
}
