//! One training step: intercept (when required), sample, decode, score.

use disent_core::{DisentError, ErrorInfo, GaussianPosterior, RngHandle};
use nalgebra::DMatrix;
use tracing::trace;

use crate::estimate::Estimate;
use crate::framework::Framework;
use crate::loss::LossBreakdown;

/// Maps latent samples to unactivated reconstructions.
pub trait Decoder {
    /// Decodes a `[batch, latent_dim]` sample.
    fn decode(&mut self, z: &DMatrix<f64>) -> Result<DMatrix<f64>, DisentError>;
}

impl<F> Decoder for F
where
    F: FnMut(&DMatrix<f64>) -> Result<DMatrix<f64>, DisentError>,
{
    fn decode(&mut self, z: &DMatrix<f64>) -> Result<DMatrix<f64>, DisentError> {
        self(z)
    }
}

/// Result of [`training_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Loss terms for the step.
    pub loss: LossBreakdown,
    /// Posteriors the samples were drawn from (post-intercept when applicable).
    pub posteriors: Vec<GaussianPosterior>,
    /// Latent samples, one per observation.
    pub samples: Vec<DMatrix<f64>>,
    /// Change estimate when the framework intercepted the posteriors.
    pub estimate: Option<Estimate>,
}

/// Reparameterised sample `mean + exp(0.5 * logvar) * eps`, `eps ~ N(0, 1)`.
pub fn reparameterize(posterior: &GaussianPosterior, rng: &mut RngHandle) -> DMatrix<f64> {
    let (rows, cols) = posterior.shape();
    let eps = rng.normal_matrix(rows, cols);
    let std = posterior.logvar().map(|lv| (0.5 * lv).exp());
    posterior.mean() + std.component_mul(&eps)
}

/// Runs one step of `framework` over the encoded observations of a batch.
///
/// The observation count must match the framework's
/// `required_observations`. Frameworks flagged with `requires_intercept`
/// have their posteriors replaced before sampling.
pub fn training_step(
    framework: &Framework,
    targets: &[DMatrix<f64>],
    posteriors: Vec<GaussianPosterior>,
    decoder: &mut dyn Decoder,
    rng: &mut RngHandle,
) -> Result<StepOutput, DisentError> {
    let spec = framework.spec();
    if posteriors.len() != spec.required_observations || targets.len() != posteriors.len() {
        return Err(DisentError::Contract(
            ErrorInfo::new(
                "observation-arity",
                "observation count does not match the framework",
            )
            .with_context("framework", spec.name)
            .with_context("expected", spec.required_observations.to_string())
            .with_context("posteriors", posteriors.len().to_string())
            .with_context("targets", targets.len().to_string()),
        ));
    }

    let (posteriors, estimate) = match framework.interceptor() {
        Some(interceptor) if spec.requires_intercept => {
            let intercepted = interceptor.intercept_many(posteriors)?;
            (
                vec![intercepted.first, intercepted.second],
                Some(intercepted.estimate),
            )
        }
        _ => (posteriors, None),
    };

    let samples: Vec<DMatrix<f64>> = posteriors
        .iter()
        .map(|posterior| reparameterize(posterior, rng))
        .collect();
    let recons = samples
        .iter()
        .map(|z| decoder.decode(z))
        .collect::<Result<Vec<_>, _>>()?;
    let loss = framework.compute_loss(targets, &recons, &posteriors)?;
    trace!(framework = spec.name, loss = loss.loss, "training step");

    Ok(StepOutput {
        loss,
        posteriors,
        samples,
        estimate,
    })
}
