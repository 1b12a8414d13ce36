use disent_ada::{
    framework_registry, reparameterize, training_step, AdaVaeConfig, BetaVaeConfig, Decoder,
    Framework, LossReduction, ReconLoss,
};
use disent_core::{DisentError, GaussianPosterior, RngHandle};
use nalgebra::DMatrix;

fn pair() -> Vec<GaussianPosterior> {
    vec![
        GaussianPosterior::from_rows(&[vec![0.0, 0.0]], &[vec![-20.0, -20.0]]).unwrap(),
        GaussianPosterior::from_rows(&[vec![0.0, 5.0]], &[vec![-20.0, -20.0]]).unwrap(),
    ]
}

struct Identity;

impl Decoder for Identity {
    fn decode(&mut self, z: &DMatrix<f64>) -> Result<DMatrix<f64>, DisentError> {
        Ok(z.clone())
    }
}

#[test]
fn registry_flags_capabilities() {
    let registry = framework_registry();
    let ada = registry.iter().find(|spec| spec.name == "ada_vae").unwrap();
    assert!(ada.requires_intercept);
    assert_eq!(ada.required_observations, 2);
    let beta = registry.iter().find(|spec| spec.name == "beta_vae").unwrap();
    assert!(!beta.requires_intercept);
    assert_eq!(beta.required_observations, 1);
}

#[test]
fn reparameterize_is_seeded() {
    let posterior = GaussianPosterior::from_rows(&[vec![1.0, -1.0]], &[vec![0.0, 2.0]]).unwrap();
    let a = reparameterize(&posterior, &mut RngHandle::from_seed(3));
    let b = reparameterize(&posterior, &mut RngHandle::from_seed(3));
    assert_eq!(a, b);

    let tight = GaussianPosterior::from_rows(&[vec![1.0, -1.0]], &[vec![-60.0, -60.0]]).unwrap();
    let z = reparameterize(&tight, &mut RngHandle::from_seed(3));
    assert!((z[(0, 0)] - 1.0).abs() < 1e-9);
    assert!((z[(0, 1)] + 1.0).abs() < 1e-9);
}

#[test]
fn ada_step_intercepts_before_decoding() {
    let framework = Framework::AdaVae(AdaVaeConfig {
        vae: BetaVaeConfig {
            beta: 1.0,
            recon_loss: ReconLoss::Mse,
            loss_reduction: LossReduction::MeanSum,
        },
        ..AdaVaeConfig::default()
    });
    let targets = vec![DMatrix::from_element(1, 2, 0.5); 2];
    let mut decoded = Vec::new();
    let mut decoder = |z: &DMatrix<f64>| -> Result<DMatrix<f64>, DisentError> {
        decoded.push(z.clone());
        Ok(DMatrix::zeros(z.nrows(), z.ncols()))
    };
    let mut rng = RngHandle::from_seed(7);
    let out = training_step(&framework, &targets, pair(), &mut decoder, &mut rng).unwrap();

    let estimate = out.estimate.unwrap();
    assert_eq!(estimate.unchanged, DMatrix::from_row_slice(1, 2, &[true, false]));
    assert_eq!(out.posteriors[1].mean()[(0, 1)], 5.0);
    assert_eq!(out.samples.len(), 2);
    assert_eq!(decoded.len(), 2);
    // zero logits decode to 0.5 under mse, matching the targets
    assert!(out.loss.recon_loss.abs() < 1e-12);
    assert!(out.loss.kl_loss > 0.0);
}

#[test]
fn beta_step_passes_posteriors_through() {
    let framework = Framework::BetaVae(BetaVaeConfig::default());
    let targets = vec![DMatrix::from_element(1, 2, 1.0)];
    let posteriors = vec![GaussianPosterior::standard_normal(1, 2)];
    let mut rng = RngHandle::from_seed(1);
    let out = training_step(
        &framework,
        &targets,
        posteriors.clone(),
        &mut Identity,
        &mut rng,
    )
    .unwrap();
    assert!(out.estimate.is_none());
    assert_eq!(out.posteriors, posteriors);
    assert_eq!(out.loss.kl_loss, 0.0);
}

#[test]
fn observation_count_must_match_framework() {
    let ada = Framework::AdaVae(AdaVaeConfig::default());
    let targets = vec![DMatrix::zeros(1, 2)];
    let mut rng = RngHandle::from_seed(1);
    let err = training_step(
        &ada,
        &targets,
        vec![GaussianPosterior::standard_normal(1, 2)],
        &mut Identity,
        &mut rng,
    )
    .unwrap_err();
    match err {
        DisentError::Contract(info) => {
            assert_eq!(info.code, "observation-arity");
            assert_eq!(info.context["framework"], "ada_vae");
            assert_eq!(info.context["expected"], "2");
        }
        other => panic!("expected contract violation, got {other:?}"),
    }

    let beta = Framework::BetaVae(BetaVaeConfig::default());
    let err = training_step(&beta, &[], pair(), &mut Identity, &mut rng).unwrap_err();
    assert_eq!(err.info().code, "observation-arity");
}
