use std::fs;

use disent_ada::{
    config_from_json, config_from_yaml, load_config, AverageMode, ExperimentConfig, Framework,
    LossReduction, ReconLoss, ThresholdMode,
};
use disent_core::DisentError;

#[test]
fn empty_document_uses_defaults() {
    let config = config_from_yaml("{}").unwrap();
    assert_eq!(config, ExperimentConfig::default());
    match config.framework {
        Framework::AdaVae(ada) => {
            assert_eq!(ada.average_mode, AverageMode::Gvae);
            assert_eq!(ada.thresh_mode, ThresholdMode::Kl);
            assert_eq!(ada.vae.beta, 4.0);
            assert_eq!(ada.vae.recon_loss, ReconLoss::Bce);
            assert_eq!(ada.vae.loss_reduction, LossReduction::MeanSum);
        }
        other => panic!("expected ada_vae, got {other:?}"),
    }
}

#[test]
fn full_yaml_document() {
    let text = r#"
framework: ada_vae
beta: 1.5
average_mode: ml-vae
thresh_mode: symmetric_kl
recon_loss: mse
loss_reduction: mean
seed_policy:
  master_seed: 42
"#;
    let config = config_from_yaml(text).unwrap();
    assert_eq!(config.seed_policy.master_seed, 42);
    let interceptor = config.framework.interceptor().unwrap();
    assert_eq!(interceptor.average_mode(), AverageMode::MlVae);
    assert_eq!(interceptor.thresh_mode(), ThresholdMode::SymmetricKl);
    let vae = config.framework.vae_config();
    assert_eq!(vae.beta, 1.5);
    assert_eq!(vae.recon_loss, ReconLoss::Mse);
    assert_eq!(vae.loss_reduction, LossReduction::Mean);
}

#[test]
fn bogus_average_mode_is_a_config_error() {
    let err = config_from_yaml("average_mode: bogus\n").unwrap_err();
    match err {
        DisentError::Config(info) => {
            assert_eq!(info.code, "unknown-average-mode");
            assert_eq!(info.context["average_mode"], "bogus");
            assert_eq!(info.context["valid"], "{gvae, ml-vae}");
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn unknown_framework_lists_registry() {
    let err = config_from_yaml("framework: gan\n").unwrap_err();
    assert_eq!(err.info().code, "unknown-framework");
    assert_eq!(err.info().context["valid"], "{ada_vae, beta_vae}");
}

#[test]
fn unknown_fields_are_rejected() {
    let err = config_from_yaml("averaging: gvae\n").unwrap_err();
    assert!(matches!(err, DisentError::Serde(ref info) if info.code == "config-yaml"));
}

#[test]
fn negative_beta_is_rejected() {
    let err = config_from_yaml("beta: -1.0\n").unwrap_err();
    assert!(matches!(err, DisentError::Config(ref info) if info.code == "invalid-beta"));
}

#[test]
fn beta_vae_has_no_interceptor() {
    let config = config_from_json(r#"{"framework": "beta_vae", "beta": 1.0}"#).unwrap();
    assert!(config.framework.interceptor().is_none());
    assert_eq!(config.framework.spec().required_observations, 1);
    assert_eq!(config.framework.vae_config().beta, 1.0);
}

#[test]
fn load_config_picks_format_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("experiment.yaml");
    fs::write(&yaml, "average_mode: ml-vae\n").unwrap();
    let json = dir.path().join("experiment.json");
    fs::write(&json, r#"{"thresh_mode": "symmetric_kl"}"#).unwrap();

    let from_yaml = load_config(&yaml).unwrap();
    assert_eq!(
        from_yaml.framework.interceptor().unwrap().average_mode(),
        AverageMode::MlVae
    );
    let from_json = load_config(&json).unwrap();
    assert_eq!(
        from_json.framework.interceptor().unwrap().thresh_mode(),
        ThresholdMode::SymmetricKl
    );

    let missing = load_config(&dir.path().join("missing.yaml")).unwrap_err();
    assert_eq!(missing.info().code, "config-read");
}
