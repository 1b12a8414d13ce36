use disent_ada::{
    recovery_stats, sample_pairs, AdaInterceptor, AverageMode, PairSamplerConfig, ThresholdMode,
};
use disent_core::{DisentError, RngHandle};
use nalgebra::DMatrix;

fn config(k: usize, noise_std: f64) -> PairSamplerConfig {
    PairSamplerConfig {
        factor_sizes: vec![3, 3, 4, 5],
        k,
        noise_std,
        ..PairSamplerConfig::default()
    }
}

#[test]
fn pairs_differ_in_exactly_k_factors() {
    for k in 0..=4 {
        let cfg = config(k, 0.05);
        let mut rng = RngHandle::from_seed(100 + k as u64);
        let pairs = sample_pairs(&cfg, 16, &mut rng).unwrap();
        assert_eq!(pairs.first.shape(), (16, 4));
        for (row, (a, b)) in pairs.first_factors.iter().zip(&pairs.second_factors).enumerate() {
            let differing: Vec<usize> = (0..4).filter(|&f| a[f] != b[f]).collect();
            assert_eq!(differing.len(), k);
            for f in 0..4 {
                assert_eq!(pairs.changed[(row, f)], differing.contains(&f));
                assert!(a[f] < cfg.factor_sizes[f] && b[f] < cfg.factor_sizes[f]);
            }
        }
    }
}

#[test]
fn sampling_is_reproducible() {
    let cfg = config(2, 0.1);
    let a = sample_pairs(&cfg, 8, &mut RngHandle::from_seed(5)).unwrap();
    let b = sample_pairs(&cfg, 8, &mut RngHandle::from_seed(5)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn noiseless_single_change_is_recovered() {
    let cfg = config(1, 0.0);
    let mut rng = RngHandle::from_seed(2024);
    let pairs = sample_pairs(&cfg, 64, &mut rng).unwrap();
    for average_mode in AverageMode::ALL {
        for thresh_mode in ThresholdMode::ALL {
            let interceptor = AdaInterceptor::new(average_mode, thresh_mode);
            let out = interceptor
                .intercept(pairs.first.clone(), pairs.second.clone())
                .unwrap();
            let stats = recovery_stats(&out.estimate.unchanged, &pairs.changed).unwrap();
            assert_eq!(stats.accuracy, 1.0);
            assert_eq!(stats.exact_pairs, 64);
            assert_eq!(stats.unchanged_precision, Some(1.0));
        }
    }
}

#[test]
fn low_noise_recovery_is_high() {
    let cfg = config(1, 0.05);
    let mut rng = RngHandle::from_seed(77);
    let pairs = sample_pairs(&cfg, 128, &mut rng).unwrap();
    let out = AdaInterceptor::default()
        .intercept(pairs.first, pairs.second)
        .unwrap();
    let stats = recovery_stats(&out.estimate.unchanged, &pairs.changed).unwrap();
    assert!(stats.accuracy > 0.95, "accuracy {}", stats.accuracy);
}

#[test]
fn normalized_targets_span_unit_range() {
    let cfg = config(1, 0.0);
    let pairs = sample_pairs(&cfg, 32, &mut RngHandle::from_seed(9)).unwrap();
    let [first, second] = pairs.normalized_targets(&cfg);
    assert_eq!(first.shape(), (32, 4));
    assert!(first.iter().chain(second.iter()).all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn invalid_settings_are_config_errors() {
    let mut rng = RngHandle::from_seed(0);
    let cases = [
        (
            PairSamplerConfig {
                factor_sizes: vec![],
                ..PairSamplerConfig::default()
            },
            "no-factors",
        ),
        (config(5, 0.0), "k-too-large"),
        (
            PairSamplerConfig {
                factor_sizes: vec![3, 1],
                ..PairSamplerConfig::default()
            },
            "factor-size",
        ),
        (config(1, -0.5), "noise-std"),
        (
            PairSamplerConfig {
                spacing: f64::NAN,
                ..PairSamplerConfig::default()
            },
            "non-finite",
        ),
    ];
    for (cfg, code) in cases {
        match sample_pairs(&cfg, 4, &mut rng) {
            Err(DisentError::Config(info)) => assert_eq!(info.code, code),
            other => panic!("expected {code}, got {other:?}"),
        }
    }
    let err = sample_pairs(&config(1, 0.0), 0, &mut rng).unwrap_err();
    assert_eq!(err.info().code, "empty-batch");
}

#[test]
fn recovery_stats_counts() {
    let estimated = DMatrix::from_row_slice(2, 3, &[true, true, false, true, false, false]);
    let changed = DMatrix::from_row_slice(2, 3, &[false, false, true, false, false, true]);
    let stats = recovery_stats(&estimated, &changed).unwrap();
    // second row misses the unchanged middle dimension
    assert!((stats.accuracy - 5.0 / 6.0).abs() < 1e-12);
    assert_eq!(stats.unchanged_precision, Some(1.0));
    assert_eq!(stats.unchanged_recall, Some(0.75));
    assert_eq!(stats.exact_pairs, 1);
    assert_eq!(stats.pairs, 2);

    let err = recovery_stats(&estimated, &DMatrix::from_element(3, 2, false)).unwrap_err();
    assert!(matches!(err, DisentError::Contract(ref info) if info.code == "recovery-shape"));
}
