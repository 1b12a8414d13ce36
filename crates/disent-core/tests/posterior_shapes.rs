use disent_core::{matrix_from_rows, DisentError, GaussianPosterior};
use nalgebra::DMatrix;

#[test]
fn mismatched_mean_and_logvar_are_rejected() {
    let err = GaussianPosterior::new(DMatrix::zeros(2, 3), DMatrix::zeros(2, 4)).unwrap_err();
    match err {
        DisentError::Contract(info) => assert_eq!(info.code, "posterior-shape-mismatch"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn ragged_rows_are_rejected() {
    let err = matrix_from_rows(&[vec![0.0, 1.0], vec![2.0]]).unwrap_err();
    assert_eq!(err.info().code, "ragged-rows");
    assert_eq!(err.info().context["row"], "1");
}

#[test]
fn rows_are_read_in_row_major_order() {
    let logvar = vec![vec![0.0, 0.0]; 2];
    let posterior = GaussianPosterior::from_rows(&[vec![0.0, 5.0], vec![1.0, 2.0]], &logvar)
        .expect("posterior");
    assert_eq!(posterior.shape(), (2, 2));
    assert_eq!(posterior.mean()[(0, 1)], 5.0);
    assert_eq!(posterior.mean()[(1, 0)], 1.0);
    assert!(posterior.variance().iter().all(|v| (*v - 1.0).abs() < 1e-12));
}

#[test]
fn pair_shape_check_reports_both_shapes() {
    let a = GaussianPosterior::standard_normal(2, 3);
    let b = GaussianPosterior::standard_normal(3, 3);
    let err = a.ensure_same_shape(&b).unwrap_err();
    assert_eq!(err.info().context["first"], "[2, 3]");
    assert_eq!(err.info().context["second"], "[3, 3]");
}

#[test]
fn posterior_json_uses_nested_rows() {
    let posterior =
        GaussianPosterior::from_rows(&[vec![0.5, -1.0]], &[vec![0.0, -2.0]]).expect("posterior");
    let json = serde_json::to_value(&posterior).expect("serialize");
    assert_eq!(json["mean"][0][1], -1.0);
    let decoded: GaussianPosterior = serde_json::from_value(json).expect("deserialize");
    assert_eq!(decoded, posterior);

    let bad = serde_json::json!({"mean": [[0.0, 1.0]], "logvar": [[0.0]]});
    assert!(serde_json::from_value::<GaussianPosterior>(bad).is_err());
}

#[test]
fn non_finite_entries_are_written_as_strings() {
    let posterior = GaussianPosterior::from_rows(
        &[vec![f64::INFINITY, f64::NEG_INFINITY, f64::NAN]],
        &[vec![0.0, -800.0, 1.5]],
    )
    .expect("posterior");
    let json = serde_json::to_value(&posterior).expect("serialize");
    assert_eq!(json["mean"][0], serde_json::json!(["inf", "-inf", "nan"]));
    assert_eq!(json["logvar"][0][1], -800.0);

    let decoded: GaussianPosterior = serde_json::from_value(json).expect("deserialize");
    assert_eq!(decoded.mean()[(0, 0)], f64::INFINITY);
    assert_eq!(decoded.mean()[(0, 1)], f64::NEG_INFINITY);
    assert!(decoded.mean()[(0, 2)].is_nan());
    assert_eq!(decoded.logvar(), posterior.logvar());

    let bad = serde_json::json!({"mean": [["big"]], "logvar": [[0.0]]});
    assert!(serde_json::from_value::<GaussianPosterior>(bad).is_err());
}
