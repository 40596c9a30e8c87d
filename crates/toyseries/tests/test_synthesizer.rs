//! Tests for generating toy clustering problems.

use core::f64::consts::{FRAC_PI_2, PI, TAU};

use float_cmp::approx_eq;
use ndarray::{s, Array2, ArrayView2};
use rand::{rngs::StdRng, SeedableRng};
use test_case::test_case;
use toyseries::{
    grid,
    shapes::{Identity, Linear, Sine},
    Params, Precedence, ShapeFn, SynthError, ToySeries,
};

/// Tags every series with the cluster's `c` argument.
fn tagged(x: ArrayView2<f64>, params: &Params) -> Result<Array2<f64>, String> {
    let c = params.f64_or("c", -1.0)?;
    Ok(x.mapv(|t| c.mul_add(1_000.0, t)))
}

/// Drops the last series of the block.
fn short(x: ArrayView2<f64>, _: &Params) -> Result<Array2<f64>, String> {
    Ok(x.slice(s![1.., ..]).to_owned())
}

/// Always fails.
fn broken(_: ArrayView2<f64>, _: &Params) -> Result<Array2<f64>, String> {
    Err("model exploded".to_string())
}

/// The noiseless values every cluster should produce with `shape`.
fn noiseless<S: ShapeFn>(toy: &ToySeries, shape: &S, time: &[f64]) -> Array2<f64> {
    let quiet = ToySeries {
        r_ampl: None,
        r_off: None,
        ..toy.clone()
    };
    quiet.generate(shape, time).unwrap()
}

#[test_case(1, 1, 1)]
#[test_case(1, 3, 10)]
#[test_case(10, 3, 100)]
#[test_case(7, 5, 33)]
fn output_shape(n_series_for_cluster: usize, n_cluster: usize, t: usize) {
    let time = grid::linspace(0.0, TAU, t).unwrap();
    let toy = ToySeries::new(n_series_for_cluster, n_cluster)
        .with_ampl(0.3)
        .with_offset(1.0)
        .with_random_state(17);

    let series = toy.generate(&Sine, &time).unwrap();
    assert_eq!(series.dim(), (n_series_for_cluster * n_cluster, t));

    assert_eq!(series, toy.generate(&Sine, &time).unwrap());

    let series = toy.par_generate(&Sine, &time).unwrap();
    assert_eq!(series.dim(), (n_series_for_cluster * n_cluster, t));
    assert_eq!(series, toy.par_generate(&Sine, &time).unwrap());
}

#[test]
fn identity_without_noise() {
    let time = [0.0, FRAC_PI_2, PI];
    let toy = ToySeries::new(1, 2);

    let series = toy.generate(&Identity, &time).unwrap();
    assert_eq!(series, ndarray::array![[0.0, FRAC_PI_2, PI], [0.0, FRAC_PI_2, PI]]);
}

#[test]
fn blocks_use_their_own_arguments() {
    let time = grid::linspace(0.0, 1.0, 8).unwrap();
    let iterargs = (0..4).map(|c| Params::new().with("c", c)).collect();
    let toy = ToySeries::new(5, 4).with_iterargs(iterargs).with_ampl(0.5).with_random_state(23);

    let labeled = toy.generate_labeled(&tagged, &time).unwrap();
    for (row, &label) in labeled.data.rows().into_iter().zip(labeled.labels.iter()) {
        #[allow(clippy::cast_precision_loss)]
        let tag = label as f64 * 1_000.0;
        for (&v, &t) in row.iter().zip(time.iter()) {
            let deviation = v - t - tag;
            assert!((0.0..0.5).contains(&deviation), "row of cluster {label} has deviation {deviation}");
        }
    }
    assert_eq!(labeled.labels, toy.labels().unwrap());
}

#[test]
fn noiseless_equals_shape_on_grid() {
    let time = grid::linspace(-1.0, 1.0, 16).unwrap();
    let toy = ToySeries::new(3, 2)
        .with_kwarg("slope", 2.5)
        .with_iterargs(vec![Params::new().with("intercept", 1.0), Params::new().with("intercept", -1.0)]);

    let series = toy.generate(&Linear, &time).unwrap();
    let grid = grid::replicate(&time, 6).unwrap();
    for i in 0..2 {
        let block = grid.slice(s![i * 3..(i + 1) * 3, ..]);
        let expected = Linear.eval(block, &toy.cluster_params(i).unwrap()).unwrap();
        assert_eq!(series.slice(s![i * 3..(i + 1) * 3, ..]), expected);
    }
}

#[test_case(0.1 ; "small offsets")]
#[test_case(2.0 ; "large offsets")]
fn offsets_shift_whole_series(r_off: f64) {
    let time = grid::linspace(0.0, TAU, 50).unwrap();
    let toy = ToySeries::new(20, 3).with_kwarg("ampl", 3.0).with_offset(r_off).with_random_state(11);

    let series = toy.generate(&Sine, &time).unwrap();
    let base = noiseless(&toy, &Sine, &time);
    for (row, base_row) in series.rows().into_iter().zip(base.rows()) {
        let shift = row[0] - base_row[0];
        assert!(shift >= -r_off && shift < r_off, "shift {shift} outside [-{r_off}, {r_off})");
        for (&v, &b) in row.iter().zip(base_row.iter()) {
            assert!(approx_eq!(f64, v - b, shift, epsilon = 1e-12));
        }
    }
}

#[test_case(0.05 ; "small amplitude")]
#[test_case(4.0 ; "large amplitude")]
fn amplitudes_stay_in_bounds(r_ampl: f64) {
    let time = grid::linspace(0.0, 10.0, 40).unwrap();
    let toy = ToySeries::new(10, 3).with_ampl(r_ampl).with_random_state(3);

    let series = toy.generate(&Identity, &time).unwrap();
    let base = noiseless(&toy, &Identity, &time);
    let deviations = &series - &base;
    assert!(deviations.iter().all(|&d| d >= 0.0 && d < r_ampl));
    // Noise is per sample, so not every sample in a series gets the same value.
    assert!(deviations.rows().into_iter().any(|r| r.iter().any(|&d| d != r[0])));
}

#[test]
fn seeded_calls_are_reproducible() {
    let time = grid::linspace(0.0, TAU, 30).unwrap();
    let toy = ToySeries::new(4, 3)
        .with_ampl(0.2)
        .with_offset(0.7)
        .with_random_state(42)
        .with_iterargs(vec![
            Params::new().with("phi", 2.0),
            Params::new().with("phi", 3.0),
            Params::new().with("phi", 4.0),
        ]);

    let first = toy.generate(&Sine, &time).unwrap();
    let second = toy.generate(&Sine, &time).unwrap();
    assert_eq!(first, second);

    let par_first = toy.par_generate(&Sine, &time).unwrap();
    let par_second = toy.par_generate(&Sine, &time).unwrap();
    assert_eq!(par_first, par_second);

    let other = toy.clone().with_random_state(43).generate(&Sine, &time).unwrap();
    assert_ne!(first, other);
}

#[test]
fn seed_resets_a_shared_generator() {
    let time = grid::linspace(0.0, 1.0, 5).unwrap();
    let seeded = ToySeries::new(2, 2).with_ampl(1.0).with_random_state(5);
    let unseeded = ToySeries::new(2, 2).with_ampl(1.0);

    let mut rng = StdRng::seed_from_u64(999);
    let a = seeded.generate_with_rng(&Identity, &time, &mut rng).unwrap();
    let a_next = unseeded.generate_with_rng(&Identity, &time, &mut rng).unwrap();

    let mut other = StdRng::seed_from_u64(0);
    let b = seeded.generate_with_rng(&Identity, &time, &mut other).unwrap();
    let b_next = unseeded.generate_with_rng(&Identity, &time, &mut other).unwrap();

    assert_eq!(a, b);
    assert_eq!(a_next, b_next);
    assert_eq!(a, seeded.generate(&Identity, &time).unwrap());
}

#[test]
fn zero_bound_is_not_unset() {
    let time = grid::linspace(0.0, 1.0, 5).unwrap();
    let follow_up = ToySeries::new(2, 2).with_ampl(1.0);

    // Same values, but a zero bound consumes draws that an unset bound does not.
    let zero = ToySeries::new(2, 2).with_offset(0.0).with_random_state(1);
    let unset = ToySeries::new(2, 2).with_random_state(1);

    let mut rng = StdRng::seed_from_u64(0);
    let zero_series = zero.generate_with_rng(&Identity, &time, &mut rng).unwrap();
    let after_zero = follow_up.generate_with_rng(&Identity, &time, &mut rng).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let unset_series = unset.generate_with_rng(&Identity, &time, &mut rng).unwrap();
    let after_unset = follow_up.generate_with_rng(&Identity, &time, &mut rng).unwrap();

    assert_eq!(zero_series, unset_series);
    assert_ne!(after_zero, after_unset);
}

#[test]
fn iterargs_length_must_match() {
    let time = [0.0, 1.0];
    let toy = ToySeries::new(2, 3).with_iterargs(vec![Params::new(), Params::new()]);

    assert!(matches!(toy.generate(&Identity, &time), Err(SynthError::InvalidArgument(_))));
    assert!(matches!(toy.par_generate(&Identity, &time), Err(SynthError::InvalidArgument(_))));
}

#[test_case(ToySeries::new(0, 3), &[0.0, 1.0] ; "no series")]
#[test_case(ToySeries::new(3, 0), &[0.0, 1.0] ; "no clusters")]
#[test_case(ToySeries::new(3, 3), &[] ; "empty time axis")]
#[test_case(ToySeries::new(3, 3).with_offset(-1.0), &[0.0] ; "negative offset")]
fn invalid_arguments(toy: ToySeries, time: &[f64]) {
    assert!(matches!(toy.generate(&Identity, time), Err(SynthError::InvalidArgument(_))));
}

#[test]
fn strict_precedence_rejects_collisions() {
    let toy = ToySeries::new(1, 2)
        .with_precedence(Precedence::Strict)
        .with_kwarg("phi", 0.0)
        .with_iterargs(vec![Params::new().with("q", 1.0), Params::new().with("phi", 1.0)]);

    match toy.generate(&Sine, &[0.0, 1.0]) {
        Err(SynthError::InvalidArgument(msg)) => assert!(msg.contains("phi") && msg.contains("cluster 1")),
        other => panic!("expected a collision error, got {other:?}"),
    }
}

#[test]
fn shape_mismatch_is_reported() {
    let toy = ToySeries::new(3, 2);
    let err = toy.generate(&short, &[0.0, 1.0, 2.0]).unwrap_err();
    assert_eq!(
        err,
        SynthError::ShapeMismatch {
            cluster: 0,
            expected: (3, 3),
            actual: (2, 3),
        }
    );
}

#[test]
fn callback_failures_propagate() {
    let toy = ToySeries::new(3, 2).with_ampl(1.0);

    let err = toy.generate(&broken, &[0.0, 1.0]).unwrap_err();
    assert_eq!(
        err,
        SynthError::CallbackFailure {
            cluster: 0,
            message: "model exploded".to_string(),
        }
    );
    assert!(matches!(
        toy.par_generate(&broken, &[0.0, 1.0]),
        Err(SynthError::CallbackFailure { .. })
    ));

    // A non-numeric argument is a failure of the built-in shape, not of the synthesizer.
    let toy = toy.with_kwarg("phi", "late");
    assert!(matches!(
        toy.generate(&Sine, &[0.0, 1.0]),
        Err(SynthError::CallbackFailure { cluster: 0, .. })
    ));
}

#[test]
fn configuration_from_json() {
    let toy: ToySeries = serde_json::from_str(
        r#"{
            "n_cluster": 2,
            "r_off": 0.5,
            "random_state": 7,
            "kwargs": {"q": 1, "label": "sine"},
            "iterargs": [{"phi": 0.5}, {"phi": 1.5}],
            "precedence": "cluster"
        }"#,
    )
    .unwrap();

    assert_eq!(toy.n_series_for_cluster, 10);
    assert_eq!(toy.n_cluster, 2);
    assert_eq!(toy.r_ampl, None);
    assert_eq!(toy.r_off, Some(0.5));
    assert_eq!(toy.precedence, Precedence::Cluster);
    assert_eq!(toy.cluster_params(1).unwrap().f64_or("phi", 0.0), Ok(1.5));
    assert_eq!(toy.kwargs.f64_or("q", 0.0), Ok(1.0));

    let series = toy.generate(&Sine, &grid::linspace(0.0, 1.0, 4).unwrap()).unwrap();
    assert_eq!(series.dim(), (20, 4));
}
