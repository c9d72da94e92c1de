//! Vector Fitting Tests
//!
//! End-to-end tests of the fitting engine on synthetic responses built from
//! known pole-residue models.
//!
//! Test coverage:
//! - Recovery of known models (explicit and default starting poles)
//! - Multi-channel fitting with shared poles and a linear trend
//! - Canonical pole order, conjugate pairs and stability
//! - Error metric consistency
//! - Construction and configuration failures

use approx::assert_relative_eq;
use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;
use vecfit_core::math::spacing::logspace;
use vecfit_core::vector_fitting::{
    AsymptoticTrend, ConvergenceCriteria, FitError, Options, Sample, VectorFitting,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Known pole-residue model, one entry of `residues` per channel
struct KnownModel {
    poles: Vec<Complex64>,
    residues: Vec<Vec<Complex64>>,
    offsets: Vec<f64>,
    slopes: Vec<f64>,
}

impl KnownModel {
    fn eval(&self, s: Complex64) -> Vec<Complex64> {
        self.residues
            .iter()
            .enumerate()
            .map(|(i, res)| {
                let mut h: Complex64 = res
                    .iter()
                    .zip(self.poles.iter())
                    .map(|(r, p)| r / (s - p))
                    .sum();
                h += self.offsets[i] + s * self.slopes[i];
                h
            })
            .collect()
    }

    fn sample(&self, omegas: &[f64]) -> Vec<Sample> {
        omegas
            .iter()
            .map(|&w| {
                let s = c(0.0, w);
                Sample::new(s, self.eval(s))
            })
            .collect()
    }
}

/// `(30 + 40j)/(s + 100 - 500j) + conj + 0.5`
fn resonator() -> KnownModel {
    KnownModel {
        poles: vec![c(-100.0, 500.0), c(-100.0, -500.0)],
        residues: vec![vec![c(30.0, 40.0), c(30.0, -40.0)]],
        offsets: vec![0.5],
        slopes: vec![0.0],
    }
}

fn log_omegas() -> Vec<f64> {
    logspace(1.0, 1e4, 101)
}

fn assert_canonical(poles: &[Complex64]) {
    let mut i = 0;
    let mut seen_pair = false;
    let mut last_real = 0.0f64;
    let mut last_imag = 0.0f64;
    while i < poles.len() {
        let p = poles[i];
        if p.im == 0.0 {
            assert!(!seen_pair, "real pole {} after a conjugate pair", i);
            assert!(p.re.abs() >= last_real, "real poles not ascending at {}", i);
            last_real = p.re.abs();
            i += 1;
        } else {
            seen_pair = true;
            let q = poles[i + 1];
            assert!(p.im < 0.0, "pair at {} must lead with negative imaginary part", i);
            assert_eq!(q, p.conj(), "pole {} is not the conjugate of {}", i + 1, i);
            assert!(p.im.abs() >= last_imag, "pairs not ascending at {}", i);
            last_imag = p.im.abs();
            i += 2;
        }
    }
}

// ============================================================================
// Recovery of known models
// ============================================================================

/// Gustavsen's first test case: real pole, resonant pair and offset,
/// starting from three real poles
#[test]
fn test_recovers_model_from_real_starting_poles() -> anyhow::Result<()> {
    let mut truth = resonator();
    truth.poles.insert(0, c(-5.0, 0.0));
    truth.residues[0].insert(0, c(2.0, 0.0));

    let omegas: Vec<f64> = logspace(1.0, 1e4, 101)
        .iter()
        .map(|f| 2.0 * PI * f)
        .collect();
    let samples = truth.sample(&omegas);

    let start: Vec<Complex64> = logspace(1.0, 1e4, 3)
        .iter()
        .map(|f| c(-2.0 * PI * f, 0.0))
        .collect();

    let mut vf = VectorFitting::new(samples, start, Options::default(), None)?;
    for _ in 0..3 {
        vf.fit()?;
    }

    assert!(vf.rmse() < 1e-3, "RMSE too large: {}", vf.rmse());

    let poles = vf.poles();
    assert_eq!(poles.len(), 3);
    assert_relative_eq!(poles[0].re, -5.0, max_relative = 1e-6);
    assert_relative_eq!(poles[1].re, -100.0, max_relative = 1e-6);
    assert_relative_eq!(poles[1].im, -500.0, max_relative = 1e-6);
    assert_relative_eq!(vf.offsets()[0], 0.5, max_relative = 1e-6);
    Ok(())
}

/// Resonant pair plus offset, order 2 default starting poles
#[test]
fn test_recovers_model_from_default_poles() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());

    let mut vf = VectorFitting::with_order(samples, 2, Options::default(), None)?;
    let report = vf.fit_until_converged(&ConvergenceCriteria {
        max_iterations: 20,
        tolerance: 1e-9,
    })?;

    assert!(report.converged);
    assert!(vf.rmse() < 1e-3, "RMSE too large: {}", vf.rmse());
    assert_relative_eq!(vf.poles()[0].re, -100.0, max_relative = 1e-6);
    assert_relative_eq!(vf.poles()[0].im, -500.0, max_relative = 1e-6);
    assert_relative_eq!(vf.residues()[[0, 0]].re, 30.0, max_relative = 1e-6);
    assert_relative_eq!(vf.residues()[[0, 0]].im, -40.0, max_relative = 1e-6);
    Ok(())
}

/// Three starting poles for a response of true order two
#[test]
fn test_overestimated_order() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());
    let start = vec![c(-1.0, 0.0), c(-100.0, 0.0), c(-1e4, 0.0)];

    let mut vf = VectorFitting::new(samples, start, Options::default(), None)?;
    for _ in 0..5 {
        vf.fit()?;
    }

    assert_eq!(vf.order(), 3);
    assert!(vf.rmse() < 1e-3, "RMSE too large: {}", vf.rmse());
    Ok(())
}

#[test]
fn test_strictly_proper_model() -> anyhow::Result<()> {
    let truth = KnownModel {
        poles: vec![c(-20.0, 0.0), c(-100.0, 500.0), c(-100.0, -500.0)],
        residues: vec![vec![c(40.0, 0.0), c(30.0, 40.0), c(30.0, -40.0)]],
        offsets: vec![0.0],
        slopes: vec![0.0],
    };
    let samples = truth.sample(&log_omegas());

    let opts = Options {
        asymptotic_trend: AsymptoticTrend::Zero,
        ..Options::default()
    };
    let start = vec![c(-1.0, 0.0), c(-10.0, -1000.0), c(-10.0, 1000.0)];
    let mut vf = VectorFitting::new(samples, start, opts, None)?;
    for _ in 0..3 {
        vf.fit()?;
    }

    assert!(vf.rmse() < 1e-6, "RMSE too large: {}", vf.rmse());
    assert_relative_eq!(vf.poles()[0].re, -20.0, max_relative = 1e-6);
    assert_relative_eq!(vf.poles()[1].re, -100.0, max_relative = 1e-6);
    assert_relative_eq!(vf.poles()[1].im, -500.0, max_relative = 1e-6);
    assert_relative_eq!(vf.residues()[[0, 0]].re, 40.0, max_relative = 1e-6);
    assert_eq!(vf.offsets()[0], 0.0);
    assert_eq!(vf.slopes()[0], 0.0);
    Ok(())
}

#[test]
fn test_multichannel_linear_trend() -> anyhow::Result<()> {
    let truth = KnownModel {
        poles: vec![c(-50.0, 0.0), c(-20.0, -800.0), c(-20.0, 800.0)],
        residues: vec![
            vec![c(0.0, 0.0), c(10.0, -60.0), c(10.0, 60.0)],
            vec![c(20.0, 0.0), c(-4.0, 15.0), c(-4.0, -15.0)],
        ],
        offsets: vec![0.5, -0.2],
        slopes: vec![1e-4, 0.0],
    };
    let samples = truth.sample(&log_omegas());

    let opts = Options {
        asymptotic_trend: AsymptoticTrend::Linear,
        ..Options::default()
    };
    let start = vec![c(-10.0, 0.0), c(-30.0, -3000.0), c(-30.0, 3000.0)];
    let mut vf = VectorFitting::new(samples, start, opts, None)?;
    vf.fit_until_converged(&ConvergenceCriteria::default())?;

    assert_eq!(vf.n_channels(), 2);
    assert!(vf.rmse() < 1e-3, "RMSE too large: {}", vf.rmse());
    assert_relative_eq!(vf.poles()[0].re, -50.0, max_relative = 1e-6);
    assert_relative_eq!(vf.offsets()[1], -0.2, epsilon = 1e-6);
    assert_relative_eq!(vf.slopes()[0], 1e-4, max_relative = 1e-4);
    Ok(())
}

#[test]
fn test_weighted_fit_of_exact_data() -> anyhow::Result<()> {
    let omegas = log_omegas();
    let samples = resonator().sample(&omegas);
    let weights = Array2::from_shape_fn((omegas.len(), 1), |(k, _)| 1.0 / (1.0 + k as f64));

    let mut vf = VectorFitting::with_order(samples, 2, Options::default(), Some(weights))?;
    for _ in 0..5 {
        vf.fit()?;
    }

    assert!(vf.rmse() < 1e-3, "RMSE too large: {}", vf.rmse());
    Ok(())
}

#[test]
fn test_unordered_samples_give_same_start() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());
    let mut reversed = samples.clone();
    reversed.reverse();

    let a = VectorFitting::with_order(samples, 4, Options::default(), None)?;
    let b = VectorFitting::with_order(reversed, 4, Options::default(), None)?;
    assert_eq!(a.poles(), b.poles());
    assert_relative_eq!(a.poles()[0].im, 1.0, max_relative = 1e-12);
    assert_relative_eq!(a.poles()[2].im, 1e4, max_relative = 1e-12);
    Ok(())
}

// ============================================================================
// Pole properties
// ============================================================================

#[test]
fn test_canonical_order_after_fit() -> anyhow::Result<()> {
    let mut truth = resonator();
    truth.poles.extend([c(-3000.0, 0.0), c(-40.0, 0.0)]);
    truth.residues[0].extend([c(500.0, 0.0), c(7.0, 0.0)]);
    let samples = truth.sample(&log_omegas());

    let start = vec![
        c(-1.0, 0.0),
        c(-5.0, -100.0),
        c(-5.0, 100.0),
        c(-1e4, 0.0),
    ];
    let mut vf = VectorFitting::new(samples, start, Options::default(), None)?;
    for _ in 0..5 {
        vf.fit()?;
    }

    assert_canonical(vf.poles().as_slice().unwrap());
    Ok(())
}

#[test]
fn test_unstable_pole_kept_when_not_enforcing_stability() -> anyhow::Result<()> {
    let truth = KnownModel {
        poles: vec![c(200.0, 0.0), c(-10.0, -300.0), c(-10.0, 300.0)],
        residues: vec![vec![c(100.0, 0.0), c(5.0, 1.0), c(5.0, -1.0)]],
        offsets: vec![0.0],
        slopes: vec![0.0],
    };
    let samples = truth.sample(&log_omegas());

    let opts = Options {
        stable: false,
        ..Options::default()
    };
    let start = vec![c(-50.0, 0.0), c(-5.0, -100.0), c(-5.0, 100.0)];
    let mut vf = VectorFitting::new(samples, start, opts, None)?;
    for _ in 0..3 {
        vf.fit()?;
    }

    assert!(vf.rmse() < 1e-6, "RMSE too large: {}", vf.rmse());
    assert_eq!(vf.poles()[0].im, 0.0);
    assert_relative_eq!(vf.poles()[0].re, 200.0, max_relative = 1e-6);
    assert_relative_eq!(vf.poles()[1].re, -10.0, max_relative = 1e-6);
    Ok(())
}

#[test]
fn test_stable_poles() -> anyhow::Result<()> {
    // Response with an unstable real pole
    let truth = KnownModel {
        poles: vec![c(200.0, 0.0), c(-10.0, -300.0), c(-10.0, 300.0)],
        residues: vec![vec![c(100.0, 0.0), c(5.0, 1.0), c(5.0, -1.0)]],
        offsets: vec![0.0],
        slopes: vec![0.0],
    };
    let samples = truth.sample(&log_omegas());

    let mut vf = VectorFitting::with_order(samples, 4, Options::default(), None)?;
    for _ in 0..5 {
        vf.fit()?;
        assert!(vf.poles().iter().all(|p| p.re <= 0.0));
        assert_canonical(vf.poles().as_slice().unwrap());
    }
    Ok(())
}

#[test]
fn test_refit_is_idempotent_once_converged() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());
    let mut vf = VectorFitting::with_order(samples, 2, Options::default(), None)?;
    vf.fit_until_converged(&ConvergenceCriteria::default())?;

    let before = vf.poles().clone();
    vf.fit()?;
    for (a, b) in before.iter().zip(vf.poles().iter()) {
        assert!((a - b).norm() <= 1e-6 * a.norm());
    }
    Ok(())
}

// ============================================================================
// Error metrics
// ============================================================================

#[test]
fn test_error_metrics_consistency() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());
    let mut vf = VectorFitting::with_order(samples.clone(), 2, Options::default(), None)?;
    // A single pass from poor starting poles leaves a visible error
    vf.set_options(Options {
        skip_pole_identification: true,
        ..Options::default()
    });
    vf.fit()?;

    let fitted = vf.fitted_samples();
    assert_eq!(fitted.len(), samples.len());

    let max_dev = vf.max_deviation();
    for (a, m) in samples.iter().zip(fitted.iter()) {
        assert_eq!(a.s, m.s);
        for (x, y) in a.values.iter().zip(m.values.iter()) {
            assert!((x - y).norm() <= max_dev);
        }
    }
    assert!(vf.rmse() > 0.0);
    assert!(max_dev >= vf.rmse());
    Ok(())
}

#[test]
fn test_rmse_zero_for_exact_reproduction() -> anyhow::Result<()> {
    let samples: Vec<Sample> = log_omegas()
        .iter()
        .map(|&w| Sample::new(c(0.0, w), vec![c(0.0, 0.0)]))
        .collect();
    let opts = Options {
        skip_residue_identification: true,
        ..Options::default()
    };

    let mut vf = VectorFitting::new(samples.clone(), vec![c(-1.0, 0.0)], opts, None)?;
    vf.set_options(Options {
        skip_pole_identification: true,
        ..opts
    });
    vf.fit()?;

    assert_eq!(vf.fitted_samples(), samples);
    assert_eq!(vf.rmse(), 0.0);
    assert_eq!(vf.max_deviation(), 0.0);
    Ok(())
}

#[test]
fn test_evaluate_at_matches_known_model() -> anyhow::Result<()> {
    let truth = resonator();
    let samples = truth.sample(&log_omegas());
    let mut vf = VectorFitting::with_order(samples, 2, Options::default(), None)?;
    vf.fit_until_converged(&ConvergenceCriteria::default())?;

    let probe = [c(0.0, 2.5e4), c(-3.0, 42.0)];
    for sample in vf.evaluate_at(&probe) {
        let expected = truth.eval(sample.s)[0];
        assert!((sample.values[0] - expected).norm() < 1e-6 * expected.norm().max(1.0));
    }
    Ok(())
}

// ============================================================================
// Failure scenarios
// ============================================================================

#[test]
fn test_empty_samples_rejected() {
    let err = VectorFitting::with_order(vec![], 2, Options::default(), None).unwrap_err();
    assert_eq!(err, FitError::EmptySamples);
}

#[test]
fn test_odd_order_rejected() {
    let samples = resonator().sample(&log_omegas());
    let err = VectorFitting::with_order(samples, 3, Options::default(), None).unwrap_err();
    assert_eq!(err, FitError::OddOrder(3));
}

#[test]
fn test_unpaired_pole_rejected() {
    let samples = resonator().sample(&log_omegas());
    let poles = vec![c(-1.0, 10.0), c(-2.0, -10.0)];
    let err = VectorFitting::new(samples, poles, Options::default(), None).unwrap_err();
    assert!(matches!(err, FitError::UnpairedPole { index: 0, .. }));
}

#[test]
fn test_wrong_weight_shape_rejected() {
    let samples = resonator().sample(&log_omegas());
    let weights = Array2::ones((100, 1));
    let err =
        VectorFitting::with_order(samples, 2, Options::default(), Some(weights)).unwrap_err();
    assert!(matches!(err, FitError::WeightShape { .. }));
}

#[test]
fn test_non_relaxed_fit_unsupported() -> anyhow::Result<()> {
    let samples = resonator().sample(&log_omegas());
    let opts = Options {
        relax: false,
        ..Options::default()
    };
    let mut vf = VectorFitting::with_order(samples, 2, opts, None)?;

    let err = vf.fit().unwrap_err();
    assert!(matches!(err, FitError::Unsupported(_)));
    assert!(err.to_string().starts_with("Not implemented"));
    Ok(())
}

#[test]
fn test_sigma_out_of_tolerance_unsupported() -> anyhow::Result<()> {
    // Two samples leave no rows of R for the sigma unknowns, so sigma collapses to zero
    let samples = resonator().sample(&[1.0, 10.0]);
    let mut vf = VectorFitting::with_order(samples, 4, Options::default(), None)?;

    let err = vf.fit().unwrap_err();
    assert!(matches!(err, FitError::Unsupported(_)));
    assert!(err.to_string().contains("relaxed sigma"));
    assert!(!vf.is_fitted());
    Ok(())
}

#[test]
fn test_dc_sample_with_default_poles_fails() -> anyhow::Result<()> {
    // Default poles start at w = 0 and land on the DC sample
    let mut omegas = vec![0.0];
    omegas.extend(logspace(1.0, 1e4, 50));
    let samples = resonator().sample(&omegas);

    let mut vf = VectorFitting::with_order(samples.clone(), 4, Options::default(), None)?;
    assert_eq!(vf.poles()[0], c(0.0, 0.0));
    assert!(matches!(vf.fit(), Err(FitError::Linalg(_))));
    assert!(!vf.is_fitted());

    // Poles off the origin fit the same data
    let start = vec![c(-5.0, -300.0), c(-5.0, 300.0)];
    let mut vf = VectorFitting::new(samples, start, Options::default(), None)?;
    for _ in 0..3 {
        vf.fit()?;
    }
    assert!(vf.rmse() < 1e-6, "RMSE too large: {}", vf.rmse());
    Ok(())
}
