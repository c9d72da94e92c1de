//! Core VectorFitting struct and main fitting routine

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::algorithms::{self, PoleRelocationResult, ResidueFit};
use super::error::{FitError, Result};
use super::model::{self, StateSpaceModel};
use super::options::{ConvergenceCriteria, Options};
use super::poles;
use super::sample::{stack_samples, Sample};
use crate::math::spacing::FrequencySpacing;

/// Outcome of [`VectorFitting::fit_until_converged`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceReport {
    /// Number of `fit` calls performed
    pub iterations: usize,
    /// Whether the pole movement dropped below the tolerance
    pub converged: bool,
    /// Largest relative pole movement of the last iteration
    pub last_change: f64,
}

/// Vector fitting engine
///
/// Holds the samples, weights and options fixed at construction together
/// with the current model. Each call to [`VectorFitting::fit`] starts from the
/// current poles and overwrites the model, so repeated calls iterate the
/// pole relocation.
#[derive(Debug, Clone)]
pub struct VectorFitting {
    samples: Vec<Sample>,
    /// Sample frequencies
    s: Array1<Complex64>,
    /// Responses [n_channels, n_samples]
    responses: Array2<Complex64>,
    /// Weights [n_samples, n_channels]
    weights: Array2<f64>,
    options: Options,
    model: StateSpaceModel,
    fitted: bool,
}

impl VectorFitting {
    /// Create an engine from explicit starting poles
    ///
    /// # Arguments
    /// * `samples` - Sampled responses; the channel count is taken from the first one
    /// * `poles` - Starting poles, each real or followed by its conjugate
    /// * `options` - Fitting options
    /// * `weights` - Optional weights `[n_samples, n_channels]`, all ones when `None`
    pub fn new(
        samples: Vec<Sample>,
        poles: Vec<Complex64>,
        options: Options,
        weights: Option<Array2<f64>>,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(FitError::EmptySamples);
        }
        poles::validate_pairs(&poles)?;

        let (s, responses) = stack_samples(&samples);
        let n_channels = responses.nrows();
        let expected = (samples.len(), n_channels);

        let weights = match weights {
            Some(w) if w.dim() != expected => {
                return Err(FitError::WeightShape {
                    expected,
                    actual: w.dim(),
                })
            }
            Some(w) => w,
            None => Array2::ones(expected),
        };

        let trend = options.asymptotic_trend;
        let model = StateSpaceModel::unfitted(Array1::from_vec(poles), n_channels, trend);

        Ok(Self {
            samples,
            s,
            responses,
            weights,
            options,
            model,
            fitted: false,
        })
    }

    /// Create an engine with `order` default starting poles, linearly spaced
    ///
    /// `order` must be even: the starting poles are complex conjugate pairs.
    pub fn with_order(
        samples: Vec<Sample>,
        order: usize,
        options: Options,
        weights: Option<Array2<f64>>,
    ) -> Result<Self> {
        Self::with_order_spaced(samples, order, FrequencySpacing::Linear, options, weights)
    }

    /// Same as [`VectorFitting::with_order`] with a choice of spacing
    pub fn with_order_spaced(
        samples: Vec<Sample>,
        order: usize,
        spacing: FrequencySpacing,
        options: Options,
        weights: Option<Array2<f64>>,
    ) -> Result<Self> {
        let s: Vec<Complex64> = samples.iter().map(|x| x.s).collect();
        let poles = poles::starting_poles(&s, order, spacing)?;
        Self::new(samples, poles.to_vec(), options, weights)
    }

    /// Run one pole identification and residue identification pass
    ///
    /// On error the model must not be queried for fitted results.
    pub fn fit(&mut self) -> Result<()> {
        self.fitted = false;

        if !self.options.complex_state_space {
            return Err(FitError::Unsupported("real-only state-space conversion"));
        }

        let trend = self.options.asymptotic_trend;
        let current = self.model.poles.to_vec();

        let poles = if self.options.skip_pole_identification {
            current
        } else {
            let PoleRelocationResult { poles, .. } = algorithms::pole_relocation(
                &current,
                self.s.view(),
                &self.responses,
                &self.weights,
                &self.options,
            )?;
            poles.to_vec()
        };

        self.model = if self.options.skip_residue_identification {
            StateSpaceModel::unfitted(Array1::from_vec(poles), self.n_channels(), trend)
        } else {
            let ResidueFit {
                residues,
                offsets,
                slopes,
            } = algorithms::fit_residues(
                &poles,
                self.s.view(),
                &self.responses,
                &self.weights,
                trend,
            )?;
            StateSpaceModel {
                coupling: Array1::ones(poles.len()),
                poles: Array1::from_vec(poles),
                residues,
                offsets,
                slopes,
                trend,
            }
        };

        self.fitted = true;
        Ok(())
    }

    /// Call [`VectorFitting::fit`] until the poles stop moving
    ///
    /// Stops once the largest relative pole movement is below
    /// `criteria.tolerance` or after `criteria.max_iterations` calls.
    pub fn fit_until_converged(
        &mut self,
        criteria: &ConvergenceCriteria,
    ) -> Result<ConvergenceReport> {
        let mut report = ConvergenceReport {
            iterations: 0,
            converged: false,
            last_change: f64::INFINITY,
        };

        while report.iterations < criteria.max_iterations {
            let previous = self.model.poles.clone();
            self.fit()?;
            report.iterations += 1;
            report.last_change = relative_movement(&previous, &self.model.poles);

            if report.last_change < criteria.tolerance {
                report.converged = true;
                break;
            }
        }

        if !report.converged {
            log::warn!(
                "vector fitting did not converge after {} iterations (pole change {:.2e})",
                report.iterations,
                report.last_change
            );
        }

        Ok(report)
    }

    /// Current poles: fitted if `fit` succeeded, the starting poles otherwise
    pub fn poles(&self) -> &Array1<Complex64> {
        &self.model.poles
    }

    /// Residues `[n_channels, n_poles]`
    pub fn residues(&self) -> &Array2<Complex64> {
        &self.model.residues
    }

    /// Constant terms per channel
    pub fn offsets(&self) -> &Array1<f64> {
        &self.model.offsets
    }

    /// Proportional terms per channel
    pub fn slopes(&self) -> &Array1<f64> {
        &self.model.slopes
    }

    pub fn coupling(&self) -> &Array1<f64> {
        &self.model.coupling
    }

    pub fn model(&self) -> &StateSpaceModel {
        &self.model
    }

    /// Number of poles
    pub fn order(&self) -> usize {
        self.model.poles.len()
    }

    pub fn n_channels(&self) -> usize {
        self.responses.nrows()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the options used by subsequent `fit` calls
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Model response at every sample frequency, aligned with the input samples
    pub fn fitted_samples(&self) -> Vec<Sample> {
        self.model.evaluate_samples(self.s.iter().copied())
    }

    /// Model response at arbitrary complex frequencies
    pub fn evaluate_at(&self, freqs: &[Complex64]) -> Vec<Sample> {
        self.model.evaluate_samples(freqs.iter().copied())
    }

    /// RMS deviation between samples and model over all samples and channels
    pub fn rmse(&self) -> f64 {
        model::rms_error(&self.samples, &self.fitted_samples())
    }

    /// Largest absolute deviation between samples and model
    pub fn max_deviation(&self) -> f64 {
        model::max_deviation(&self.samples, &self.fitted_samples())
    }
}

/// Largest pole displacement relative to the previous pole magnitude
fn relative_movement(previous: &Array1<Complex64>, current: &Array1<Complex64>) -> f64 {
    if previous.len() != current.len() {
        return f64::INFINITY;
    }
    previous
        .iter()
        .zip(current.iter())
        .map(|(p, c)| (c - p).norm() / p.norm().max(f64::MIN_POSITIVE))
        .fold(0.0, f64::max)
}
