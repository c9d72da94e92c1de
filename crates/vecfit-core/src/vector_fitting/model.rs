//! Model response evaluation
//!
//! The fitted model in pole-residue (complex state-space) form and the error
//! metrics against the sampled responses.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use super::options::AsymptoticTrend;
use super::sample::Sample;

/// Fitted rational model
///
/// For channel `i`:
/// `f_i(s) = sum_n residues[i, n] * coupling[n] / (s - poles[n]) + offsets[i] + s * slopes[i]`
/// where the offset is used for any trend other than `Zero` and the slope only
/// for `Linear`.
#[derive(Debug, Clone)]
pub struct StateSpaceModel {
    pub poles: Array1<Complex64>,
    /// Input coupling of every state; all ones for the complex form
    pub coupling: Array1<f64>,
    /// `[n_channels, n_poles]`
    pub residues: Array2<Complex64>,
    pub offsets: Array1<f64>,
    pub slopes: Array1<f64>,
    pub trend: AsymptoticTrend,
}

impl StateSpaceModel {
    /// Model with the given poles and every residue, offset and slope zeroed
    pub fn unfitted(poles: Array1<Complex64>, n_channels: usize, trend: AsymptoticTrend) -> Self {
        let n_poles = poles.len();
        Self {
            poles,
            coupling: Array1::ones(n_poles),
            residues: Array2::zeros((n_channels, n_poles)),
            offsets: Array1::zeros(n_channels),
            slopes: Array1::zeros(n_channels),
            trend,
        }
    }

    #[inline]
    pub fn n_channels(&self) -> usize {
        self.residues.nrows()
    }

    /// Evaluate every channel at one complex frequency
    pub fn evaluate(&self, s: Complex64) -> Vec<Complex64> {
        let terms: Vec<Complex64> = self
            .poles
            .iter()
            .zip(self.coupling.iter())
            .map(|(&p, &b)| b / (s - p))
            .collect();

        (0..self.n_channels())
            .map(|i| {
                let mut h: Complex64 = self
                    .residues
                    .row(i)
                    .iter()
                    .zip(terms.iter())
                    .map(|(r, t)| r * t)
                    .sum();
                if self.trend.has_offset() {
                    h += self.offsets[i];
                }
                if self.trend.has_slope() {
                    h += s * self.slopes[i];
                }
                h
            })
            .collect()
    }

    /// Evaluate the model at each frequency, one sample per frequency
    pub fn evaluate_samples(&self, freqs: impl IntoIterator<Item = Complex64>) -> Vec<Sample> {
        freqs
            .into_iter()
            .map(|s| Sample::new(s, self.evaluate(s)))
            .collect()
    }
}

/// Absolute deviation of every (sample, channel) pair
fn deviations<'a>(
    actual: &'a [Sample],
    fitted: &'a [Sample],
) -> impl Iterator<Item = impl Iterator<Item = f64> + 'a> + 'a {
    actual.iter().zip(fitted.iter()).map(|(a, m)| {
        a.values
            .iter()
            .zip(m.values.iter())
            .map(|(x, y)| (x - y).norm())
    })
}

/// Root-mean-square of `|actual - fitted|` over all samples and channels
pub fn rms_error(actual: &[Sample], fitted: &[Sample]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for row in deviations(actual, fitted) {
        for d in row {
            sum += d * d;
            count += 1;
        }
    }
    if count == 0 {
        return f64::NAN;
    }
    (sum / count as f64).sqrt()
}

/// Largest `|actual - fitted|` over all samples and channels
pub fn max_deviation(actual: &[Sample], fitted: &[Sample]) -> f64 {
    deviations(actual, fitted)
        .map(|row| row.fold(0.0, f64::max))
        .fold(0.0, f64::max)
}
