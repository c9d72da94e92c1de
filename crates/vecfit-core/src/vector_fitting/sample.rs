//! Frequency-domain samples

use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// One frequency point: complex frequency `s` and the response of every channel
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub s: Complex64,
    pub values: Vec<Complex64>,
}

impl Sample {
    pub fn new(s: Complex64, values: Vec<Complex64>) -> Self {
        Self { s, values }
    }

    /// Number of response channels carried by this sample
    #[inline]
    pub fn n_channels(&self) -> usize {
        self.values.len()
    }
}

impl From<(Complex64, Vec<Complex64>)> for Sample {
    fn from((s, values): (Complex64, Vec<Complex64>)) -> Self {
        Self { s, values }
    }
}

/// Split samples into the frequency vector and a `[n_channels, n_samples]`
/// response matrix.
///
/// The channel count is taken from the first sample; shorter samples leave
/// zeros and longer ones are truncated.
pub(crate) fn stack_samples(samples: &[Sample]) -> (Array1<Complex64>, Array2<Complex64>) {
    let n_channels = samples.first().map_or(0, Sample::n_channels);
    let s = samples.iter().map(|x| x.s).collect::<Array1<_>>();

    let mut responses = Array2::<Complex64>::zeros((n_channels, samples.len()));
    for (k, sample) in samples.iter().enumerate() {
        for (n, &v) in sample.values.iter().take(n_channels).enumerate() {
            responses[[n, k]] = v;
        }
    }

    (s, responses)
}
