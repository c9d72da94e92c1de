//! Point distributions over a closed interval

/// Distribution used to place values over a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencySpacing {
    #[default]
    Linear,
    Logarithmic,
}

impl FrequencySpacing {
    /// Produce `n` values over `[start, end]` with this distribution
    pub fn generate(self, start: f64, end: f64, n: usize) -> Vec<f64> {
        match self {
            FrequencySpacing::Linear => linspace(start, end, n),
            FrequencySpacing::Logarithmic => logspace(start, end, n),
        }
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive
///
/// A single point lands on the midpoint of the interval.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![];
    }
    if n == 1 {
        return vec![(start + end) / 2.0];
    }
    (0..n)
        .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
        .collect()
}

/// `n` logarithmically spaced values from `start` to `end` inclusive
///
/// Falls back to [`linspace`] when either bound is not strictly positive.
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 0 || start <= 0.0 || end <= 0.0 {
        return linspace(start, end, n);
    }
    linspace(start.ln(), end.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect()
}
