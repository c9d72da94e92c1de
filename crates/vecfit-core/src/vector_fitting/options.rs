//! Fitting options

/// Non-rational part added to the pole-residue sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsymptoticTrend {
    /// Strictly proper model: no D, no E
    Zero,
    /// Constant offset D
    #[default]
    Constant,
    /// Constant offset D plus `s * E`
    Linear,
}

impl AsymptoticTrend {
    /// Number of extra basis columns beyond the pole columns
    #[inline]
    pub fn n_terms(self) -> usize {
        match self {
            AsymptoticTrend::Zero => 0,
            AsymptoticTrend::Constant => 1,
            AsymptoticTrend::Linear => 2,
        }
    }

    #[inline]
    pub fn has_offset(self) -> bool {
        self != AsymptoticTrend::Zero
    }

    #[inline]
    pub fn has_slope(self) -> bool {
        self == AsymptoticTrend::Linear
    }
}

/// Configuration for a vector fitting run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Keep the current poles instead of relocating them
    pub skip_pole_identification: bool,
    /// Skip the residue solve; residues, offset and slope are zeroed
    pub skip_residue_identification: bool,
    /// Use the relaxed sigma normalization (the only implemented variant)
    pub relax: bool,
    /// Offset/slope terms of the model
    pub asymptotic_trend: AsymptoticTrend,
    /// Reflect relocated poles with positive real part into the left half-plane
    pub stable: bool,
    /// Keep the complex state-space form (real-only conversion is not implemented)
    pub complex_state_space: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            skip_pole_identification: false,
            skip_residue_identification: false,
            relax: true,
            asymptotic_trend: AsymptoticTrend::Constant,
            stable: true,
            complex_state_space: true,
        }
    }
}

/// Stopping rule for [`super::VectorFitting::fit_until_converged`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    /// Upper bound on the number of `fit` calls
    pub max_iterations: usize,
    /// Largest relative pole movement accepted as converged
    pub tolerance: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}
