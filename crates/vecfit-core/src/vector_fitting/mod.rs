//! Vector Fitting algorithm for rational approximation of frequency responses
//!
//! Approximates sampled responses `f(s)` (one or more channels sharing the
//! same poles) by
//!
//! `f(s) ~ sum_n r_n / (s - p_n) + d + s e`
//!
//! using relaxed pole relocation followed by residue identification.
//!
//! # References
//!
//! - B. Gustavsen, A. Semlyen, "Rational Approximation of Frequency Domain Responses
//!   by Vector Fitting", IEEE Trans. Power Delivery, vol. 14, no. 3, 1999
//! - B. Gustavsen, "Improving the Pole Relocating Properties of Vector Fitting",
//!   IEEE Trans. Power Delivery, vol. 21, no. 3, 2006

mod algorithms;
mod basis;
mod core;
mod error;
mod model;
mod options;
pub mod poles;
mod sample;

pub use self::core::{ConvergenceReport, VectorFitting};
pub use algorithms::{fit_residues, pole_relocation, PoleRelocationResult, ResidueFit};
pub use error::{FitError, Result};
pub use model::{max_deviation, rms_error, StateSpaceModel};
pub use options::{AsymptoticTrend, ConvergenceCriteria, Options};
pub use sample::Sample;
