//! Numerical constants for vector fitting
//!
//! Centralizes the tolerances shared by the pole and residue identification
//! stages.

/// Tolerance for SVD solve in least squares problems.
pub const SVD_TOLERANCE: f64 = 1e-14;

/// Tolerance for column scaling in numerical algorithms.
/// Columns with a smaller norm are left unscaled.
pub const COLUMN_SCALE_TOL: f64 = 1e-15;

/// Lower bound on |d| of the relaxed sigma function.
pub const SIGMA_D_TOL_LOW: f64 = 1e-18;

/// Upper bound on |d| of the relaxed sigma function.
pub const SIGMA_D_TOL_HIGH: f64 = 1e18;

/// Relative tolerance used to check that two poles are complex conjugates.
pub const CONJUGATE_TOL: f64 = 1e-9;

/// Relative tolerance for the imaginary residue left by the real
/// block-diagonal embedding of the poles.
pub const BLOCK_DIAGONAL_TOL: f64 = 1e-8;

/// Relative tolerance below which an eigenvalue is treated as a real pole.
pub const REAL_POLE_TOLERANCE: f64 = 1e-12;

/// Ratio between the imaginary and the (negated) real part of the default
/// starting poles: `p = -w / 100 + j w`.
pub const STARTING_POLE_DAMPING: f64 = 100.0;
