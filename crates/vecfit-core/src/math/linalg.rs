//! Linear algebra operations
//!
//! This module provides the dense real kernels used by vector fitting:
//! thin QR factorization, SVD least squares, eigenvalues of a real matrix
//! and column normalization. nalgebra is the backend; all ndarray<->nalgebra
//! conversions are contained here.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::constants::{COLUMN_SCALE_TOL, SVD_TOLERANCE};

/// Result of least squares solve
pub struct LstsqResult {
    pub solution: Array1<f64>,
    pub condition: f64,
}

/// Thin QR factorization `A = Q R`
///
/// For an `m x n` matrix with `k = min(m, n)`, `q` is `m x k` and `r` is
/// `k x n` upper triangular.
pub struct ThinQr {
    pub q: Array2<f64>,
    pub r: Array2<f64>,
}

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

#[inline]
fn to_na_real(a: &Array2<f64>) -> DMatrix<f64> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| a[[i, j]])
}

#[inline]
fn all_finite(a: &Array2<f64>) -> bool {
    a.iter().all(|v| v.is_finite())
}

#[inline]
fn from_na_real(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

// ============================================================================
// Eigenvalue decomposition
// ============================================================================

/// Compute complex eigenvalues of a real matrix
///
/// Returns error if matrix is not square.
pub fn eigenvalues(a: &Array2<f64>) -> Result<Vec<Complex64>, &'static str> {
    let (m, n) = a.dim();
    if m != n {
        return Err("Matrix must be square");
    }
    if m == 0 {
        return Ok(Vec::new());
    }
    if !all_finite(a) {
        return Err("Matrix contains non-finite entries");
    }

    let eigs = to_na_real(a).complex_eigenvalues();
    Ok(eigs.iter().map(|e| Complex64::new(e.re, e.im)).collect())
}

// ============================================================================
// QR Decomposition
// ============================================================================

/// Householder QR decomposition returning both thin factors
pub fn qr(a: &Array2<f64>) -> Result<ThinQr, &'static str> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err("Empty matrix");
    }
    if !all_finite(a) {
        return Err("Matrix contains non-finite entries");
    }

    let qr = to_na_real(a).qr();
    Ok(ThinQr {
        q: from_na_real(&qr.q()),
        r: from_na_real(&qr.r()),
    })
}

// ============================================================================
// Least Squares
// ============================================================================

/// Solve least squares problem Ax = b using SVD
///
/// Returns solution vector and condition number.
pub fn lstsq(a: &Array2<f64>, b: &Array1<f64>) -> Result<LstsqResult, &'static str> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err("Empty matrix");
    }
    if b.len() != m {
        return Err("Dimension mismatch");
    }
    // nalgebra's SVD does not terminate on NaN input
    if !all_finite(a) || b.iter().any(|v| !v.is_finite()) {
        return Err("Matrix contains non-finite entries");
    }

    let a_na = to_na_real(a);
    let b_na = DVector::from_fn(m, |i, _| b[i]);

    let svd = a_na.svd(true, true);
    let solution = svd.solve(&b_na, SVD_TOLERANCE)?;

    let sv = &svd.singular_values;
    let max = sv.iter().cloned().fold(0.0, f64::max);
    let min = sv.iter().cloned().fold(f64::INFINITY, f64::min);
    let condition = if min > COLUMN_SCALE_TOL { max / min } else { f64::INFINITY };

    Ok(LstsqResult {
        solution: solution.iter().cloned().collect(),
        condition,
    })
}

/// Scale every column of `a` to unit Euclidean norm in place
///
/// Returns the per-column factors that were applied, so that the solution
/// of the scaled system maps back as `x[j] * scale[j]`. Columns with a
/// vanishing norm keep a factor of one.
pub fn normalize_columns(a: &mut Array2<f64>) -> Array1<f64> {
    let mut scale = Array1::<f64>::ones(a.ncols());
    for (j, mut col) in a.columns_mut().into_iter().enumerate() {
        let norm = col.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > COLUMN_SCALE_TOL {
            scale[j] = 1.0 / norm;
            col.mapv_inplace(|v| v / norm);
        }
    }
    scale
}

/// Column-normalize, solve and undo the normalization
pub fn lstsq_normalized(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, &'static str> {
    let mut scaled = a.clone();
    let scale = normalize_columns(&mut scaled);
    let result = lstsq(&scaled, b)?;
    log::trace!(
        "lstsq {}x{}: condition {:.3e}",
        a.nrows(),
        a.ncols(),
        result.condition
    );
    Ok(result.solution * &scale)
}
