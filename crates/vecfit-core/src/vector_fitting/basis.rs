//! Partial-fraction basis shared by the pole and residue identification stages

use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;

use super::poles::PoleKind;

/// Build the basis matrix `Dk` of shape `[n_samples, n_poles + n_extra]`
///
/// - Real pole: `1 / (s - p)`
/// - Conjugate pair `(p, p*)`: `1/(s-p) + 1/(s-p*)` and `j/(s-p) - j/(s-p*)`,
///   so the coefficients of both columns are real.
///
/// Up to two trailing columns follow: a column of ones, then `s`.
pub fn pole_basis(
    s: ArrayView1<Complex64>,
    poles: &[Complex64],
    kinds: &[PoleKind],
    n_extra: usize,
) -> Array2<Complex64> {
    let n_poles = poles.len();
    let mut dk = Array2::<Complex64>::zeros((s.len(), n_poles + n_extra));
    let one = Complex64::new(1.0, 0.0);

    for (k, &s_k) in s.iter().enumerate() {
        for m in 0..n_poles {
            match kinds[m] {
                PoleKind::Real => dk[[k, m]] = one / (s_k - poles[m]),
                PoleKind::PairFirst => {
                    let t1 = one / (s_k - poles[m]);
                    let t2 = one / (s_k - poles[m].conj());
                    dk[[k, m]] = t1 + t2;
                    dk[[k, m + 1]] = Complex64::i() * (t1 - t2);
                }
                PoleKind::PairSecond => {}
            }
        }
        if n_extra > 0 {
            dk[[k, n_poles]] = one;
        }
        if n_extra > 1 {
            dk[[k, n_poles + 1]] = s_k;
        }
    }

    dk
}

/// Turn real-encoded coefficients back into complex residues
///
/// A pair stored as `(r1, r2)` becomes `r1 + j r2` for the first pole and
/// `r1 - j r2` for its conjugate.
pub fn combine_pair_residues(x: ArrayView1<f64>, kinds: &[PoleKind]) -> Vec<Complex64> {
    let mut residues = Vec::with_capacity(kinds.len());
    for (m, kind) in kinds.iter().enumerate() {
        let r = match kind {
            PoleKind::Real => Complex64::new(x[m], 0.0),
            PoleKind::PairFirst => Complex64::new(x[m], x[m + 1]),
            PoleKind::PairSecond => Complex64::new(x[m - 1], -x[m]),
        };
        residues.push(r);
    }
    residues
}

/// Stack a complex matrix as `[Re(A); Im(A)]`
pub fn stack_real_imag(a: &Array2<Complex64>) -> Array2<f64> {
    let (rows, cols) = a.dim();
    let mut result = Array2::<f64>::zeros((2 * rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            result[[i, j]] = a[[i, j]].re;
            result[[rows + i, j]] = a[[i, j]].im;
        }
    }
    result
}
