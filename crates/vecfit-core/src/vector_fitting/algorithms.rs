//! Core algorithms for Vector Fitting
//!
//! Implements the two stages of relaxed vector fitting:
//!
//! 1. Pole identification: a weighted least-squares fit of `sigma(s) f(s)`
//!    with a relaxed sigma function, compressed per channel with QR, followed
//!    by an eigenvalue solve for the zeros of sigma.
//! 2. Residue identification: an independent weighted least-squares solve
//!    per channel with the poles held fixed.

use ndarray::{s, Array1, Array2, ArrayView1};
use num_complex::Complex64;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::basis::{combine_pair_residues, pole_basis, stack_real_imag};
use super::error::{FitError, Result};
use super::options::{AsymptoticTrend, Options};
use super::poles::{self, PoleKind};
use crate::constants::{BLOCK_DIAGONAL_TOL, SIGMA_D_TOL_HIGH, SIGMA_D_TOL_LOW};
use crate::math::linalg::{self, ThinQr};

/// Result of one pole relocation
#[derive(Debug, Clone)]
pub struct PoleRelocationResult {
    /// Relocated poles in canonical order
    pub poles: Array1<Complex64>,
    /// Constant term of the relaxed sigma function
    pub d_sigma: f64,
    /// Number of poles mirrored into the left half-plane
    pub n_reflected: usize,
}

/// Residues and asymptotic terms for every channel
#[derive(Debug, Clone)]
pub struct ResidueFit {
    /// `[n_channels, n_poles]`
    pub residues: Array2<Complex64>,
    pub offsets: Array1<f64>,
    pub slopes: Array1<f64>,
}

/// Run `op` for every channel, on the rayon pool when enabled
fn per_channel<T, F>(n_channels: usize, op: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..n_channels).into_par_iter().map(op).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n_channels).map(op).collect()
    }
}

/// RMS of the weighted responses, normalized by the sample count
fn sigma_scale(f: &Array2<Complex64>, weights: &Array2<f64>) -> f64 {
    let n_samples = f.ncols();
    let mut sum = 0.0;
    for ((n, k), value) in f.indexed_iter() {
        sum += (*value * weights[[k, n]]).norm_sqr();
    }
    sum.sqrt() / n_samples as f64
}

/// Compressed contribution of one channel to the sigma system
struct SigmaBlock {
    r22: Array2<f64>,
    rhs: Option<Array1<f64>>,
}

/// Assemble and QR-compress the relaxed system of channel `n`
///
/// Unknowns are `[residues of sigma*f (n_poles + offs) | sigma (n_poles + 1)]`.
/// Only the lower-right block of R, which couples the shared sigma unknowns,
/// is kept. The last channel also carries the integral constraint row that
/// rules out the trivial solution.
#[allow(clippy::too_many_arguments)]
fn sigma_block(
    n: usize,
    dk: &Array2<Complex64>,
    f: &Array2<Complex64>,
    weights: &Array2<f64>,
    n_poles: usize,
    offs: usize,
    scale: f64,
    constrained: bool,
) -> Result<SigmaBlock> {
    let n_samples = f.ncols();
    let n_sigma = n_poles + 1;
    let left = n_poles + offs;
    let n_cols = left + n_sigma;

    let mut a = Array2::<Complex64>::zeros((n_samples, n_cols));
    for k in 0..n_samples {
        let w = weights[[k, n]];
        for m in 0..left {
            a[[k, m]] = dk[[k, m]] * w;
        }
        for m in 0..n_sigma {
            a[[k, left + m]] = -dk[[k, m]] * f[[n, k]] * w;
        }
    }

    let stacked = stack_real_imag(&a);
    let system = if constrained {
        let mut with_row = Array2::<f64>::zeros((2 * n_samples + 1, n_cols));
        with_row.slice_mut(s![..2 * n_samples, ..]).assign(&stacked);
        for m in 0..n_sigma {
            let integral: Complex64 = dk.column(m).sum();
            with_row[[2 * n_samples, left + m]] = (integral * scale).re;
        }
        with_row
    } else {
        stacked
    };

    let ThinQr { q, r } = linalg::qr(&system)?;

    // R is k x n_cols with k = min(rows, n_cols); rows past k are zero.
    let mut r22 = Array2::<f64>::zeros((n_sigma, n_sigma));
    let avail = r.nrows().min(n_cols);
    if avail > left {
        r22.slice_mut(s![..avail - left, ..])
            .assign(&r.slice(s![left..avail, left..]));
    }

    let rhs = constrained.then(|| {
        let mut rhs = Array1::<f64>::zeros(n_sigma);
        let last = q.row(q.nrows() - 1);
        let avail = q.ncols().min(n_cols);
        for m in 0..avail.saturating_sub(left) {
            rhs[m] = last[left + m] * n_samples as f64 * scale;
        }
        rhs
    });

    Ok(SigmaBlock { r22, rhs })
}

/// Real block-diagonal embedding `(Lambda, B, C)` of the poles and sigma residues
fn block_diagonal(
    poles: &[Complex64],
    kinds: &[PoleKind],
    c: &[Complex64],
) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>)> {
    let n_poles = poles.len();
    let mut lambda = Array2::<f64>::zeros((n_poles, n_poles));
    let mut b = Array1::<f64>::zeros(n_poles);
    let mut c_real = Array1::<f64>::zeros(n_poles);

    for m in 0..n_poles {
        let p = poles[m];
        match kinds[m] {
            PoleKind::Real => {
                if c[m].im.abs() > BLOCK_DIAGONAL_TOL * c[m].norm().max(1.0) {
                    return Err(FitError::Inconsistent(format!(
                        "real pole {} carries complex sigma residue {}",
                        m, c[m]
                    )));
                }
                lambda[[m, m]] = p.re;
                b[m] = 1.0;
                c_real[m] = c[m].re;
            }
            PoleKind::PairFirst => {
                let mismatch = (poles[m + 1] - p.conj()).norm();
                if mismatch > BLOCK_DIAGONAL_TOL * p.norm() {
                    return Err(FitError::Inconsistent(format!(
                        "poles {} and {} are not a conjugate pair",
                        m,
                        m + 1
                    )));
                }
                lambda[[m, m]] = p.re;
                lambda[[m + 1, m + 1]] = p.re;
                lambda[[m, m + 1]] = p.im;
                lambda[[m + 1, m]] = -p.im;
                b[m] = 2.0;
                b[m + 1] = 0.0;
                c_real[m] = c[m].re;
                c_real[m + 1] = c[m].im;
            }
            PoleKind::PairSecond => {}
        }
    }

    if lambda.iter().chain(c_real.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::Inconsistent(
            "non-finite entry in block-diagonal pole embedding".to_string(),
        ));
    }

    Ok((lambda, b, c_real))
}

/// Relaxed pole identification (stage 1)
///
/// # Arguments
/// * `poles` - Current poles, real or adjacent conjugate pairs
/// * `s` - Complex sample frequencies
/// * `f` - Responses `[n_channels, n_samples]`
/// * `weights` - Weights `[n_samples, n_channels]`
/// * `opts` - Fitting options (trend, relaxation, stability)
pub fn pole_relocation(
    poles: &[Complex64],
    s: ArrayView1<Complex64>,
    f: &Array2<Complex64>,
    weights: &Array2<f64>,
    opts: &Options,
) -> Result<PoleRelocationResult> {
    if !opts.relax {
        return Err(FitError::Unsupported("non-relaxed pole identification"));
    }

    let n_poles = poles.len();
    let n_channels = f.nrows();
    let n_sigma = n_poles + 1;
    let offs = opts.asymptotic_trend.n_terms();

    let kinds = poles::conjugacy_index(poles);
    let dk = pole_basis(s, poles, &kinds, offs.max(1));
    let scale = sigma_scale(f, weights);

    log::debug!(
        "pole identification: {} poles, {} channels, {} samples, trend {:?}",
        n_poles,
        n_channels,
        s.len(),
        opts.asymptotic_trend
    );

    let blocks = per_channel(n_channels, |n| {
        let constrained = n + 1 == n_channels;
        sigma_block(n, &dk, f, weights, n_poles, offs, scale, constrained)
    })?;

    let mut aa = Array2::<f64>::zeros((n_channels * n_sigma, n_sigma));
    let mut bb = Array1::<f64>::zeros(n_channels * n_sigma);
    for (n, block) in blocks.into_iter().enumerate() {
        let rows = n * n_sigma..(n + 1) * n_sigma;
        aa.slice_mut(s![rows.clone(), ..]).assign(&block.r22);
        if let Some(rhs) = block.rhs {
            bb.slice_mut(s![rows]).assign(&rhs);
        }
    }

    let x = linalg::lstsq_normalized(&aa, &bb)?;
    let d_sigma = x[n_poles];

    if !(SIGMA_D_TOL_LOW..=SIGMA_D_TOL_HIGH).contains(&d_sigma.abs()) {
        return Err(FitError::Unsupported(
            "relaxed sigma out of tolerance; non-relaxed pole identification",
        ));
    }

    let c = combine_pair_residues(x.slice(s![..n_poles]), &kinds);
    let (lambda, b, c_real) = block_diagonal(poles, &kinds, &c)?;

    let mut zer = lambda;
    for i in 0..n_poles {
        for j in 0..n_poles {
            zer[[i, j]] -= b[i] * c_real[j] / d_sigma;
        }
    }

    let mut roots = linalg::eigenvalues(&zer)?;
    let n_reflected = if opts.stable {
        poles::reflect_unstable(&mut roots)
    } else {
        0
    };
    if n_reflected > 0 {
        log::debug!("reflected {} unstable poles", n_reflected);
    }

    let poles = poles::canonical_order(&roots);
    log::trace!("relocated poles: {:?}", poles);

    Ok(PoleRelocationResult {
        poles,
        d_sigma,
        n_reflected,
    })
}

/// Residue identification (stage 2)
///
/// Solves one least-squares problem per channel with the poles fixed.
/// Columns are the pole basis plus the trend terms (`1`, then `s`).
pub fn fit_residues(
    poles: &[Complex64],
    s: ArrayView1<Complex64>,
    f: &Array2<Complex64>,
    weights: &Array2<f64>,
    trend: AsymptoticTrend,
) -> Result<ResidueFit> {
    let n_poles = poles.len();
    let n_channels = f.nrows();
    let n_samples = f.ncols();
    let offs = trend.n_terms();
    let n_cols = n_poles + offs;

    let kinds = poles::conjugacy_index(poles);
    let dk = pole_basis(s, poles, &kinds, offs);

    log::debug!(
        "residue identification: {} poles, {} channels, trend {:?}",
        n_poles,
        n_channels,
        trend
    );

    let solutions = per_channel(n_channels, |n| {
        let mut a = Array2::<Complex64>::zeros((n_samples, n_cols));
        let mut b = Array2::<Complex64>::zeros((n_samples, 1));
        for k in 0..n_samples {
            let w = weights[[k, n]];
            for m in 0..n_cols {
                a[[k, m]] = dk[[k, m]] * w;
            }
            b[[k, 0]] = f[[n, k]] * w;
        }

        let a_ri = stack_real_imag(&a);
        let b_ri = stack_real_imag(&b).column(0).to_owned();
        Ok(linalg::lstsq_normalized(&a_ri, &b_ri)?)
    })?;

    let mut residues = Array2::<Complex64>::zeros((n_channels, n_poles));
    let mut offsets = Array1::<f64>::zeros(n_channels);
    let mut slopes = Array1::<f64>::zeros(n_channels);

    for (n, x) in solutions.iter().enumerate() {
        let row = combine_pair_residues(x.slice(s![..n_poles]), &kinds);
        residues.row_mut(n).assign(&Array1::from_vec(row));
        if trend.has_offset() {
            offsets[n] = x[n_poles];
        }
        if trend.has_slope() {
            slopes[n] = x[n_poles + 1];
        }
    }

    Ok(ResidueFit {
        residues,
        offsets,
        slopes,
    })
}
