//! Pole bookkeeping for Vector Fitting
//!
//! Poles are kept as a flat ordered array. Every pole is either real or one
//! half of a complex conjugate pair stored at consecutive positions; the
//! [`PoleKind`] tag array derived by [`conjugacy_index`] is what the matrix
//! assembly routines branch on.

use ndarray::Array1;
use num_complex::Complex64;
use std::cmp::Ordering;

use super::error::{FitError, Result};
use crate::constants::{CONJUGATE_TOL, REAL_POLE_TOLERANCE, STARTING_POLE_DAMPING};
use crate::math::spacing::FrequencySpacing;

/// Position of a pole within the real / conjugate pair layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoleKind {
    Real,
    /// First element of a conjugate pair
    PairFirst,
    /// Second element of a conjugate pair
    PairSecond,
}

/// Tag every pole as real, first-of-pair or second-of-pair
///
/// Scans in order and toggles between first and second each time a
/// non-real pole is met.
pub fn conjugacy_index(poles: &[Complex64]) -> Vec<PoleKind> {
    let mut in_pair = false;
    poles
        .iter()
        .map(|p| {
            if p.im == 0.0 {
                PoleKind::Real
            } else if in_pair {
                in_pair = false;
                PoleKind::PairSecond
            } else {
                in_pair = true;
                PoleKind::PairFirst
            }
        })
        .collect()
}

#[inline]
fn is_conjugate(a: Complex64, b: Complex64) -> bool {
    (a.conj() - b).norm() <= CONJUGATE_TOL * a.norm()
}

/// Check that every non-real pole is immediately followed by its conjugate
pub fn validate_pairs(poles: &[Complex64]) -> Result<()> {
    let mut i = 0;
    while i < poles.len() {
        let pole = poles[i];
        if pole.im == 0.0 {
            i += 1;
            continue;
        }
        match poles.get(i + 1) {
            Some(&next) if is_conjugate(pole, next) => i += 2,
            _ => return Err(FitError::UnpairedPole { index: i, pole }),
        }
    }
    Ok(())
}

/// Default starting poles for a model of even `order`
///
/// The imaginary parts of `order / 2` pairs are spread over the range of
/// `Im(s)` (true min/max, so samples need not be sorted). Each pair is
/// `-w/100 + jw` followed by its conjugate.
pub fn starting_poles(
    s: &[Complex64],
    order: usize,
    spacing: FrequencySpacing,
) -> Result<Array1<Complex64>> {
    if order % 2 != 0 {
        return Err(FitError::OddOrder(order));
    }
    if s.is_empty() {
        return Err(FitError::EmptySamples);
    }

    let lo = s.iter().map(|x| x.im).fold(f64::INFINITY, f64::min);
    let hi = s.iter().map(|x| x.im).fold(f64::NEG_INFINITY, f64::max);

    let mut poles = Vec::with_capacity(order);
    for w in spacing.generate(lo, hi, order / 2) {
        let pole = Complex64::new(-w / STARTING_POLE_DAMPING, w);
        poles.push(pole);
        poles.push(pole.conj());
    }

    Ok(Array1::from_vec(poles))
}

/// Mirror poles with positive real part into the left half-plane
///
/// Returns how many poles were reflected.
pub fn reflect_unstable(poles: &mut [Complex64]) -> usize {
    let mut flipped = 0;
    for p in poles.iter_mut().filter(|p| p.re > 0.0) {
        p.re = -p.re;
        flipped += 1;
    }
    flipped
}

fn by_magnitudes(a: &Complex64, b: &Complex64) -> Ordering {
    a.im.abs()
        .total_cmp(&b.im.abs())
        .then(a.re.abs().total_cmp(&b.re.abs()))
        .then(a.re.total_cmp(&b.re))
}

/// Arrange eigenvalues into the canonical pole layout
///
/// Sorted by `(|Im|, |Re|)` ascending: real poles come first as singletons,
/// then conjugate pairs with the negative imaginary part leading. Each pair
/// is rebuilt from its two members so that the second is the exact
/// conjugate of the first.
pub fn canonical_order(roots: &[Complex64]) -> Array1<Complex64> {
    let is_real = |p: &Complex64| p.im.abs() <= REAL_POLE_TOLERANCE * p.norm();

    let mut reals: Vec<Complex64> = roots
        .iter()
        .filter(|p| is_real(*p))
        .map(|p| Complex64::new(p.re, 0.0))
        .collect();
    let mut complex: Vec<Complex64> = roots.iter().filter(|p| !is_real(*p)).copied().collect();
    complex.sort_by(by_magnitudes);

    let mut pairs = Vec::with_capacity(complex.len());
    let mut chunks = complex.chunks_exact(2);
    for pair in &mut chunks {
        let re = 0.5 * (pair[0].re + pair[1].re);
        let im = 0.5 * (pair[0].im.abs() + pair[1].im.abs());
        pairs.push(Complex64::new(re, -im));
        pairs.push(Complex64::new(re, im));
    }
    // An unmatched complex root can only come from a broken eigen solve;
    // keep the count intact by treating it as real.
    reals.extend(chunks.remainder().iter().map(|p| Complex64::new(p.re, 0.0)));
    reals.sort_by(by_magnitudes);

    reals.into_iter().chain(pairs).collect()
}
