//! Vector fitting errors

use num_complex::Complex64;
use thiserror::Error;

/// Errors raised while building or fitting a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Invalid input: sample set is empty")]
    EmptySamples,

    #[error("Invalid input: pole {index} ({pole}) is not followed by its conjugate")]
    UnpairedPole { index: usize, pole: Complex64 },

    #[error("Invalid input: model order {0} must be even to build conjugate starting poles")]
    OddOrder(usize),

    #[error("Invalid input: weights are {actual:?}, expected {expected:?} (samples x channels)")]
    WeightShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Not implemented: {0}")]
    Unsupported(&'static str),

    #[error("Numerical inconsistency: {0}")]
    Inconsistent(String),

    #[error("Linear algebra failure: {0}")]
    Linalg(&'static str),
}

impl From<&'static str> for FitError {
    fn from(message: &'static str) -> Self {
        FitError::Linalg(message)
    }
}

pub type Result<T> = std::result::Result<T, FitError>;
