//! Mathematical helpers
//!
//! - `linalg` - dense linear algebra on ndarray containers (nalgebra backend)
//! - `spacing` - linear and logarithmic point distributions

pub mod linalg;
pub mod spacing;
