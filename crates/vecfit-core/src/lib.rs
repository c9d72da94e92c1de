//! vecfit-core: rational macromodels of sampled frequency responses
//!
//! Fits tabulated frequency-domain data with a pole-residue model using
//! Gustavsen's relaxed vector fitting.
//!
//! ## Modules
//!
//! - `vector_fitting` - Fitting engine, model evaluation and error metrics
//! - `math` - Linear algebra backend and point spacing helpers
//! - `constants` - Numerical tolerances

pub mod constants;
pub mod math;
pub mod vector_fitting;

pub use math::spacing::FrequencySpacing;
pub use vector_fitting::{AsymptoticTrend, FitError, Options, Sample, VectorFitting};
