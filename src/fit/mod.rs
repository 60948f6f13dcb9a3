//! Estimation of inhibition parameters from dose-response signals
//!
//! The pipeline normalizes observed signals so the uninhibited reference
//! condition reads 100, then minimizes the sum of squared signal residuals
//! over the nonnegative orthant with a bounded least-squares solver.
//!
//! ## Example
//!
//! ```
//! use kinact::data::{Assay, Dataset};
//! use kinact::fit::{fit, FitOptions};
//!
//! # fn main() -> Result<(), kinact::KinactError> {
//! let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0)?;
//! let dataset = Dataset::builder(assay)
//!     .observation(30.0, 60.0, 0.0, 100.0)
//!     .observation(30.0, 60.0, 1.0, 76.2)
//!     .observation(30.0, 60.0, 5.0, 37.5)
//!     .observation(30.0, 60.0, 25.0, 11.4)
//!     .build()?;
//!
//! let result = fit(&dataset, &FitOptions::default())?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod diagnostics;
pub mod error;
pub mod problem;
pub mod solver;
pub mod types;

pub use analyze::{fit, FitInhibition};
pub use diagnostics::{r_squared, rmse};
pub use error::FitError;
pub use problem::{response_scale, InhibitionProblem, REFERENCE_SIGNAL};
pub use solver::{
    Bounds, LeastSquaresSolver, LevenbergMarquardt, Minimum, NelderMeadSolver, ResidualModel,
    SolverConfig, Termination,
};
pub use types::{Convergence, FitOptions, FitResult, GoodnessOfFit, Prediction, SolverBackend};
