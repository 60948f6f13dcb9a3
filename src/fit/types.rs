//! Option and result types for the fitting pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fit::solver::{SolverConfig, Termination};
use crate::simulator::InhibitionParams;

/// Which bounded least-squares backend drives the fit
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverBackend {
    /// Damped least squares with box projection (default)
    #[default]
    LevenbergMarquardt,
    /// Simplex search over the projected sum of squares
    NelderMead,
}

/// Fit configuration
///
/// Use the `with_*` methods to adjust individual settings.
///
/// ```
/// use kinact::fit::{FitOptions, SolverBackend};
/// use kinact::simulator::InhibitionParams;
///
/// let options = FitOptions::default()
///     .with_initial(InhibitionParams::new(0.2, 5.0))
///     .with_solver(SolverBackend::NelderMead);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FitOptions {
    /// Starting estimate for the optimizer (default: (1, 1))
    pub initial: InhibitionParams,
    /// Optimization backend (default: Levenberg-Marquardt)
    pub solver: SolverBackend,
    /// Solver tolerances and iteration cap
    pub config: SolverConfig,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            initial: InhibitionParams::default(),
            solver: SolverBackend::default(),
            config: SolverConfig::default(),
        }
    }
}

impl FitOptions {
    /// Set the starting estimate
    ///
    /// The objective is not guaranteed convex; rerunning the fit from varied
    /// starting points is the caller's tool for checking robustness.
    pub fn with_initial(mut self, initial: InhibitionParams) -> Self {
        self.initial = initial;
        self
    }

    /// Set the optimization backend
    pub fn with_solver(mut self, solver: SolverBackend) -> Self {
        self.solver = solver;
        self
    }

    /// Set the full solver configuration
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the solver iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }
}

/// One observation row augmented with its fitted prediction
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pre_incubation_time: f64,
    incubation_time: f64,
    inhibitor_conc: f64,
    observed: f64,
    predicted: f64,
}

impl Prediction {
    pub(crate) fn new(
        pre_incubation_time: f64,
        incubation_time: f64,
        inhibitor_conc: f64,
        observed: f64,
        predicted: f64,
    ) -> Self {
        Self {
            pre_incubation_time,
            incubation_time,
            inhibitor_conc,
            observed,
            predicted,
        }
    }

    /// Duration of the pre-incubation phase
    pub fn pre_incubation_time(&self) -> f64 {
        self.pre_incubation_time
    }

    /// Duration of the incubation phase
    pub fn incubation_time(&self) -> f64 {
        self.incubation_time
    }

    /// Inhibitor concentration during pre-incubation
    pub fn inhibitor_conc(&self) -> f64 {
        self.inhibitor_conc
    }

    /// Observed assay signal
    pub fn observed(&self) -> f64 {
        self.observed
    }

    /// Predicted assay signal at the fitted parameters
    pub fn predicted(&self) -> f64 {
        self.predicted
    }

    /// Observed minus predicted signal
    pub fn residual(&self) -> f64 {
        self.observed - self.predicted
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "inhibitor {:.4}: observed {:.3}, predicted {:.3}",
            self.inhibitor_conc, self.observed, self.predicted
        )
    }
}

/// Goodness-of-fit statistics
///
/// `r_squared` is NaN when the observed signals have zero variance; RMSE
/// remains meaningful in that case.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GoodnessOfFit {
    pub r_squared: f64,
    pub rmse: f64,
}

/// How and where the solver stopped
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
    /// Whether a convergence tolerance was satisfied
    pub converged: bool,
    /// The specific stopping condition
    pub termination: Termination,
    /// Solver iterations used
    pub iterations: usize,
    /// Final sum of squared residuals
    pub cost: f64,
}

/// The frozen outcome of one fit
///
/// Holds the fitted parameters, the response scale that was applied, the
/// input rows augmented with predicted signals (input order preserved), the
/// goodness-of-fit statistics, and the convergence report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FitResult {
    parameters: InhibitionParams,
    scale: f64,
    predictions: Vec<Prediction>,
    gof: GoodnessOfFit,
    convergence: Convergence,
}

impl FitResult {
    pub(crate) fn new(
        parameters: InhibitionParams,
        scale: f64,
        predictions: Vec<Prediction>,
        gof: GoodnessOfFit,
        convergence: Convergence,
    ) -> Self {
        Self {
            parameters,
            scale,
            predictions,
            gof,
            convergence,
        }
    }

    /// The fitted parameter pair
    pub fn parameters(&self) -> InhibitionParams {
        self.parameters
    }

    /// The response scale factor that converted product concentrations to signals
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The input rows augmented with predicted signals, in input order
    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// Goodness-of-fit statistics
    pub fn gof(&self) -> GoodnessOfFit {
        self.gof
    }

    /// Convergence report
    pub fn convergence(&self) -> &Convergence {
        &self.convergence
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Fitted parameters: {}", self.parameters)?;
        writeln!(
            f,
            "R-squared {:.6}, RMSE {:.6} over {} observations",
            self.gof.r_squared,
            self.gof.rmse,
            self.predictions.len()
        )?;
        if self.convergence.converged {
            writeln!(
                f,
                "Converged after {} iterations ({})",
                self.convergence.iterations, self.convergence.termination
            )?;
        } else {
            writeln!(
                f,
                "Did not converge within {} iterations ({})",
                self.convergence.iterations, self.convergence.termination
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_start_is_one_one() {
        let options = FitOptions::default();
        assert_eq!(options.initial, InhibitionParams::new(1.0, 1.0));
        assert_eq!(options.solver, SolverBackend::LevenbergMarquardt);
    }

    #[test]
    fn builders_update_fields() {
        let options = FitOptions::default()
            .with_initial(InhibitionParams::new(0.2, 5.0))
            .with_solver(SolverBackend::NelderMead)
            .with_max_iterations(50);
        assert_eq!(options.initial, InhibitionParams::new(0.2, 5.0));
        assert_eq!(options.solver, SolverBackend::NelderMead);
        assert_eq!(options.config.max_iterations, 50);
    }

    #[test]
    fn prediction_residual_is_observed_minus_predicted() {
        let prediction = Prediction::new(30.0, 60.0, 1.0, 73.0, 70.5);
        assert_eq!(prediction.residual(), 2.5);
    }

    #[test]
    fn result_display_reports_convergence() {
        let result = FitResult::new(
            InhibitionParams::new(0.8, 2.5),
            12.5,
            vec![Prediction::new(30.0, 60.0, 0.0, 100.0, 100.0)],
            GoodnessOfFit {
                r_squared: 0.999,
                rmse: 0.4,
            },
            Convergence {
                converged: true,
                termination: Termination::CostTolerance,
                iterations: 17,
                cost: 1.3,
            },
        );
        let rendered = format!("{}", result);
        assert!(rendered.contains("kinact 0.800000"));
        assert!(rendered.contains("Converged after 17 iterations"));
    }
}
