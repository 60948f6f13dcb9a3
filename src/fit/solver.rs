//! Bounded nonlinear least-squares solvers
//!
//! [LeastSquaresSolver] is the seam between the fitting pipeline and the
//! optimization backend: anything that can minimize a sum of squared
//! residuals over a box can be substituted. Two backends ship with the
//! crate, a damped (projected) Levenberg-Marquardt solver and a Nelder-Mead
//! simplex search built on argmin.

use argmin::{
    core::{CostFunction, Error as ArgminError, Executor, TerminationReason, TerminationStatus},
    solver::neldermead::NelderMead,
};
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fit::error::FitError;

/// A residual function the solvers can minimize
///
/// Implementations map a parameter slice to one residual per observation;
/// the solvers minimize the sum of their squares.
pub trait ResidualModel {
    /// Residual vector at the given parameters
    fn residuals(&self, params: &[f64]) -> Result<Array1<f64>, FitError>;

    /// Number of parameters
    fn parameter_count(&self) -> usize;

    /// Number of residuals
    fn residual_count(&self) -> usize;
}

/// A bounded least-squares backend
pub trait LeastSquaresSolver {
    /// Minimize the sum of squared residuals over the box
    ///
    /// Infeasible starting points are projected onto the bounds rather than
    /// rejected. Non-convergent termination is reported through
    /// [Minimum::termination], not as an error.
    fn minimize(
        &self,
        model: &dyn ResidualModel,
        initial: &[f64],
        bounds: &Bounds,
    ) -> Result<Minimum, FitError>;
}

// ============================================================================
// Bounds
// ============================================================================

/// Per-parameter box constraints
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Constructs validated bounds
    ///
    /// Every lower bound must be less than or equal to its upper bound, and
    /// neither may be NaN. Infinite bounds are allowed.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, FitError> {
        if lower.len() != upper.len() {
            return Err(FitError::InvalidBounds(format!(
                "{} lower bounds but {} upper bounds",
                lower.len(),
                upper.len()
            )));
        }
        for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !(lo <= hi) {
                return Err(FitError::InvalidBounds(format!(
                    "lower bound {lo} does not precede upper bound {hi} at index {i}"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// The nonnegative orthant, `[0, inf)` for each of `n` parameters
    pub fn nonnegative(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Number of constrained parameters
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether the box constrains no parameters
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower bounds
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper bounds
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Clamp a point into the box, component by component
    pub fn project(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(&value, (&lo, &hi))| value.clamp(lo, hi))
            .collect()
    }
}

// ============================================================================
// Solver configuration and outcome
// ============================================================================

/// Tolerances and iteration cap shared by the solver backends.
///
/// Defaults: 200 iterations, all tolerances 1e-10, initial damping 1e-3.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Outer iteration cap
    pub max_iterations: usize,
    /// Relative cost-reduction tolerance
    pub ftol: f64,
    /// Relative parameter-step tolerance
    pub xtol: f64,
    /// Projected-gradient tolerance
    pub gtol: f64,
    /// Initial Levenberg damping factor
    pub initial_damping: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

/// Why the solver stopped
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative cost reduction fell below ftol
    CostTolerance,
    /// Projected parameter step fell below xtol
    StepTolerance,
    /// Projected gradient fell below gtol; also covers active bounds
    GradientTolerance,
    /// Iteration cap exhausted without satisfying a tolerance
    MaxIterations,
    /// No downhill step could be found at maximal damping
    Stalled,
}

impl Termination {
    /// Whether this stopping condition counts as convergence
    pub fn converged(&self) -> bool {
        matches!(
            self,
            Termination::CostTolerance | Termination::StepTolerance | Termination::GradientTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            Termination::CostTolerance => "cost tolerance reached",
            Termination::StepTolerance => "step tolerance reached",
            Termination::GradientTolerance => "gradient tolerance reached",
            Termination::MaxIterations => "iteration limit reached",
            Termination::Stalled => "no downhill step found",
        };
        write!(f, "{}", reason)
    }
}

/// The best point a solver found
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Parameters at the minimum, inside the box
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`
    pub cost: f64,
    /// Residual vector at `params`
    pub residuals: Array1<f64>,
    /// Iterations used
    pub iterations: usize,
    /// Stopping condition
    pub termination: Termination,
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.mapv(|r| r.powi(2)).sum()
}

fn check_dimensions(
    model: &dyn ResidualModel,
    initial: &[f64],
    bounds: &Bounds,
) -> Result<(), FitError> {
    let n = model.parameter_count();
    if initial.len() != n {
        return Err(FitError::DimensionMismatch(format!(
            "model has {n} parameters but the initial guess has {}",
            initial.len()
        )));
    }
    if bounds.len() != n {
        return Err(FitError::DimensionMismatch(format!(
            "model has {n} parameters but the bounds constrain {}",
            bounds.len()
        )));
    }
    Ok(())
}

// ============================================================================
// Levenberg-Marquardt
// ============================================================================

const DAMPING_SHRINK: f64 = 0.1;
const DAMPING_GROWTH: f64 = 10.0;
const DAMPING_MIN: f64 = 1e-12;
const DAMPING_MAX: f64 = 1e12;

/// Damped least squares with box projection
///
/// Steps solve `(J'J + lambda * diag(J'J)) * delta = -J' * r` with a
/// forward-difference Jacobian, candidates projected onto the bounds.
/// The damping factor shrinks tenfold on accepted steps and grows tenfold
/// on rejected ones. Convergence is declared on relative cost reduction,
/// projected step size, or the projected gradient norm; the gradient test
/// treats components pressed against an active bound as stationary.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: SolverConfig,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Forward-difference Jacobian of the residual vector
    ///
    /// Steps are flipped or shrunk where the box leaves no room; a parameter
    /// pinned by a zero-width box contributes a zero column.
    fn jacobian(
        &self,
        model: &dyn ResidualModel,
        x: &[f64],
        residuals: &Array1<f64>,
        bounds: &Bounds,
    ) -> Result<DMatrix<f64>, FitError> {
        let m = residuals.len();
        let n = x.len();
        let mut jacobian = DMatrix::zeros(m, n);
        for j in 0..n {
            let h = f64::EPSILON.sqrt() * x[j].abs().max(1.0);
            let mut shifted = x.to_vec();
            shifted[j] = (x[j] + h).clamp(bounds.lower()[j], bounds.upper()[j]);
            if shifted[j] == x[j] {
                shifted[j] = (x[j] - h).clamp(bounds.lower()[j], bounds.upper()[j]);
            }
            let step = shifted[j] - x[j];
            if step == 0.0 {
                continue;
            }
            let shifted_residuals = model.residuals(&shifted)?;
            for i in 0..m {
                jacobian[(i, j)] = (shifted_residuals[i] - residuals[i]) / step;
            }
        }
        Ok(jacobian)
    }
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn minimize(
        &self,
        model: &dyn ResidualModel,
        initial: &[f64],
        bounds: &Bounds,
    ) -> Result<Minimum, FitError> {
        check_dimensions(model, initial, bounds)?;
        let n = model.parameter_count();

        let mut x = bounds.project(initial);
        let mut residuals = model.residuals(&x)?;
        let mut cost = sum_of_squares(&residuals);
        let mut lambda = self.config.initial_damping;
        let mut termination = Termination::MaxIterations;
        let mut iterations = 0;

        'outer: for _ in 0..self.config.max_iterations {
            iterations += 1;

            let jacobian = self.jacobian(model, &x, &residuals, bounds)?;
            let r_vec = DVector::from_iterator(residuals.len(), residuals.iter().copied());
            let jt = jacobian.transpose();
            let jtj = &jt * &jacobian;
            let gradient = &jt * &r_vec;

            // KKT-aware stationarity: components pressed against an active
            // bound only count when they point back into the box.
            let mut projected_gradient = 0.0f64;
            for i in 0..n {
                let at_lower = x[i] <= bounds.lower()[i];
                let at_upper = x[i] >= bounds.upper()[i];
                let component = if at_lower && at_upper {
                    0.0
                } else if at_lower {
                    gradient[i].min(0.0)
                } else if at_upper {
                    gradient[i].max(0.0)
                } else {
                    gradient[i]
                };
                projected_gradient = projected_gradient.max(component.abs());
            }
            if projected_gradient <= self.config.gtol {
                termination = Termination::GradientTolerance;
                break;
            }

            loop {
                let mut damped = jtj.clone();
                for i in 0..n {
                    let diagonal = jtj[(i, i)];
                    let scale = if diagonal > 0.0 { diagonal } else { 1.0 };
                    damped[(i, i)] = diagonal + lambda * scale;
                }

                let delta = match damped.lu().solve(&gradient.scale(-1.0)) {
                    Some(delta) if delta.iter().all(|v| v.is_finite()) => delta,
                    _ => {
                        lambda *= DAMPING_GROWTH;
                        if lambda > DAMPING_MAX {
                            return Err(FitError::SingularNormalEquations);
                        }
                        continue;
                    }
                };

                let candidate: Vec<f64> = (0..n).map(|i| x[i] + delta[i]).collect();
                let candidate = bounds.project(&candidate);
                let step_norm = (0..n)
                    .map(|i| (candidate[i] - x[i]).powi(2))
                    .sum::<f64>()
                    .sqrt();

                let next_residuals = model.residuals(&candidate)?;
                let next_cost = sum_of_squares(&next_residuals);

                if next_cost.is_finite() && next_cost < cost {
                    let reduction = cost - next_cost;
                    x = candidate;
                    residuals = next_residuals;
                    cost = next_cost;
                    lambda = (lambda * DAMPING_SHRINK).max(DAMPING_MIN);
                    tracing::debug!(iteration = iterations, cost, lambda, "step accepted");

                    let x_norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
                    if reduction <= self.config.ftol * cost {
                        termination = Termination::CostTolerance;
                        break 'outer;
                    }
                    if step_norm <= self.config.xtol * (self.config.xtol + x_norm) {
                        termination = Termination::StepTolerance;
                        break 'outer;
                    }
                    break;
                }

                lambda *= DAMPING_GROWTH;
                if lambda > DAMPING_MAX {
                    termination = Termination::Stalled;
                    break 'outer;
                }
            }
        }

        Ok(Minimum {
            params: x,
            cost,
            residuals,
            iterations,
            termination,
        })
    }
}

// ============================================================================
// Nelder-Mead fallback
// ============================================================================

/// Simplex search over the projected sum of squares
///
/// Exists to demonstrate that the [LeastSquaresSolver] seam holds: the
/// backend needs no derivatives and no linear algebra, only cost
/// evaluations. Candidate points are projected onto the bounds inside the
/// cost function, so the simplex itself may roam outside the box. Terminates
/// when the cost spread of the simplex falls below `sd_tolerance`.
#[derive(Debug, Clone)]
pub struct NelderMeadSolver {
    max_iterations: u64,
    sd_tolerance: f64,
}

impl NelderMeadSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive simplex settings from a shared [SolverConfig]
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            max_iterations: config.max_iterations as u64,
            sd_tolerance: config.ftol,
        }
    }
}

impl Default for NelderMeadSolver {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            sd_tolerance: 1e-10,
        }
    }
}

struct ProjectedSumOfSquares<'a> {
    model: &'a dyn ResidualModel,
    bounds: &'a Bounds,
}

impl CostFunction for ProjectedSumOfSquares<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let projected = self.bounds.project(param);
        let residuals = self.model.residuals(&projected)?;
        Ok(sum_of_squares(&residuals))
    }
}

impl LeastSquaresSolver for NelderMeadSolver {
    fn minimize(
        &self,
        model: &dyn ResidualModel,
        initial: &[f64],
        bounds: &Bounds,
    ) -> Result<Minimum, FitError> {
        check_dimensions(model, initial, bounds)?;

        let start = bounds.project(initial);
        let simplex = create_initial_simplex(&start);
        let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(simplex)
            .with_sd_tolerance(self.sd_tolerance)
            .map_err(|e| FitError::Optimizer(e.to_string()))?;

        let cost_function = ProjectedSumOfSquares { model, bounds };
        let res = Executor::new(cost_function, solver)
            .configure(|state| state.max_iters(self.max_iterations))
            .run()
            .map_err(|e| {
                tracing::error!(error = %e, "Nelder-Mead execution failed");
                FitError::Optimizer(e.to_string())
            })?;

        let best = res
            .state
            .best_param
            .clone()
            .ok_or_else(|| FitError::Optimizer("solver returned no parameters".to_string()))?;
        let params = bounds.project(&best);
        let residuals = model.residuals(&params)?;
        let cost = sum_of_squares(&residuals);
        let termination = match res.state.termination_status {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                Termination::CostTolerance
            }
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                Termination::MaxIterations
            }
            _ => Termination::Stalled,
        };

        Ok(Minimum {
            params,
            cost,
            residuals,
            iterations: res.state.iter as usize,
            termination,
        })
    }
}

fn create_initial_simplex(initial_point: &[f64]) -> Vec<Vec<f64>> {
    let num_dimensions = initial_point.len();
    let perturbation_percentage = 0.008;

    let mut vertices = Vec::new();
    vertices.push(initial_point.to_vec());

    for i in 0..num_dimensions {
        let perturbation = if initial_point[i] == 0.0 {
            0.00025
        } else {
            perturbation_percentage * initial_point[i]
        };

        let mut perturbed_point = initial_point.to_owned();
        perturbed_point[i] += perturbation;
        vertices.push(perturbed_point);
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Residuals `design * params - targets`, an exactly solvable system
    struct LinearModel {
        design: Vec<[f64; 2]>,
        targets: Vec<f64>,
    }

    impl LinearModel {
        fn solvable() -> Self {
            Self {
                design: vec![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
                targets: vec![1.0, 2.0, 3.0],
            }
        }
    }

    impl ResidualModel for LinearModel {
        fn residuals(&self, params: &[f64]) -> Result<Array1<f64>, FitError> {
            Ok(Array1::from_iter(
                self.design
                    .iter()
                    .zip(self.targets.iter())
                    .map(|(row, target)| row[0] * params[0] + row[1] * params[1] - target),
            ))
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.targets.len()
        }
    }

    /// One residual `x + 1`, minimized at the infeasible point -1
    struct OffsetModel;

    impl ResidualModel for OffsetModel {
        fn residuals(&self, params: &[f64]) -> Result<Array1<f64>, FitError> {
            Ok(Array1::from_vec(vec![params[0] + 1.0]))
        }

        fn parameter_count(&self) -> usize {
            1
        }

        fn residual_count(&self) -> usize {
            1
        }
    }

    #[test]
    fn lm_solves_a_linear_system() {
        let model = LinearModel::solvable();
        let minimum = LevenbergMarquardt::new()
            .minimize(&model, &[0.5, 0.5], &Bounds::nonnegative(2))
            .unwrap();
        assert!(minimum.termination.converged());
        assert_relative_eq!(minimum.params[0], 1.0, max_relative = 1e-6);
        assert_relative_eq!(minimum.params[1], 2.0, max_relative = 1e-6);
        assert!(minimum.cost < 1e-12);
    }

    #[test]
    fn lm_converges_immediately_at_the_solution() {
        let model = LinearModel::solvable();
        let minimum = LevenbergMarquardt::new()
            .minimize(&model, &[1.0, 2.0], &Bounds::nonnegative(2))
            .unwrap();
        assert_eq!(minimum.termination, Termination::GradientTolerance);
        assert_eq!(minimum.iterations, 1);
    }

    #[test]
    fn lm_pins_an_infeasible_optimum_to_the_bound() {
        let minimum = LevenbergMarquardt::new()
            .minimize(&OffsetModel, &[2.0], &Bounds::nonnegative(1))
            .unwrap();
        assert!(minimum.termination.converged());
        assert_eq!(minimum.params[0], 0.0);
    }

    #[test]
    fn lm_projects_an_infeasible_start() {
        let model = LinearModel::solvable();
        let minimum = LevenbergMarquardt::new()
            .minimize(&model, &[-3.0, -4.0], &Bounds::nonnegative(2))
            .unwrap();
        assert!(minimum.termination.converged());
        assert_relative_eq!(minimum.params[0], 1.0, max_relative = 1e-6);
        assert_relative_eq!(minimum.params[1], 2.0, max_relative = 1e-6);
    }

    #[test]
    fn nelder_mead_solves_the_same_system() {
        let model = LinearModel::solvable();
        let solver = NelderMeadSolver::with_config(SolverConfig {
            max_iterations: 500,
            ..Default::default()
        });
        let minimum = solver
            .minimize(&model, &[0.5, 0.5], &Bounds::nonnegative(2))
            .unwrap();
        assert_relative_eq!(minimum.params[0], 1.0, max_relative = 1e-3);
        assert_relative_eq!(minimum.params[1], 2.0, max_relative = 1e-3);
    }

    #[test]
    fn bounds_validation_rejects_crossed_limits() {
        let err = Bounds::new(vec![0.0, 2.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FitError::InvalidBounds(_)));
    }

    #[test]
    fn bounds_projection_clamps_into_the_box() {
        let bounds = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        assert_eq!(bounds.project(&[-0.5, 2.0]), vec![0.0, 1.0]);
        assert_eq!(bounds.project(&[0.25, 0.5]), vec![0.25, 0.5]);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let model = LinearModel::solvable();
        let err = LevenbergMarquardt::new()
            .minimize(&model, &[0.5], &Bounds::nonnegative(2))
            .unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch(_)));
    }

    #[test]
    fn termination_kinds_classify_convergence() {
        assert!(Termination::CostTolerance.converged());
        assert!(Termination::StepTolerance.converged());
        assert!(Termination::GradientTolerance.converged());
        assert!(!Termination::MaxIterations.converged());
        assert!(!Termination::Stalled.converged());
    }

    #[test]
    fn config_defaults_match_documented_values() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, 200);
        assert_eq!(config.ftol, 1e-10);
        assert_eq!(config.xtol, 1e-10);
        assert_eq!(config.gtol, 1e-10);
        assert_eq!(config.initial_damping, 1e-3);
    }
}
