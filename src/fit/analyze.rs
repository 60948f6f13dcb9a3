//! The fitting pipeline

use tracing::{debug, warn};

use crate::data::Dataset;
use crate::fit::diagnostics::{r_squared, rmse};
use crate::fit::error::FitError;
use crate::fit::problem::{response_scale, InhibitionProblem};
use crate::fit::solver::{Bounds, LeastSquaresSolver, LevenbergMarquardt, NelderMeadSolver};
use crate::fit::types::{
    Convergence, FitOptions, FitResult, GoodnessOfFit, Prediction, SolverBackend,
};
use crate::simulator::InhibitionParams;

/// Estimate inhibition parameters for a dataset
///
/// Freezes the response scale from the first observation, minimizes the sum
/// of squared signal residuals over the nonnegative orthant, and packages
/// the fitted parameters with per-row predictions, goodness-of-fit
/// statistics and a convergence report. A solver that stops on its iteration
/// cap still yields the best parameters found; check [Convergence] before
/// trusting them. The objective is non-convex, so a poor starting estimate
/// can settle in a local minimum; retrying from a fresh start is the
/// caller's call.
pub fn fit(dataset: &Dataset, options: &FitOptions) -> Result<FitResult, FitError> {
    let scale = response_scale(dataset)?;
    debug!(scale, observations = dataset.len(), "starting fit");

    let problem = InhibitionProblem::new(dataset, scale);
    let bounds = Bounds::nonnegative(2);
    let solver: Box<dyn LeastSquaresSolver> = match options.solver {
        SolverBackend::LevenbergMarquardt => {
            Box::new(LevenbergMarquardt::with_config(options.config))
        }
        SolverBackend::NelderMead => Box::new(NelderMeadSolver::with_config(options.config)),
    };

    let minimum = solver.minimize(&problem, &options.initial.to_vec(), &bounds)?;
    if !minimum.termination.converged() {
        warn!(
            termination = %minimum.termination,
            iterations = minimum.iterations,
            "fit did not converge"
        );
    }

    let parameters = InhibitionParams::from_slice(&minimum.params);
    let predicted = problem.predict_signals(&parameters);
    let observed = dataset.observed_signals();

    let predictions = dataset
        .observations()
        .iter()
        .zip(predicted.iter())
        .map(|(obs, &pred)| {
            Prediction::new(
                obs.pre_incubation_time(),
                obs.incubation_time(),
                obs.inhibitor_conc(),
                obs.signal(),
                pred,
            )
        })
        .collect();

    let gof = GoodnessOfFit {
        r_squared: r_squared(&observed, &predicted),
        rmse: rmse(&observed, &predicted),
    };
    let convergence = Convergence {
        converged: minimum.termination.converged(),
        termination: minimum.termination,
        iterations: minimum.iterations,
        cost: minimum.cost,
    };

    Ok(FitResult::new(
        parameters,
        scale,
        predictions,
        gof,
        convergence,
    ))
}

/// Fitting entry point hung off [Dataset]
pub trait FitInhibition {
    /// Estimate inhibition parameters; see [fit]
    fn fit_inhibition(&self, options: &FitOptions) -> Result<FitResult, FitError>;
}

impl FitInhibition for Dataset {
    fn fit_inhibition(&self, options: &FitOptions) -> Result<FitResult, FitError> {
        fit(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Assay;
    use crate::simulator::simulate_endpoint;
    use approx::assert_relative_eq;

    fn synthetic_dataset(truth: InhibitionParams) -> Dataset {
        let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
        let pre = 3.0;
        let inc = 60.0;
        let reference = simulate_endpoint(&InhibitionParams::default(), &assay, pre, inc, 0.0);
        let scale = 100.0 / reference;

        let mut builder = Dataset::builder(assay);
        for conc in [0.0, 0.5, 2.0, 8.0] {
            let signal = simulate_endpoint(&truth, &assay, pre, inc, conc) * scale;
            builder = builder.observation(pre, inc, conc, signal);
        }
        builder.build().unwrap()
    }

    #[test]
    fn fit_recovers_parameters_from_noise_free_signals() {
        let truth = InhibitionParams::new(0.8, 2.5);
        let dataset = synthetic_dataset(truth);

        let result = fit(&dataset, &FitOptions::default()).unwrap();
        assert!(result.convergence().converged);
        assert_relative_eq!(result.parameters().kinact(), 0.8, max_relative = 1e-6);
        assert_relative_eq!(result.parameters().ki(), 2.5, max_relative = 1e-6);
        assert!(result.gof().r_squared > 0.999999);
        assert!(result.gof().rmse < 1e-5);
        assert_eq!(result.predictions().len(), dataset.len());
    }

    #[test]
    fn extension_trait_matches_the_free_function() {
        let dataset = synthetic_dataset(InhibitionParams::new(0.8, 2.5));
        let options = FitOptions::default();
        let via_trait = dataset.fit_inhibition(&options).unwrap();
        let via_function = fit(&dataset, &options).unwrap();
        assert_eq!(via_trait, via_function);
    }
}
