//! Response-scale normalization and the least-squares problem
//!
//! Observed signals are instrument responses, not concentrations. The
//! uninhibited reference condition is pinned to [REFERENCE_SIGNAL], which
//! fixes a single multiplier from simulated product to the response scale;
//! every predicted signal is the simulated endpoint times that multiplier.

use ndarray::Array1;

use crate::data::Dataset;
use crate::fit::error::FitError;
use crate::fit::solver::ResidualModel;
use crate::simulator::{simulate_endpoint, InhibitionParams};

/// Signal assigned to the uninhibited reference condition
pub const REFERENCE_SIGNAL: f64 = 100.0;

/// Multiplier mapping simulated product onto the response scale
///
/// The reference condition reuses the first observation's timings with the
/// inhibitor concentration forced to zero. Without inhibitor the simulated
/// product does not depend on the candidate parameters, so placeholder
/// parameters fix the scale once, before any fitting.
pub fn response_scale(dataset: &Dataset) -> Result<f64, FitError> {
    // Dataset construction rejects empty observation lists.
    let reference = &dataset.observations()[0];
    let product = simulate_endpoint(
        &InhibitionParams::default(),
        dataset.assay(),
        reference.pre_incubation_time(),
        reference.incubation_time(),
        0.0,
    );
    if !product.is_finite() || product <= 0.0 {
        return Err(FitError::ZeroReferenceSignal {
            added_substrate: dataset.assay().added_substrate(),
            incubation_time: reference.incubation_time(),
        });
    }
    Ok(REFERENCE_SIGNAL / product)
}

/// The least-squares problem a solver minimizes
///
/// Couples a dataset to a fixed response scale and exposes the residual
/// vector `observed - predicted` through [ResidualModel].
#[derive(Debug, Clone)]
pub struct InhibitionProblem<'a> {
    dataset: &'a Dataset,
    scale: f64,
}

impl<'a> InhibitionProblem<'a> {
    pub fn new(dataset: &'a Dataset, scale: f64) -> Self {
        Self { dataset, scale }
    }

    /// The response-scale multiplier this problem was built with
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Predicted signal for every observation, in dataset order
    pub fn predict_signals(&self, params: &InhibitionParams) -> Array1<f64> {
        Array1::from_iter(self.dataset.observations().iter().map(|obs| {
            simulate_endpoint(
                params,
                self.dataset.assay(),
                obs.pre_incubation_time(),
                obs.incubation_time(),
                obs.inhibitor_conc(),
            ) * self.scale
        }))
    }
}

impl ResidualModel for InhibitionProblem<'_> {
    fn residuals(&self, params: &[f64]) -> Result<Array1<f64>, FitError> {
        if params.len() != self.parameter_count() {
            return Err(FitError::DimensionMismatch(format!(
                "expected {} parameters, got {}",
                self.parameter_count(),
                params.len()
            )));
        }
        let params = InhibitionParams::from_slice(params);
        let predicted = self.predict_signals(&params);
        Ok(self.dataset.observed_signals() - predicted)
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.dataset.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Assay, Dataset};
    use approx::assert_relative_eq;

    fn reference_assay() -> Assay {
        Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap()
    }

    fn scenario_dataset() -> Dataset {
        Dataset::builder(reference_assay())
            .observation(30.0, 60.0, 0.0, 100.0)
            .observation(30.0, 60.0, 5.0, 42.0)
            .build()
            .unwrap()
    }

    #[test]
    fn reference_condition_maps_to_the_reference_signal() {
        let dataset = scenario_dataset();
        let scale = response_scale(&dataset).unwrap();
        let problem = InhibitionProblem::new(&dataset, scale);

        // The zero-inhibitor prediction hits the reference signal no matter
        // which candidate parameters are in play.
        let predicted = problem.predict_signals(&InhibitionParams::new(0.37, 4.2));
        assert_relative_eq!(predicted[0], REFERENCE_SIGNAL, epsilon = 1e-9);
        let predicted = problem.predict_signals(&InhibitionParams::new(3.0, 0.05));
        assert_relative_eq!(predicted[0], REFERENCE_SIGNAL, epsilon = 1e-9);
    }

    #[test]
    fn residuals_subtract_predictions_from_observations() {
        let dataset = scenario_dataset();
        let scale = response_scale(&dataset).unwrap();
        let problem = InhibitionProblem::new(&dataset, scale);

        let residuals = problem.residuals(&[0.37, 4.2]).unwrap();
        let predicted = problem.predict_signals(&InhibitionParams::new(0.37, 4.2));
        assert_relative_eq!(residuals[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(residuals[1], 42.0 - predicted[1], epsilon = 1e-12);
        assert_eq!(problem.residual_count(), 2);
        assert_eq!(problem.parameter_count(), 2);
    }

    #[test]
    fn zero_added_substrate_has_no_reference_signal() {
        let assay = Assay::new(0.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
        let dataset = Dataset::builder(assay)
            .observation(30.0, 60.0, 0.0, 0.0)
            .build()
            .unwrap();
        let err = response_scale(&dataset).unwrap_err();
        assert!(matches!(err, FitError::ZeroReferenceSignal { .. }));
    }

    #[test]
    fn zero_incubation_time_has_no_reference_signal() {
        let dataset = Dataset::builder(reference_assay())
            .observation(30.0, 0.0, 0.0, 0.0)
            .build()
            .unwrap();
        let err = response_scale(&dataset).unwrap_err();
        assert!(matches!(err, FitError::ZeroReferenceSignal { .. }));
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        let dataset = scenario_dataset();
        let problem = InhibitionProblem::new(&dataset, 1.0);
        let err = problem.residuals(&[1.0]).unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch(_)));
    }
}
