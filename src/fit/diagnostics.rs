//! Goodness-of-fit summaries

use ndarray::Array1;

/// Coefficient of determination between observed and predicted signals
///
/// `1 - SS_res / SS_tot` on the response scale. When the observed signals
/// have no variance the statistic is undefined and NaN is returned; callers
/// should lean on [rmse] for such datasets.
pub fn r_squared(observed: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    let mean = match observed.mean() {
        Some(mean) => mean,
        None => return f64::NAN,
    };
    let ss_res = observed
        .iter()
        .zip(predicted.iter())
        .map(|(obs, pred)| (obs - pred).powi(2))
        .sum::<f64>();
    let ss_tot = observed.iter().map(|obs| (obs - mean).powi(2)).sum::<f64>();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Root-mean-square error between observed and predicted signals
pub fn rmse(observed: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if observed.is_empty() {
        return f64::NAN;
    }
    let ss = observed
        .iter()
        .zip(predicted.iter())
        .map(|(obs, pred)| (obs - pred).powi(2))
        .sum::<f64>();
    (ss / observed.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn perfect_predictions_score_one() {
        let observed = array![1.0, 2.0, 3.0];
        assert_relative_eq!(r_squared(&observed, &observed), 1.0);
        assert_relative_eq!(rmse(&observed, &observed), 0.0);
    }

    #[test]
    fn mean_predictions_score_zero() {
        let observed = array![1.0, 2.0, 3.0];
        let predicted = array![2.0, 2.0, 2.0];
        assert_relative_eq!(r_squared(&observed, &predicted), 0.0);
        assert_relative_eq!(rmse(&observed, &predicted), (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn constant_observations_have_undefined_r_squared() {
        let observed = array![5.0, 5.0, 5.0];
        let predicted = array![5.0, 4.0, 5.0];
        assert!(r_squared(&observed, &predicted).is_nan());
        assert_relative_eq!(rmse(&observed, &predicted), (1.0f64 / 3.0).sqrt());
    }
}
