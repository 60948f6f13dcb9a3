use crate::data::structs::{Assay, DataError, Dataset, Observation};

/// Fluent builder for [Dataset]
///
/// Rows are collected as raw values and validated all at once when
/// [build](DatasetBuilder::build) is called.
///
/// # Examples
///
/// ```
/// use kinact::data::{Assay, Dataset};
///
/// let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
/// let dataset = Dataset::builder(assay)
///     .observation(30.0, 60.0, 0.0, 100.0)
///     .observation(30.0, 60.0, 5.0, 42.0)
///     .build()
///     .unwrap();
/// assert_eq!(dataset.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    assay: Assay,
    rows: Vec<(f64, f64, f64, f64)>,
}

impl DatasetBuilder {
    pub(crate) fn new(assay: Assay) -> Self {
        Self {
            assay,
            rows: Vec::new(),
        }
    }

    pub fn observation(
        mut self,
        pre_incubation_time: f64,
        incubation_time: f64,
        inhibitor_conc: f64,
        signal: f64,
    ) -> Self {
        self.rows
            .push((pre_incubation_time, incubation_time, inhibitor_conc, signal));
        self
    }

    pub fn build(self) -> Result<Dataset, DataError> {
        let observations = self
            .rows
            .into_iter()
            .map(|(pre_t, inc_t, inhibitor, signal)| {
                Observation::new(pre_t, inc_t, inhibitor, signal)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Dataset::new(self.assay, observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assay() -> Assay {
        Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap()
    }

    #[test]
    fn builder_matches_direct_construction() {
        let built = Dataset::builder(sample_assay())
            .observation(30.0, 60.0, 0.0, 100.0)
            .observation(30.0, 60.0, 1.0, 73.0)
            .build()
            .unwrap();

        let direct = Dataset::new(
            sample_assay(),
            vec![
                Observation::new(30.0, 60.0, 0.0, 100.0).unwrap(),
                Observation::new(30.0, 60.0, 1.0, 73.0).unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(built, direct);
    }

    #[test]
    fn builder_surfaces_row_validation_errors() {
        let err = Dataset::builder(sample_assay())
            .observation(30.0, -60.0, 0.0, 100.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::Negative {
                field: "incubation time",
                ..
            }
        ));
    }

    #[test]
    fn builder_rejects_empty_dataset() {
        let err = Dataset::builder(sample_assay()).build().unwrap_err();
        assert_eq!(err, DataError::EmptyDataset);
    }
}
