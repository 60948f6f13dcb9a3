use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when constructing assay data
///
/// All values are validated once, at the boundary. The simulator and the
/// fitter assume they only ever see data that passed these checks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// A field holds NaN or infinity
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// A time or concentration is negative
    #[error("{field} must be nonnegative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A constant that must be strictly positive is zero or negative
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    /// The dataset holds no observations
    #[error("dataset contains no observations")]
    EmptyDataset,
}

fn ensure_finite(field: &'static str, value: f64) -> Result<f64, DataError> {
    if !value.is_finite() {
        return Err(DataError::NonFinite { field, value });
    }
    Ok(value)
}

fn ensure_nonnegative(field: &'static str, value: f64) -> Result<f64, DataError> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(DataError::Negative { field, value });
    }
    Ok(value)
}

fn ensure_positive(field: &'static str, value: f64) -> Result<f64, DataError> {
    ensure_finite(field, value)?;
    if value <= 0.0 {
        return Err(DataError::NonPositive { field, value });
    }
    Ok(value)
}

/// One row of a dose-response table
///
/// An observation records how long the enzyme and inhibitor were
/// pre-incubated, how long the diluted mixture was incubated with substrate,
/// the inhibitor concentration during pre-incubation, and the measured assay
/// signal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pre_incubation_time: f64,
    incubation_time: f64,
    inhibitor_conc: f64,
    signal: f64,
}

impl Observation {
    /// Constructs a validated [Observation]
    ///
    /// Times and the inhibitor concentration must be finite and nonnegative.
    /// The signal must be finite; negative readings are accepted since
    /// instrument noise can dip below zero.
    ///
    /// # Arguments
    ///
    /// * `pre_incubation_time` - Duration of the enzyme-inhibitor pre-incubation
    /// * `incubation_time` - Duration of the substrate incubation after dilution
    /// * `inhibitor_conc` - Inhibitor concentration during pre-incubation
    /// * `signal` - Observed assay signal
    pub fn new(
        pre_incubation_time: f64,
        incubation_time: f64,
        inhibitor_conc: f64,
        signal: f64,
    ) -> Result<Self, DataError> {
        Ok(Self {
            pre_incubation_time: ensure_nonnegative("pre-incubation time", pre_incubation_time)?,
            incubation_time: ensure_nonnegative("incubation time", incubation_time)?,
            inhibitor_conc: ensure_nonnegative("inhibitor concentration", inhibitor_conc)?,
            signal: ensure_finite("signal", signal)?,
        })
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
    pub fn signal(&self) -> f64 {
        self.signal
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "pre-incubation {:.3}, incubation {:.3}, inhibitor {:.4}, signal {:.3}",
            self.pre_incubation_time, self.incubation_time, self.inhibitor_conc, self.signal
        )
    }
}

/// The scalar constants shared by every observation of an assay
///
/// These describe the experimental setup: how much substrate is added at the
/// dilution step, the enzyme concentration during pre-incubation, the
/// catalytic constants of the enzyme, and the two volumes that determine the
/// dilution factor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Assay {
    added_substrate: f64,
    enzyme_conc: f64,
    kcat: f64,
    km: f64,
    pre_incubation_volume: f64,
    incubation_volume: f64,
}

impl Assay {
    /// Constructs a validated [Assay]
    ///
    /// # Arguments
    ///
    /// * `added_substrate` - Substrate concentration added at the dilution step
    /// * `enzyme_conc` - Enzyme concentration during pre-incubation
    /// * `kcat` - Catalytic rate constant
    /// * `km` - Michaelis constant, strictly positive
    /// * `pre_incubation_volume` - Volume of the pre-incubation mixture, strictly positive
    /// * `incubation_volume` - Volume after the dilution step, strictly positive
    pub fn new(
        added_substrate: f64,
        enzyme_conc: f64,
        kcat: f64,
        km: f64,
        pre_incubation_volume: f64,
        incubation_volume: f64,
    ) -> Result<Self, DataError> {
        Ok(Self {
            added_substrate: ensure_nonnegative("added substrate", added_substrate)?,
            enzyme_conc: ensure_nonnegative("enzyme concentration", enzyme_conc)?,
            kcat: ensure_nonnegative("kcat", kcat)?,
            km: ensure_positive("Km", km)?,
            pre_incubation_volume: ensure_positive("pre-incubation volume", pre_incubation_volume)?,
            incubation_volume: ensure_positive("incubation volume", incubation_volume)?,
        })
    }

    /// Substrate concentration added at the dilution step
    pub fn added_substrate(&self) -> f64 {
        self.added_substrate
    }

    /// Enzyme concentration during pre-incubation
    pub fn enzyme_conc(&self) -> f64 {
        self.enzyme_conc
    }

    /// Catalytic rate constant
    pub fn kcat(&self) -> f64 {
        self.kcat
    }

    /// Michaelis constant
    pub fn km(&self) -> f64 {
        self.km
    }

    /// Volume of the pre-incubation mixture
    pub fn pre_incubation_volume(&self) -> f64 {
        self.pre_incubation_volume
    }

    /// Volume after the dilution step
    pub fn incubation_volume(&self) -> f64 {
        self.incubation_volume
    }

    /// Dilution applied to enzyme and inhibitor when substrate is added
    ///
    /// Defined as pre-incubation volume over incubation volume and invariant
    /// for the lifetime of the assay.
    pub fn dilution_factor(&self) -> f64 {
        self.pre_incubation_volume / self.incubation_volume
    }
}

impl fmt::Display for Assay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Assay: substrate {:.3}, enzyme {:.4}, kcat {:.4}, Km {:.3}, dilution factor {:.4}",
            self.added_substrate,
            self.enzyme_conc,
            self.kcat,
            self.km,
            self.dilution_factor()
        )
    }
}

/// A complete dose-response dataset
///
/// [Dataset] pairs the shared [Assay] constants with an ordered sequence of
/// [Observation]s. Row order is not semantically meaningful but is preserved
/// so fitted predictions align with the input table.
///
/// # Examples
///
/// ```
/// use kinact::data::{Assay, Dataset, Observation};
///
/// let assay = Assay::new(10.0, 1.0, 0.5, 5.0, 10.0, 100.0).unwrap();
/// let observations = vec![
///     Observation::new(30.0, 60.0, 0.0, 100.0).unwrap(),
///     Observation::new(30.0, 60.0, 5.0, 42.0).unwrap(),
/// ];
/// let dataset = Dataset::new(assay, observations).unwrap();
/// assert_eq!(dataset.len(), 2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    assay: Assay,
    observations: Vec<Observation>,
}

impl Dataset {
    /// Constructs a new [Dataset] from an assay and its observations
    ///
    /// At least one observation is required; the first observation's timing
    /// defines the zero-inhibitor reference used for signal normalization.
    pub fn new(assay: Assay, observations: Vec<Observation>) -> Result<Self, DataError> {
        if observations.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok(Self {
            assay,
            observations,
        })
    }

    /// Starts a fluent [DatasetBuilder](crate::data::DatasetBuilder)
    pub fn builder(assay: Assay) -> crate::data::DatasetBuilder {
        crate::data::DatasetBuilder::new(assay)
    }

    /// The shared assay constants
    pub fn assay(&self) -> &Assay {
        &self.assay
    }

    /// All observations, in input order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the dataset holds no observations
    ///
    /// Always false for a constructed dataset; present for completeness.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The observed signals as a flat vector, in input order
    pub fn observed_signals(&self) -> Array1<f64> {
        Array1::from_iter(self.observations.iter().map(|obs| obs.signal()))
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Dataset: {} observations", self.observations.len())?;
        writeln!(f, "{}", self.assay)?;
        for observation in &self.observations {
            writeln!(f, "  {}", observation)?;
        }
        Ok(())
    }
}
