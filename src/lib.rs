pub mod data;
pub mod error;
pub mod fit;
pub mod simulator;

//extension traits
pub use crate::fit::FitInhibition;

pub use error::KinactError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            read_table, read_table_from, Assay, DataError, Dataset, DatasetBuilder, Observation,
            TableError,
        };
    }
    pub mod fit {
        pub use crate::fit::{
            fit, response_scale, Convergence, FitError, FitOptions, FitResult, GoodnessOfFit,
            Prediction, SolverBackend, SolverConfig, Termination, REFERENCE_SIGNAL,
        };
    }
    pub mod simulator {
        pub use crate::simulator::{
            catalytic_rate, inactivation_rate, protected_inactivation_rate, simulate_endpoint,
            InhibitionParams, ReactionState, PHASE_STEPS,
        };
    }

    //extension traits
    pub use crate::fit::FitInhibition;

    pub use crate::error::KinactError;
}
