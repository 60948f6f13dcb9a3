use thiserror::Error;

use crate::data::{DataError, TableError};
use crate::fit::FitError;

#[derive(Error, Debug)]
pub enum KinactError {
    #[error("Data error: {0}")]
    DataError(#[from] DataError),
    #[error("Error reading the observation table: {0}")]
    TableError(#[from] TableError),
    #[error("Error during fitting: {0}")]
    FitError(#[from] FitError),
}
