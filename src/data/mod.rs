pub mod builder;
pub mod parse_table;
pub mod structs;
pub use builder::DatasetBuilder;
pub use parse_table::{read_table, read_table_from, TableError};
pub use structs::{Assay, DataError, Dataset, Observation};
