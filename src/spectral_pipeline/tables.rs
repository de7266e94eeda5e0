//! Reference table loading module
//!
//! Band axis, matching-function, calibration and filter-response tables are
//! plain delimited text. They are read once per run into immutable values.

mod delimited;
pub mod types;

pub use delimited::{Delimiter, parse_table, read_table};
pub use types::{FilterTable, ReferenceData, ReferenceTables};
