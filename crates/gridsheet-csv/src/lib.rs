//! # gridsheet-csv
//!
//! Delimited-text (CSV/TSV) reader and writer for gridsheet.

mod error;
mod options;
mod reader;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, CsvWriteOptions, LineTerminator};
pub use reader::{sniff_delimiter, CsvReader};
pub use writer::CsvWriter;
