//! # gridsheet-xlsx
//!
//! XLSX (Office Open XML) reader and writer for gridsheet.
//!
//! Only cell values travel through this crate: strings, numbers and
//! booleans. Error cells and cached formula results are read as their
//! displayed value.

pub mod error;
pub mod escape;
pub mod reader;
pub mod writer;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
