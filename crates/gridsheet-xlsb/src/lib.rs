//! # gridsheet-xlsb
//!
//! XLSB reader and writer for gridsheet.
//!
//! An XLSB file is an OPC (ZIP) package like XLSX, but its workbook, sheet
//! and shared-string parts are BIFF12 record streams instead of XML. The
//! package plumbing (content types, relationships) stays XML.

mod biff12;
pub mod error;
pub mod reader;
pub mod writer;

pub use error::{XlsbError, XlsbResult};
pub use reader::XlsbReader;
pub use writer::XlsbWriter;
