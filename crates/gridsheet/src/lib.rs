//! # gridsheet
//!
//! A single-user spreadsheet editing session.
//!
//! A [`Session`] reads a file in the background (with a ten second limit),
//! shows one sheet at a time as an editable [`Grid`], writes grid edits back
//! into the workbook when the user switches sheets or exports, and exports
//! the workbook as XLSX, XLSB, CSV or HTML.
//!
//! ## Features
//!
//! - Reads XLSX, XLSB and delimited text, detected from the file contents
//! - Sparse sheet storage with a dense, rectangular editing grid
//! - Parsing on a worker thread with timeout and cancellation
//! - Export of the whole workbook or the active sheet
//! - User-facing diagnostics for every failure
//!
//! ## Example
//!
//! ```rust
//! use gridsheet::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SessionError> {
//! let mut session = Session::new();
//! session.load_file(b"name,qty\nwidget,3\n".to_vec()).await?;
//! assert_eq!(session.sheet_names(), vec!["Sheet1"]);
//!
//! session.set_cell(1, 1, 4)?;
//! let artifact = session.export(ExportFormat::Csv)?;
//! assert_eq!(artifact.file_name, "sheet.csv");
//! assert_eq!(artifact.bytes, b"name,qty\nwidget,4\n");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod export;
pub mod html;
pub mod prelude;
pub mod scheduler;
pub mod session;

pub use codec::{CancellationFlag, DefaultCodec, Parser, Serializer};
pub use config::{SessionConfig, SizeAdvisory, MEBIBYTE};
pub use diagnostic::{Diagnostic, ErrorReport, REPORT_SUBJECT};
pub use error::{
    ExportError, Operation, ParseError, PreconditionError, SessionError, SessionResult,
};
pub use export::{ExportArtifact, ExportFormat, Exporter, SingleSheetPolicy, UnknownFormat};
pub use html::HtmlWriter;
pub use scheduler::{ParseHandle, ParseScheduler, PARSE_TIMEOUT};
pub use session::{Session, SessionState};

// Re-export core types
pub use gridsheet_core::{
    column_label, from_grid, to_grid, CellAddress, CellRange, CellValue, ColumnDescriptor, Grid,
    GridRow, Workbook, Worksheet, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export I/O types
pub use gridsheet_csv::{CsvError, CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter};
pub use gridsheet_xlsb::{XlsbError, XlsbReader, XlsbWriter};
pub use gridsheet_xlsx::{XlsxError, XlsxReader, XlsxWriter};
