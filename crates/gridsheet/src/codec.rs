//! The parser and serializer seams, and the codecs behind them
//!
//! A [`Parser`] turns raw file bytes into a [`Workbook`]; a [`Serializer`]
//! turns a workbook into the bytes of one [`ExportFormat`]. The session
//! only talks to these traits. [`DefaultCodec`] implements both on top of
//! the format crates of this workspace.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gridsheet_core::Workbook;
use gridsheet_csv::{CsvError, CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter};
use gridsheet_xlsb::{XlsbError, XlsbReader, XlsbWriter};
use gridsheet_xlsx::{XlsxError, XlsxReader, XlsxWriter};
use tokio::sync::Notify;

use crate::error::{ExportError, ParseError};
use crate::export::ExportFormat;
use crate::html::HtmlWriter;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Shared "stop now" signal between the scheduler and a running parser.
///
/// Clones observe the same flag. Parsers poll
/// [`is_cancelled`](CancellationFlag::is_cancelled); async code can wait on
/// [`cancelled`](CancellationFlag::cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<FlagInner>,
}

#[derive(Debug, Default)]
struct FlagInner {
    set: AtomicBool,
    notify: Notify,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.set.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.set.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is raised
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Produces a workbook from file bytes.
///
/// Runs on a worker thread. Long parses should poll `cancel` and return
/// [`ParseError::Cancelled`] once it is raised; a parser that never polls
/// is abandoned on timeout and its result discarded.
pub trait Parser: Send + Sync + 'static {
    fn parse(&self, bytes: &[u8], cancel: &CancellationFlag) -> Result<Workbook, ParseError>;
}

impl<F> Parser for F
where
    F: Fn(&[u8], &CancellationFlag) -> Result<Workbook, ParseError> + Send + Sync + 'static,
{
    fn parse(&self, bytes: &[u8], cancel: &CancellationFlag) -> Result<Workbook, ParseError> {
        self(bytes, cancel)
    }
}

/// Produces the bytes of one export format from a workbook
pub trait Serializer: Send + Sync {
    fn serialize(&self, workbook: &Workbook, format: ExportFormat) -> Result<Vec<u8>, ExportError>;
}

/// Parser and serializer backed by the CSV, XLSX and XLSB crates
#[derive(Debug, Clone, Default)]
pub struct DefaultCodec {
    csv_read: CsvReadOptions,
    csv_write: CsvWriteOptions,
}

impl DefaultCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these options when reading delimited text
    pub fn with_csv_read_options(mut self, options: CsvReadOptions) -> Self {
        self.csv_read = options;
        self
    }

    /// Use these options when writing delimited text
    pub fn with_csv_write_options(mut self, options: CsvWriteOptions) -> Self {
        self.csv_write = options;
        self
    }

    fn parse_package(&self, bytes: &[u8], cancel: &CancellationFlag) -> Result<Workbook, ParseError> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ParseError::Malformed(format!("Corrupted zip: {e}")))?;
        let has_part = |name: &str| archive.file_names().any(|n| n == name);
        let interrupted = || cancel.is_cancelled();

        if has_part("xl/workbook.bin") {
            tracing::debug!("Reading XLSB package ({} bytes)", bytes.len());
            XlsbReader::read_with_interrupt(Cursor::new(bytes), &interrupted).map_err(|e| match e {
                XlsbError::Interrupted => ParseError::Cancelled,
                other => ParseError::Malformed(other.to_string()),
            })
        } else if has_part("xl/workbook.xml") {
            tracing::debug!("Reading XLSX package ({} bytes)", bytes.len());
            XlsxReader::read_with_interrupt(Cursor::new(bytes), &interrupted).map_err(|e| match e {
                XlsxError::Interrupted => ParseError::Cancelled,
                other => ParseError::Malformed(other.to_string()),
            })
        } else {
            Err(ParseError::Unsupported(
                "ZIP package does not contain a spreadsheet workbook".into(),
            ))
        }
    }

    fn parse_text(&self, bytes: &[u8], cancel: &CancellationFlag) -> Result<Workbook, ParseError> {
        tracing::debug!("Reading delimited text ({} bytes)", bytes.len());
        let interrupted = || cancel.is_cancelled();
        let sheet = CsvReader::read_bytes_with_interrupt(bytes, &self.csv_read, &interrupted)
            .map_err(|e| match e {
                CsvError::Interrupted => ParseError::Cancelled,
                CsvError::Encoding => {
                    ParseError::Malformed("Unsupported file: unrecognised binary content".into())
                }
                other => ParseError::Malformed(other.to_string()),
            })?;

        let mut workbook = Workbook::new();
        workbook
            .add_worksheet(sheet)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;
        Ok(workbook)
    }
}

impl Parser for DefaultCodec {
    fn parse(&self, bytes: &[u8], cancel: &CancellationFlag) -> Result<Workbook, ParseError> {
        if cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        if bytes.is_empty() {
            return Err(ParseError::Malformed("File is empty".into()));
        }
        if bytes.starts_with(ZIP_MAGIC) {
            return self.parse_package(bytes, cancel);
        }
        if bytes.starts_with(OLE_MAGIC) {
            return Err(ParseError::Unsupported(
                "Compound document files (legacy XLS or encrypted workbooks) are not supported".into(),
            ));
        }

        let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if std::str::from_utf8(text).is_err() {
            return Err(ParseError::Malformed(
                "Unsupported file: unrecognised binary content".into(),
            ));
        }
        self.parse_text(bytes, cancel)
    }
}

impl Serializer for DefaultCodec {
    fn serialize(&self, workbook: &Workbook, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ExportFormat::Xlsx => {
                let mut cursor = Cursor::new(Vec::new());
                XlsxWriter::write(workbook, &mut cursor).map_err(serialization_failed)?;
                Ok(cursor.into_inner())
            }
            ExportFormat::Xlsb => {
                let mut cursor = Cursor::new(Vec::new());
                XlsbWriter::write(workbook, &mut cursor).map_err(serialization_failed)?;
                Ok(cursor.into_inner())
            }
            ExportFormat::Csv => {
                let mut out = Vec::new();
                CsvWriter::write_sheets(workbook.worksheets(), &mut out, &self.csv_write)
                    .map_err(serialization_failed)?;
                Ok(out)
            }
            ExportFormat::Html => {
                let mut out = Vec::new();
                HtmlWriter::write_sheets(workbook.worksheets(), &mut out).map_err(serialization_failed)?;
                Ok(out)
            }
        }
    }
}

fn serialization_failed(e: impl std::fmt::Display) -> ExportError {
    ExportError::Serialization(e.to_string())
}
