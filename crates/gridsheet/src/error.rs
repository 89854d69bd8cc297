//! Error types for the editing session

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::export::ExportFormat;

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Why a workbook could not be produced from the submitted bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The bytes are not a readable spreadsheet
    #[error("{0}")]
    Malformed(String),

    /// The bytes are a spreadsheet container this reader does not handle
    #[error("{0}")]
    Unsupported(String),

    /// The parser did not finish before the deadline
    #[error("Stopped reading after {} seconds", .after.as_secs())]
    Timeout { after: Duration },

    /// The parse was cancelled before it finished
    #[error("Reading was cancelled")]
    Cancelled,
}

/// Why a workbook could not be serialized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The serializer has no writer for this format
    #[error("Export to {0} is not supported")]
    UnsupportedFormat(ExportFormat),

    /// The writer failed
    #[error("{0}")]
    Serialization(String),
}

/// Session operations, as named in rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadFile,
    SelectSheet,
    EditGrid,
    Export,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::LoadFile => "load file",
            Operation::SelectSheet => "select sheet",
            Operation::EditGrid => "edit grid",
            Operation::Export => "export",
        })
    }
}

/// An operation was requested in a state that does not allow it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Cannot {0} while a file is being read")]
    Busy(Operation),

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("No workbook is loaded")]
    NoWorkbook,

    #[error("No file is being read")]
    NoPendingLoad,

    #[error("A parse is already in flight")]
    SchedulerBusy,
}

/// Errors surfaced at the session boundary
#[derive(Debug, Error)]
pub enum SessionError {
    /// Loading failed; `size` is the length of the submitted file
    #[error("{source}")]
    Parse { source: ParseError, size: usize },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The edited grid could not be written back into its sheet
    #[error("Invalid grid: {0}")]
    Grid(#[from] gridsheet_core::Error),

    /// The parse worker thread could not be started
    #[error("Failed to start parse worker: {0}")]
    Worker(#[from] std::io::Error),
}

impl SessionError {
    /// The parse error behind a failed load, if this is one
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            SessionError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the operation was refused rather than attempted
    pub fn is_precondition(&self) -> bool {
        matches!(self, SessionError::Precondition(_))
    }
}
