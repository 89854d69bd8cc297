//! XLSB error types

use thiserror::Error;

/// Result type for XLSB operations
pub type XlsbResult<T> = std::result::Result<T, XlsbError>;

/// Errors that can occur during XLSB reading/writing
#[derive(Debug, Error)]
pub enum XlsbError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error in a relationship part
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSB format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// A record ended before its fields did
    #[error("Truncated record 0x{0:04X}")]
    TruncatedRecord(u32),

    /// Reading was stopped by the caller
    #[error("Reading was interrupted")]
    Interrupted,

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] gridsheet_core::Error),
}
