//! Error types for gridsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the data model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Text that is not an A1 address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Row index and the largest allowed row
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u64, u32),

    /// Column index and the largest allowed column
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u64, u16),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Names are compared case-insensitively
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),
}
