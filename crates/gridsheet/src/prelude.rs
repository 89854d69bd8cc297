//! Prelude module - common imports for gridsheet users
//!
//! ```rust
//! use gridsheet::prelude::*;
//! ```

pub use crate::{
    // Cell and sheet types
    CellValue,
    ColumnDescriptor,
    Grid,
    GridRow,
    Workbook,
    Worksheet,

    // Session
    ExportArtifact,
    ExportFormat,
    Session,
    SessionConfig,
    SessionState,
    SingleSheetPolicy,

    // Errors and diagnostics
    Diagnostic,
    ParseError,
    SessionError,
    SessionResult,

    // Codec seams
    CancellationFlag,
    Parser,
    Serializer,
};
