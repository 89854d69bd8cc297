//! # gridsheet-core
//!
//! Core data structures for the gridsheet editing session.
//!
//! This crate provides the fundamental types used throughout gridsheet:
//! - [`CellValue`] - A scalar cell value (string, number, boolean or empty)
//! - [`CellAddress`] and [`CellRange`] - Zero-based cell addressing
//! - [`column_label`] - Spreadsheet-style column labels (A, B, ..., Z, AA, ...)
//! - [`Worksheet`] - The durable, sparse form of a sheet
//! - [`Workbook`] - Ordered, uniquely named worksheets
//! - [`Grid`] - The dense, editable view of exactly one sheet
//!
//! ## Example
//!
//! ```rust
//! use gridsheet_core::{from_grid, to_grid, CellValue, Worksheet};
//!
//! let mut sheet = Worksheet::new("Sheet1");
//! sheet.set_value_at(0, 0, "Name").unwrap();
//! sheet.set_value_at(0, 1, 42.0).unwrap();
//!
//! let mut grid = to_grid(&sheet);
//! assert_eq!(grid.column_count(), 2);
//! assert_eq!(grid.columns()[1].label, "B");
//!
//! grid.set_cell(0, 0, CellValue::from("X")).unwrap();
//! let flushed = from_grid("Sheet1", grid.rows(), &grid.column_keys()).unwrap();
//! assert_eq!(flushed.value_at(0, 0), CellValue::from("X"));
//! ```

pub mod cell;
pub mod column;
pub mod error;
pub mod grid;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{CellAddress, CellRange, CellValue, SharedString, StringPool};
pub use column::{column_label, ColumnDescriptor};
pub use error::{Error, Result};
pub use grid::{check_rows, from_grid, to_grid, Grid, GridRow};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
