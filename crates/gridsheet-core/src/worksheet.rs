//! Worksheet type: the durable, sparse form of a sheet

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely in a row-major `BTreeMap<row, BTreeMap<col, value>>`.
/// Only non-empty values are stored: writing [`CellValue::Empty`] removes the
/// entry, so an absent address and an empty cell are the same thing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl Worksheet {
    /// Create a new, empty worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell value by address string (e.g., "A1")
    pub fn value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.value_at(addr.row, addr.col))
    }

    /// Get a cell value by indices; absent cells are [`CellValue::Empty`]
    pub fn value_at(&self, row: u32, col: u16) -> CellValue {
        self.get(row, col).cloned().unwrap_or_default()
    }

    /// Borrow a stored cell value, if any
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|cells| cells.get(&col))
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    ///
    /// Setting [`CellValue::Empty`] clears the cell.
    pub fn set_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) -> Result<()> {
        validate_cell_position(row, col)?;

        let value = value.into();
        if value.is_empty() {
            self.clear_cell_at(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, value);
        }
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        if let Some(cells) = self.rows.get_mut(&row) {
            cells.remove(&col);
            if cells.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    // === Shape ===

    /// Check if the sheet has no populated cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of populated cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Largest populated row index
    pub fn max_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// Largest populated column index across all rows
    pub fn max_col(&self) -> Option<u16> {
        self.rows
            .values()
            .filter_map(|cells| cells.keys().next_back().copied())
            .max()
    }

    /// Number of populated cells in a row
    pub fn row_len(&self, row: u32) -> usize {
        self.rows.get(&row).map_or(0, BTreeMap::len)
    }

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        let min_row = *self.rows.keys().next()?;
        let max_row = self.max_row()?;
        let min_col = self
            .rows
            .values()
            .filter_map(|cells| cells.keys().next().copied())
            .min()?;
        let max_col = self.max_col()?;
        Some(CellRange::from_indices(min_row, min_col, max_row, max_col))
    }

    // === Iteration ===

    /// Populated cells of one row, in column order
    pub fn row_cells(&self, row: u32) -> impl Iterator<Item = (u16, &CellValue)> + '_ {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cells| cells.iter().map(|(col, value)| (*col, value)))
    }

    /// Indices of rows holding at least one cell, ascending
    pub fn populated_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    /// All populated cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> + '_ {
        self.rows.iter().flat_map(|(row, cells)| {
            cells.iter().map(move |(col, value)| (*row, *col, value))
        })
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row as u64, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col as u64, MAX_COLS - 1));
    }
    Ok(())
}
