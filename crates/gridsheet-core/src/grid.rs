//! The dense, editable grid and its conversion to and from the sparse sheet
//!
//! [`to_grid`] materializes a [`Worksheet`] as rows of cells, [`from_grid`]
//! flushes edited rows back into sparse form. Neither keeps state between
//! calls.

use crate::cell::CellValue;
use crate::column::ColumnDescriptor;
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::{MAX_COLS, MAX_ROWS};

/// One grid row; position `i` holds the cell flushed to column key `i`
pub type GridRow = Vec<CellValue>;

static EMPTY: CellValue = CellValue::Empty;

/// Dense, rectangular view of exactly one sheet.
///
/// `column_count` is fixed when the grid is materialized and only grows
/// through [`set_cell`](Grid::set_cell). Rows shorter than the column count
/// read as having empty trailing cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    rows: Vec<GridRow>,
    column_count: usize,
}

impl Grid {
    /// Build a grid from rows and a column count
    pub fn new(rows: Vec<GridRow>, column_count: usize) -> Self {
        Self { rows, column_count }
    }

    /// The grid rows
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Take the rows out of the grid
    pub fn into_rows(self) -> Vec<GridRow> {
        self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of column descriptors
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Column descriptors `0..column_count`, labelled `A`, `B`, ...
    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        (0..self.column_count).map(ColumnDescriptor::new).collect()
    }

    /// Positional column keys `0..column_count`
    pub fn column_keys(&self) -> Vec<usize> {
        (0..self.column_count).collect()
    }

    /// Cell at `(row, col)`; out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Write one cell, growing the grid if the position lies outside it.
    ///
    /// Positions beyond the sheet limits are rejected before the grid grows.
    pub fn set_cell(&mut self, row: usize, col: usize, value: CellValue) -> Result<()> {
        check_position(row, col)?;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
        self.column_count = self.column_count.max(col + 1);
        Ok(())
    }

    /// Replace every row, keeping the column descriptors
    pub fn replace_rows(&mut self, rows: Vec<GridRow>) {
        self.rows = rows;
    }
}

fn check_position(row: usize, col: usize) -> Result<()> {
    if row >= MAX_ROWS as usize {
        return Err(Error::RowOutOfBounds(row as u64, MAX_ROWS - 1));
    }
    if col >= MAX_COLS as usize {
        return Err(Error::ColumnOutOfBounds(col as u64, MAX_COLS - 1));
    }
    Ok(())
}

/// Check that rows fit the sheet limits, so a later [`from_grid`] with
/// positional keys cannot fail on them. Empty cells past the last column
/// are allowed since they are never stored.
pub fn check_rows(rows: &[GridRow]) -> Result<()> {
    if let Some(last) = rows.len().checked_sub(1) {
        check_position(last, 0)?;
    }
    for cells in rows {
        if let Some(col) = cells
            .iter()
            .enumerate()
            .skip(MAX_COLS as usize)
            .find_map(|(col, value)| (!value.is_empty()).then_some(col))
        {
            return Err(Error::ColumnOutOfBounds(col as u64, MAX_COLS - 1));
        }
    }
    Ok(())
}

/// Materialize a sheet as a dense grid.
///
/// Produces one row per index `0..=max_row`; rows without populated cells
/// are present and empty. Each cell sits at the position of its column index.
/// The column count is the largest number of populated cells found in any
/// single row, which can be smaller than the sheet's widest column index.
/// Every row is padded with empty cells to at least the column count.
pub fn to_grid(sheet: &Worksheet) -> Grid {
    let Some(max_row) = sheet.max_row() else {
        return Grid::default();
    };

    let column_count = sheet
        .populated_rows()
        .map(|row| sheet.row_len(row))
        .max()
        .unwrap_or(0);

    let rows = (0..=max_row)
        .map(|row| {
            let mut cells = vec![CellValue::Empty; column_count];
            for (col, value) in sheet.row_cells(row) {
                let col = col as usize;
                if cells.len() <= col {
                    cells.resize(col + 1, CellValue::Empty);
                }
                cells[col] = value.clone();
            }
            cells
        })
        .collect();

    Grid::new(rows, column_count)
}

/// Rebuild a sparse sheet from grid rows.
///
/// `column_keys[i]` is the column index cells at position `i` are written
/// to; positions past the end of `column_keys` keep their own index.
/// Cells holding [`CellValue::Empty`] are omitted; every other value,
/// including the empty string, is stored.
pub fn from_grid(name: &str, rows: &[GridRow], column_keys: &[usize]) -> Result<Worksheet> {
    let mut sheet = Worksheet::new(name);

    for (row_idx, cells) in rows.iter().enumerate() {
        let row = u32::try_from(row_idx)
            .ok()
            .filter(|row| *row < MAX_ROWS)
            .ok_or(Error::RowOutOfBounds(row_idx as u64, MAX_ROWS - 1))?;

        for (pos, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let key = column_keys.get(pos).copied().unwrap_or(pos);
            let col = u16::try_from(key)
                .ok()
                .filter(|col| *col < MAX_COLS)
                .ok_or(Error::ColumnOutOfBounds(key as u64, MAX_COLS - 1))?;
            sheet.set_value_at(row, col, value.clone())?;
        }
    }

    Ok(sheet)
}
