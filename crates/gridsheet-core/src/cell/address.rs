//! A1-style cell addresses and ranges

use std::fmt;
use std::str::FromStr;

use crate::column::{column_index, column_label};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// Zero-based position of a cell.
///
/// Displays in A1 form: the column as letters, the row counted from 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse `B7`, `$B$7` or `b7`.
    ///
    /// ```
    /// use gridsheet_core::CellAddress;
    ///
    /// assert_eq!(CellAddress::parse("$C$4").unwrap(), CellAddress::new(3, 2));
    /// assert!(CellAddress::parse("C0").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAddress(s.to_string());

        let text = s.trim().trim_start_matches('$');
        let split = text
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = text.split_at(split);
        let digits = digits.strip_prefix('$').unwrap_or(digits);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let col = Self::letters_to_column(letters)?;
        let row = match digits.parse::<u64>() {
            Ok(0) | Err(_) => return Err(invalid()),
            Ok(n) => n - 1,
        };
        if row >= MAX_ROWS as u64 {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::new(row as u32, col))
    }

    /// Column letters for a column index
    pub fn column_to_letters(col: u16) -> String {
        column_label(col as usize)
    }

    /// Column index for column letters, within the sheet's column limit
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        match column_index(letters) {
            None => Err(Error::InvalidAddress(letters.to_string())),
            Some(col) if col >= MAX_COLS as usize => {
                Err(Error::ColumnOutOfBounds(col as u64, MAX_COLS - 1))
            }
            Some(col) => Ok(col as u16),
        }
    }

    /// The next cell in the same row, clamped at the last column
    pub fn right(self) -> Self {
        Self::new(self.row, self.col.saturating_add(1).min(MAX_COLS - 1))
    }

    pub fn to_a1_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_label(self.col as usize), self.row as u64 + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Rectangular block of cells, corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// The range spanned by two corners, in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    pub fn to_a1_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
