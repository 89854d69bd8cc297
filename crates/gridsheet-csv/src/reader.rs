//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;
use gridsheet_core::{CellValue, StringPool, Worksheet, MAX_ROWS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Records read between two interrupt checks
const INTERRUPT_CHECK_ROWS: u64 = 256;

/// Delimiters tried by [`sniff_delimiter`], in tie-break order
const CANDIDATES: [u8; 3] = [b',', b'\t', b';'];

/// CSV file reader
pub struct CsvReader;

impl CsvReader {
    /// Read CSV file into a worksheet
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<Worksheet> {
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a worksheet
    pub fn read<R: Read>(mut reader: R, options: &CsvReadOptions) -> CsvResult<Worksheet> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::read_bytes(&bytes, options)
    }

    /// Read CSV from an in-memory buffer into a worksheet.
    ///
    /// The buffer must be UTF-8; a leading byte-order mark is skipped.
    /// Blank lines become blank rows, so row indices follow line order.
    pub fn read_bytes(bytes: &[u8], options: &CsvReadOptions) -> CsvResult<Worksheet> {
        Self::read_bytes_with_interrupt(bytes, options, &|| false)
    }

    /// Like [`read_bytes`](CsvReader::read_bytes), polling `interrupted`
    /// before the first record and then every few hundred records.
    ///
    /// Returns [`CsvError::Interrupted`] as soon as the callback reports `true`.
    pub fn read_bytes_with_interrupt(
        bytes: &[u8],
        options: &CsvReadOptions,
        interrupted: &dyn Fn() -> bool,
    ) -> CsvResult<Worksheet> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|_| CsvError::Encoding)?;
        let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(text));

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(options.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut worksheet = Worksheet::new(options.sheet_name.as_str());
        let mut pool = StringPool::new();
        let mut record = csv::StringRecord::new();
        let mut row: u64 = 0;
        let mut records: u64 = 0;
        let mut expected_line = csv_reader.position().line();

        loop {
            if records % INTERRUPT_CHECK_ROWS == 0 && interrupted() {
                return Err(CsvError::Interrupted);
            }
            if !csv_reader.read_record(&mut record)? {
                break;
            }
            records += 1;

            // The csv crate skips blank lines; put them back as blank rows
            let start_line = record.position().map_or(expected_line, |p| p.line());
            row += start_line.saturating_sub(expected_line);

            let row_idx = u32::try_from(row)
                .ok()
                .filter(|r| *r < MAX_ROWS)
                .ok_or(gridsheet_core::Error::RowOutOfBounds(row, MAX_ROWS - 1))?;

            for (col, field) in record.iter().enumerate() {
                let value = if options.auto_detect_types {
                    Self::detect_type(field, &mut pool)
                } else if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::String(pool.intern(field))
                };
                if value.is_empty() {
                    continue;
                }
                let col = u16::try_from(col).map_err(|_| {
                    gridsheet_core::Error::ColumnOutOfBounds(col as u64, gridsheet_core::MAX_COLS - 1)
                })?;
                worksheet.set_value_at(row_idx, col, value)?;
            }

            row += 1;
            expected_line = csv_reader.position().line();
        }

        log::debug!(
            "read {} rows from delimited text (delimiter {:?})",
            row,
            delimiter as char
        );
        Ok(worksheet)
    }

    /// Detect the type of a field value
    fn detect_type(field: &str, pool: &mut StringPool) -> CellValue {
        if field.is_empty() {
            return CellValue::Empty;
        }

        let trimmed = field.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Boolean(false);
        }

        // `f64::from_str` also accepts "inf" and "NaN"; those stay text
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }

        CellValue::String(pool.intern(field))
    }
}

/// Guess the field delimiter from the first non-blank line.
///
/// Counts commas, tabs and semicolons outside double quotes and picks the
/// most frequent; comma wins ties and is the answer when none occur.
pub fn sniff_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|l| !l.trim().is_empty()) else {
        return b',';
    };

    let mut counts = [0usize; CANDIDATES.len()];
    let mut quoted = false;
    for b in line.bytes() {
        if b == b'"' {
            quoted = !quoted;
        } else if !quoted {
            if let Some(i) = CANDIDATES.iter().position(|c| *c == b) {
                counts[i] += 1;
            }
        }
    }

    let mut best = 0;
    for i in 1..CANDIDATES.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    CANDIDATES[best]
}
