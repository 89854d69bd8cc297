//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};
use gridsheet_core::Worksheet;

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write a worksheet to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        worksheet: &Worksheet,
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(worksheet, file, options)
    }

    /// Write a worksheet to a writer.
    ///
    /// Rows and columns are written from A1 through the last populated cell,
    /// so a cell's position in the output matches its address.
    pub fn write<W: Write>(
        worksheet: &Worksheet,
        writer: W,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
            LineTerminator::CR => csv::Terminator::Any(b'\r'),
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .flexible(true)
            .from_writer(writer);

        if let (Some(max_row), Some(max_col)) = (worksheet.max_row(), worksheet.max_col()) {
            let mut record = Vec::with_capacity(max_col as usize + 1);
            for row in 0..=max_row {
                record.clear();
                for col in 0..=max_col {
                    record.push(worksheet.value_at(row, col).to_string());
                }
                csv_writer.write_record(&record)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write several worksheets as consecutive blocks.
    ///
    /// Blocks appear in the order given and are separated by one empty line.
    pub fn write_sheets<'a, W, I>(sheets: I, mut writer: W, options: &CsvWriteOptions) -> CsvResult<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Worksheet>,
    {
        for (i, sheet) in sheets.into_iter().enumerate() {
            if i > 0 {
                writer.write_all(options.line_terminator.as_bytes())?;
            }
            Self::write(sheet, &mut writer, options)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsheet_core::CellValue;
    use pretty_assertions::assert_eq;

    fn to_string(sheet: &Worksheet, options: &CsvWriteOptions) -> String {
        let mut out = Vec::new();
        CsvWriter::write(sheet, &mut out, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_keeps_positions() {
        let mut sheet = Worksheet::new("S");
        sheet.set_value_at(1, 2, "x").unwrap();
        sheet.set_value_at(2, 0, 1.5).unwrap();

        assert_eq!(to_string(&sheet, &CsvWriteOptions::default()), ",,\n,,x\n1.5,,\n");
    }

    #[test]
    fn test_write_quotes_and_booleans() {
        let mut sheet = Worksheet::new("S");
        sheet.set_value_at(0, 0, "a,b").unwrap();
        sheet.set_value_at(0, 1, CellValue::Boolean(false)).unwrap();

        assert_eq!(to_string(&sheet, &CsvWriteOptions::default()), "\"a,b\",FALSE\n");
    }

    #[test]
    fn test_empty_sheet_writes_nothing() {
        assert_eq!(to_string(&Worksheet::new("S"), &CsvWriteOptions::default()), "");
    }

    #[test]
    fn test_crlf_and_tab() {
        let mut sheet = Worksheet::new("S");
        sheet.set_value_at(0, 0, "a").unwrap();
        sheet.set_value_at(0, 1, "b").unwrap();
        let options = CsvWriteOptions {
            delimiter: b'\t',
            line_terminator: LineTerminator::CRLF,
            ..Default::default()
        };

        assert_eq!(to_string(&sheet, &options), "a\tb\r\n");
    }

    #[test]
    fn test_write_sheets_separates_blocks() {
        let mut first = Worksheet::new("One");
        first.set_value_at(0, 0, "a").unwrap();
        let mut second = Worksheet::new("Two");
        second.set_value_at(0, 0, "b").unwrap();

        let mut out = Vec::new();
        CsvWriter::write_sheets([&first, &second], &mut out, &CsvWriteOptions::default()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\n\nb\n");
    }
}
