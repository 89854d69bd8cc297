//! Write-then-read tests for delimited text

use gridsheet_core::{CellValue, Worksheet};
use gridsheet_csv::{CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter};
use pretty_assertions::assert_eq;

/// Mixed values survive a write and a read with type detection on
#[test]
fn test_mixed_values_roundtrip() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_value_at(0, 0, "Name").unwrap();
    sheet.set_value_at(0, 1, "Score").unwrap();
    sheet.set_value_at(1, 0, "Ann, B.").unwrap();
    sheet.set_value_at(1, 1, 91.25).unwrap();
    sheet.set_value_at(2, 0, "quote \"here\"").unwrap();
    sheet.set_value_at(2, 1, true).unwrap();
    sheet.set_value_at(4, 3, "after gap").unwrap();

    let mut bytes = Vec::new();
    CsvWriter::write(&sheet, &mut bytes, &CsvWriteOptions::default()).unwrap();
    let back = CsvReader::read_bytes(&bytes, &CsvReadOptions::default()).unwrap();

    assert_eq!(back, sheet);
}

/// A tab-separated file is recognized without configuring the delimiter
#[test]
fn test_tab_separated_is_sniffed() {
    let back = CsvReader::read_bytes(b"a\tb\n1\t2\n", &CsvReadOptions::default()).unwrap();
    assert_eq!(back.value_at(0, 1), CellValue::from("b"));
    assert_eq!(back.value_at(1, 1), CellValue::Number(2.0));
}

/// The sheet name is taken from the options
#[test]
fn test_sheet_name_option() {
    let options = CsvReadOptions {
        sheet_name: "Imported".into(),
        ..Default::default()
    };
    let back = CsvReader::read_bytes(b"x", &options).unwrap();
    assert_eq!(back.name(), "Imported");
}
