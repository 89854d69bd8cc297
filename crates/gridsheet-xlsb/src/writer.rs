//! XLSB writer

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::biff12::{ids, Payload, RecordWriter};
use crate::error::{XlsbError, XlsbResult};
use gridsheet_core::{CellValue, Workbook, Worksheet};

/// Default row height in twips (15pt)
const DEFAULT_ROW_HEIGHT: u16 = 300;

/// BIFF error code for `#NUM!`
const ERROR_NUM: u8 = 0x24;

/// XLSB file writer
pub struct XlsbWriter;

impl XlsbWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsbResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Write a workbook to a writer, sheets in workbook order
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsbResult<()> {
        if workbook.is_empty() {
            return Err(XlsbError::InvalidFormat(
                "Workbook must contain at least one worksheet".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types(workbook).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.bin"/>
</Relationships>"#,
        )?;

        zip.start_file("xl/_rels/workbook.bin.rels", options)?;
        zip.write_all(Self::workbook_rels(workbook).as_bytes())?;

        zip.start_file("xl/workbook.bin", options)?;
        zip.write_all(&Self::workbook_bin(workbook)?)?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.bin", i + 1), options)?;
            zip.write_all(&Self::sheet_bin(sheet)?)?;
        }

        zip.finish()?;
        log::debug!("wrote XLSB package with {} sheets", workbook.sheet_count());
        Ok(())
    }

    fn content_types(workbook: &Workbook) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.bin" ContentType="application/vnd.ms-excel.sheet.binary.macroEnabled.main"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.bin" ContentType="application/vnd.ms-excel.worksheet"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");
        content
    }

    fn workbook_rels(workbook: &Workbook) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.bin"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str("\n</Relationships>");
        content
    }

    /// The workbook part: the sheet bundle, in order
    fn workbook_bin(workbook: &Workbook) -> XlsbResult<Vec<u8>> {
        let mut w = RecordWriter::new(Vec::new());
        w.marker(ids::BEGIN_BOOK)?;
        w.marker(ids::BEGIN_BUNDLE_SHS)?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            let tab_id = u32::try_from(i + 1)
                .map_err(|_| XlsbError::InvalidFormat("too many sheets".into()))?;
            let mut p = Payload::new();
            p.u32(0) // visible
                .u32(tab_id)
                .wide_string(&format!("rId{}", tab_id))
                .wide_string(sheet.name());
            w.record(ids::BUNDLE_SH, &p)?;
        }

        w.marker(ids::END_BUNDLE_SHS)?;
        w.marker(ids::END_BOOK)?;
        Ok(w.into_inner())
    }

    /// One worksheet part
    fn sheet_bin(sheet: &Worksheet) -> XlsbResult<Vec<u8>> {
        let mut w = RecordWriter::new(Vec::new());
        w.marker(ids::BEGIN_SHEET)?;

        let mut dim = Payload::new();
        match sheet.used_range() {
            Some(range) => dim
                .u32(range.start.row)
                .u32(range.end.row)
                .u32(range.start.col as u32)
                .u32(range.end.col as u32),
            None => dim.u32(0).u32(0).u32(0).u32(0),
        };
        w.record(ids::WS_DIM, &dim)?;

        w.marker(ids::BEGIN_SHEET_DATA)?;
        for row in sheet.populated_rows() {
            let mut cells = sheet.row_cells(row).peekable();
            let first_col = cells.peek().map_or(0, |(col, _)| *col as u32);
            let last_col = sheet
                .row_cells(row)
                .last()
                .map_or(first_col, |(col, _)| col as u32);

            let mut hdr = Payload::new();
            hdr.u32(row)
                .u32(0) // style
                .u16(DEFAULT_ROW_HEIGHT)
                .u8(0)
                .u8(0)
                .u8(0)
                .u32(1) // one column span
                .u32(first_col)
                .u32(last_col);
            w.record(ids::ROW_HDR, &hdr)?;

            for (col, value) in cells {
                Self::write_cell(&mut w, col as u32, value)?;
            }
        }
        w.marker(ids::END_SHEET_DATA)?;

        w.marker(ids::END_SHEET)?;
        Ok(w.into_inner())
    }

    fn write_cell(w: &mut RecordWriter<Vec<u8>>, col: u32, value: &CellValue) -> XlsbResult<()> {
        let mut p = Payload::new();
        p.u32(col).u32(0);

        let id = match value {
            CellValue::Number(n) if n.is_finite() => {
                p.f64(*n);
                ids::CELL_REAL
            }
            CellValue::Number(n) => {
                log::warn!("writing non-finite number {} in column {} as #NUM!", n, col);
                p.u8(ERROR_NUM);
                ids::CELL_ERROR
            }
            CellValue::Boolean(b) => {
                p.u8(u8::from(*b));
                ids::CELL_BOOL
            }
            CellValue::String(s) => {
                p.wide_string(s.as_str());
                ids::CELL_ST
            }
            CellValue::Empty => return Ok(()),
        };

        w.record(id, &p)?;
        Ok(())
    }
}
