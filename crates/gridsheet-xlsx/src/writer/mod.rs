//! XLSX writer
//!
//! Every part is rendered to a string first and then stored in the package,
//! so a failure while rendering never leaves a half-written zip entry.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{XlsxError, XlsxResult};
use crate::escape::{encode_excel_escapes, escape_xml, needs_space_preserve};
use gridsheet_core::{CellAddress, CellValue, Workbook, Worksheet};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const DOC_RELS_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const SHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Smallest stylesheet Excel accepts: one font, the two mandatory fills,
/// one border and the default cell format.
const STYLES_BODY: &str = concat!(
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
);

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        Self::write(workbook, File::create(path)?)
    }

    /// Write a workbook to a writer.
    ///
    /// Sheets are written in workbook order. A workbook without sheets cannot
    /// be represented and is rejected.
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "Workbook must contain at least one worksheet".into(),
            ));
        }

        let mut package = ZipWriter::new(writer);
        put(&mut package, "[Content_Types].xml", &content_types(workbook))?;
        put(&mut package, "_rels/.rels", &package_rels())?;
        put(&mut package, "xl/workbook.xml", &workbook_part(workbook))?;
        put(&mut package, "xl/_rels/workbook.xml.rels", &workbook_rels(workbook))?;
        put(
            &mut package,
            "xl/styles.xml",
            &format!(r#"{DECLARATION}<styleSheet xmlns="{MAIN_NS}">{STYLES_BODY}</styleSheet>"#),
        )?;
        for (n, sheet) in (1..).zip(workbook.worksheets()) {
            put(
                &mut package,
                &format!("xl/worksheets/sheet{n}.xml"),
                &worksheet_part(sheet),
            )?;
        }
        package.finish()?;

        log::debug!("wrote XLSX package with {} sheets", workbook.sheet_count());
        Ok(())
    }
}

fn put<W: Write + Seek>(package: &mut ZipWriter<W>, name: &str, xml: &str) -> XlsxResult<()> {
    package.start_file(name, SimpleFileOptions::default())?;
    package.write_all(xml.as_bytes())?;
    Ok(())
}

fn content_types(workbook: &Workbook) -> String {
    let main = "application/vnd.openxmlformats-officedocument.spreadsheetml";
    let mut xml = format!(
        concat!(
            "{decl}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Override PartName=\"/xl/workbook.xml\" ContentType=\"{main}.sheet.main+xml\"/>",
            "<Override PartName=\"/xl/styles.xml\" ContentType=\"{main}.styles+xml\"/>",
        ),
        decl = DECLARATION,
        main = main,
    );
    for n in 1..=workbook.sheet_count() {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="{SHEET_CONTENT_TYPE}"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels() -> String {
    format!(
        r#"{DECLARATION}<Relationships xmlns="{PACKAGE_RELS_NS}"><Relationship Id="rId1" Type="{DOC_RELS_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook_part(workbook: &Workbook) -> String {
    let sheets: String = (1..)
        .zip(workbook.sheet_names())
        .map(|(n, name)| {
            format!(r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#, escape_xml(name))
        })
        .collect();
    format!(
        r#"{DECLARATION}<workbook xmlns="{MAIN_NS}" xmlns:r="{DOC_RELS_NS}"><sheets>{sheets}</sheets></workbook>"#
    )
}

/// Sheets take `rId1..=rIdN`; the stylesheet follows them.
fn workbook_rels(workbook: &Workbook) -> String {
    let count = workbook.sheet_count();
    let mut xml = format!(r#"{DECLARATION}<Relationships xmlns="{PACKAGE_RELS_NS}">"#);
    for n in 1..=count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{n}" Type="{DOC_RELS_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        );
    }
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="{DOC_RELS_NS}/styles" Target="styles.xml"/></Relationships>"#,
        count + 1
    );
    xml
}

fn worksheet_part(sheet: &Worksheet) -> String {
    let mut xml = format!(r#"{DECLARATION}<worksheet xmlns="{MAIN_NS}">"#);
    if let Some(range) = sheet.used_range() {
        let _ = write!(xml, r#"<dimension ref="{range}"/>"#);
    }
    xml.push_str("<sheetData>");
    for row in sheet.populated_rows() {
        let _ = write!(xml, r#"<row r="{}">"#, row as u64 + 1);
        for (col, value) in sheet.row_cells(row) {
            push_cell(&mut xml, CellAddress::new(row, col), value);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Strings are written inline so the package needs no shared string table.
fn push_cell(xml: &mut String, at: CellAddress, value: &CellValue) {
    let _ = match value {
        CellValue::Empty => Ok(()),
        CellValue::Number(n) if n.is_finite() => write!(xml, r#"<c r="{at}"><v>{n}</v></c>"#),
        CellValue::Number(n) => {
            log::warn!("writing non-finite number {} at {} as #NUM!", n, at);
            write!(xml, r#"<c r="{at}" t="e"><v>#NUM!</v></c>"#)
        }
        CellValue::Boolean(b) => write!(xml, r#"<c r="{at}" t="b"><v>{}</v></c>"#, u8::from(*b)),
        CellValue::String(s) => {
            let space = if needs_space_preserve(s.as_str()) {
                r#" xml:space="preserve""#
            } else {
                ""
            };
            write!(
                xml,
                r#"<c r="{at}" t="inlineStr"><is><t{space}>{}</t></is></c>"#,
                escape_xml(&encode_excel_escapes(s.as_str()))
            )
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn test_empty_workbook_is_rejected() {
        let result = XlsxWriter::write(&Workbook::new(), Cursor::new(Vec::new()));
        assert!(matches!(result, Err(XlsxError::InvalidFormat(_))));
    }

    #[test]
    fn test_sheet_names_are_escaped() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("R&D <2024>").unwrap();

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(&wb, &mut buf).unwrap();

        let xml = part(buf.get_ref(), "xl/workbook.xml");
        assert!(xml.contains(r#"name="R&amp;D &lt;2024&gt;""#));
    }

    #[test]
    fn test_cell_markup() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("S").unwrap();
        let sheet = wb.worksheet_by_name_mut("S").unwrap();
        sheet.set_value_at(0, 0, " a<b ").unwrap();
        sheet.set_value_at(0, 1, true).unwrap();
        sheet.set_value_at(2, 2, 1.5).unwrap();

        let mut buf = Cursor::new(Vec::new());
        XlsxWriter::write(&wb, &mut buf).unwrap();
        let xml = part(buf.get_ref(), "xl/worksheets/sheet1.xml");

        assert!(xml.contains(r#"<dimension ref="A1:C3"/>"#));
        assert!(xml.contains(
            r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve"> a&lt;b </t></is></c>"#
        ));
        assert!(xml.contains(r#"<c r="B1" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<row r="3">"#));
        assert!(xml.contains(r#"<c r="C3"><v>1.5</v></c>"#));
    }
}
