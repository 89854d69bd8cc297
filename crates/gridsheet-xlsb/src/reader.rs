//! XLSB reader

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::biff12::{error_literal, ids, Record, Records};
use crate::error::{XlsbError, XlsbResult};
use gridsheet_core::{CellValue, SharedString, StringPool, Workbook, Worksheet, MAX_COLS};

const WORKBOOK_PART: &str = "xl/workbook.bin";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.bin.rels";

/// Rows read between two interrupt checks
const INTERRUPT_CHECK_ROWS: u32 = 256;

/// One entry of a relationships part
#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

impl Relationship {
    /// Package path of the target, which is relative to `xl/`
    fn part_path(&self) -> String {
        match self.target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", self.target.replace('\\', "/")),
        }
    }
}

/// XLSB file reader
pub struct XlsbReader;

impl XlsbReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsbResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsbResult<Workbook> {
        Self::read_with_interrupt(reader, &|| false)
    }

    /// Read a workbook, polling `interrupted` between parts and rows.
    ///
    /// Returns [`XlsbError::Interrupted`] as soon as the callback reports `true`.
    pub fn read_with_interrupt<R: Read + Seek>(
        reader: R,
        interrupted: &dyn Fn() -> bool,
    ) -> XlsbResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        let rels = Self::read_rels(&mut archive, WORKBOOK_RELS_PART)?;
        let workbook_bin = read_part(&mut archive, WORKBOOK_PART)?
            .ok_or_else(|| XlsbError::MissingPart(WORKBOOK_PART.into()))?;

        let mut pool = StringPool::new();
        let shared_strings = match rels.iter().find(|r| r.rel_type.ends_with("/sharedStrings")) {
            Some(rel) => {
                let path = rel.part_path();
                let bytes = read_part(&mut archive, &path)?
                    .ok_or_else(|| XlsbError::MissingPart(path.clone()))?;
                Self::parse_shared_strings(&bytes, &mut pool)?
            }
            None => Vec::new(),
        };

        let mut workbook = Workbook::new();
        for (name, rel_id) in Self::parse_sheet_bundle(&workbook_bin)? {
            if interrupted() {
                return Err(XlsbError::Interrupted);
            }

            let Some(rel) = rels.iter().find(|r| r.id == rel_id) else {
                log::warn!("sheet '{}' has no relationship {}, skipping", name, rel_id);
                continue;
            };
            let path = rel.part_path();
            let bytes = read_part(&mut archive, &path)?
                .ok_or_else(|| XlsbError::MissingPart(path.clone()))?;

            let mut worksheet = Worksheet::new(name.as_str());
            Self::parse_sheet(&bytes, &mut worksheet, &shared_strings, &mut pool, interrupted)?;
            log::debug!("read sheet '{}' from {} ({} cells)", name, path, worksheet.cell_count());
            workbook.add_worksheet(worksheet)?;
        }

        if workbook.is_empty() {
            return Err(XlsbError::InvalidFormat("Workbook contains no worksheets".into()));
        }

        Ok(workbook)
    }

    /// Read a relationships part
    fn read_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
    ) -> XlsbResult<Vec<Relationship>> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsbError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => id = Some(value),
                            b"Target" => target = Some(value),
                            b"Type" => rel_type = Some(value),
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        rels.push(Relationship { id, rel_type, target });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsbError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Sheet names and relationship ids from the workbook part, in order
    fn parse_sheet_bundle(bytes: &[u8]) -> XlsbResult<Vec<(String, String)>> {
        let mut sheets = Vec::new();

        for record in Records::new(bytes) {
            let mut record = record?;
            match record.id {
                ids::BUNDLE_SH => {
                    record.skip(4)?; // visibility
                    let _tab_id = record.u32()?;
                    let rel_id = record.nullable_wide_string()?;
                    let name = record.wide_string()?;
                    match rel_id {
                        Some(rel_id) => sheets.push((name, rel_id)),
                        None => log::warn!("sheet '{}' has no part, skipping", name),
                    }
                }
                ids::END_BUNDLE_SHS => break,
                _ => {}
            }
        }

        Ok(sheets)
    }

    fn parse_shared_strings(bytes: &[u8], pool: &mut StringPool) -> XlsbResult<Vec<SharedString>> {
        let mut strings = Vec::new();

        for record in Records::new(bytes) {
            let mut record = record?;
            match record.id {
                ids::BEGIN_SST => {
                    // cstTotal, then cstUnique
                    record.skip(4)?;
                    let unique = record.u32()? as usize;
                    strings.reserve(unique.min(1 << 16));
                }
                ids::SST_ITEM => {
                    // Rich text runs and phonetic data follow the plain text
                    record.skip(1)?;
                    strings.push(pool.intern(record.wide_string()?));
                }
                ids::END_SST => break,
                _ => {}
            }
        }

        log::debug!("read {} shared strings", strings.len());
        Ok(strings)
    }

    fn parse_sheet(
        bytes: &[u8],
        worksheet: &mut Worksheet,
        shared_strings: &[SharedString],
        pool: &mut StringPool,
        interrupted: &dyn Fn() -> bool,
    ) -> XlsbResult<()> {
        let mut in_sheet_data = false;
        let mut current_row = 0u32;
        let mut rows_seen = 0u32;

        for record in Records::new(bytes) {
            let mut record = record?;
            match record.id {
                ids::BEGIN_SHEET_DATA => in_sheet_data = true,
                ids::END_SHEET_DATA => break,
                ids::ROW_HDR if in_sheet_data => {
                    rows_seen += 1;
                    if rows_seen % INTERRUPT_CHECK_ROWS == 0 && interrupted() {
                        return Err(XlsbError::Interrupted);
                    }
                    current_row = record.u32()?;
                }
                ids::CELL_BLANK
                | ids::CELL_RK
                | ids::CELL_ERROR
                | ids::CELL_BOOL
                | ids::CELL_REAL
                | ids::CELL_ST
                | ids::CELL_ISST
                | ids::FMLA_STRING
                | ids::FMLA_NUM
                | ids::FMLA_BOOL
                | ids::FMLA_ERROR
                    if in_sheet_data =>
                {
                    let col = record.u32()?;
                    let _style = record.u32()?;
                    let value = Self::cell_value(&mut record, shared_strings, pool)?;

                    let col = u16::try_from(col)
                        .ok()
                        .filter(|c| *c < MAX_COLS)
                        .ok_or(gridsheet_core::Error::ColumnOutOfBounds(col as u64, MAX_COLS - 1))?;
                    worksheet.set_value_at(current_row, col, value)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Value of a cell record, positioned after the column and style fields
    fn cell_value(
        record: &mut Record<'_>,
        shared_strings: &[SharedString],
        pool: &mut StringPool,
    ) -> XlsbResult<CellValue> {
        let value = match record.id {
            ids::CELL_BLANK => CellValue::Empty,
            ids::CELL_RK => CellValue::Number(record.rk()?),
            ids::CELL_REAL | ids::FMLA_NUM => CellValue::Number(record.f64()?),
            ids::CELL_BOOL | ids::FMLA_BOOL => CellValue::Boolean(record.u8()? != 0),
            ids::CELL_ERROR | ids::FMLA_ERROR => {
                CellValue::String(pool.intern(error_literal(record.u8()?)))
            }
            ids::CELL_ST | ids::FMLA_STRING => CellValue::String(pool.intern(record.wide_string()?)),
            ids::CELL_ISST => {
                let idx = record.u32()? as usize;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsbError::InvalidFormat(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }
            other => {
                log::warn!("unexpected cell record 0x{:04X}", other);
                CellValue::Empty
            }
        };
        Ok(value)
    }
}

/// Whole content of a package part, `None` when the part is absent
fn read_part<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
) -> XlsbResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biff12::{Payload, RecordWriter};

    fn cell(id: u32, col: u32, value: &dyn Fn(&mut Payload)) -> (u32, Payload) {
        let mut p = Payload::new();
        p.u32(col).u32(0);
        value(&mut p);
        (id, p)
    }

    fn stream(records: &[(u32, Payload)]) -> Vec<u8> {
        let mut w = RecordWriter::new(Vec::new());
        for (id, p) in records {
            w.record(*id, p).unwrap();
        }
        w.into_inner()
    }

    #[test]
    fn test_parse_sheet_cell_kinds() {
        let mut row0 = Payload::new();
        row0.u32(0);
        let mut row2 = Payload::new();
        row2.u32(2);

        let bytes = stream(&[
            (ids::BEGIN_SHEET, Payload::new()),
            (ids::BEGIN_SHEET_DATA, Payload::new()),
            (ids::ROW_HDR, row0),
            cell(ids::CELL_RK, 0, &|p| {
                p.u32((12 << 2) | 0x02);
            }),
            cell(ids::CELL_ISST, 1, &|p| {
                p.u32(1);
            }),
            cell(ids::CELL_ERROR, 2, &|p| {
                p.u8(0x07);
            }),
            cell(ids::CELL_BLANK, 3, &|_| {}),
            (ids::ROW_HDR, row2),
            cell(ids::FMLA_NUM, 5, &|p| {
                p.f64(0.5).u16(0).u32(0);
            }),
            cell(ids::FMLA_STRING, 6, &|p| {
                p.wide_string("cached").u16(0).u32(0);
            }),
            (ids::END_SHEET_DATA, Payload::new()),
        ]);

        let mut pool = StringPool::new();
        let shared = vec![pool.intern("zero"), pool.intern("one")];
        let mut sheet = Worksheet::new("S");
        XlsbReader::parse_sheet(&bytes, &mut sheet, &shared, &mut pool, &|| false).unwrap();

        assert_eq!(sheet.value_at(0, 0), CellValue::Number(12.0));
        assert_eq!(sheet.value_at(0, 1), CellValue::from("one"));
        assert_eq!(sheet.value_at(0, 2), CellValue::from("#DIV/0!"));
        assert_eq!(sheet.value_at(2, 5), CellValue::Number(0.5));
        assert_eq!(sheet.value_at(2, 6), CellValue::from("cached"));
        assert_eq!(sheet.cell_count(), 5);
    }

    #[test]
    fn test_bad_shared_string_index() {
        let bytes = stream(&[
            (ids::BEGIN_SHEET_DATA, Payload::new()),
            cell(ids::CELL_ISST, 0, &|p| {
                p.u32(9);
            }),
        ]);
        let mut pool = StringPool::new();
        let mut sheet = Worksheet::new("S");
        let result = XlsbReader::parse_sheet(&bytes, &mut sheet, &[], &mut pool, &|| false);
        assert!(matches!(result, Err(XlsbError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_shared_strings() {
        let mut a = Payload::new();
        a.u8(0).wide_string("alpha");
        let mut b = Payload::new();
        b.u8(1).wide_string("beta").u32(0);
        let mut header = Payload::new();
        header.u32(3).u32(2);
        let bytes = stream(&[
            (ids::BEGIN_SST, header),
            (ids::SST_ITEM, a),
            (ids::SST_ITEM, b),
            (ids::END_SST, Payload::new()),
        ]);

        let mut pool = StringPool::new();
        let strings = XlsbReader::parse_shared_strings(&bytes, &mut pool).unwrap();
        let strings: Vec<_> = strings.iter().map(|s| s.as_str()).collect();
        assert_eq!(strings, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_part_paths() {
        let rel = |target: &str| Relationship {
            id: "rId1".into(),
            rel_type: String::new(),
            target: target.into(),
        };
        assert_eq!(rel("worksheets/sheet1.bin").part_path(), "xl/worksheets/sheet1.bin");
        assert_eq!(rel("/xl/worksheets/a.bin").part_path(), "xl/worksheets/a.bin");
    }

    #[test]
    fn test_read_part() {
        use std::io::{Cursor, Write};

        let content = vec![7u8; 70_000];
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("xl/workbook.bin", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(&content).unwrap();
            zip.finish().unwrap();
        }

        let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        assert_eq!(read_part(&mut archive, "xl/workbook.bin").unwrap(), Some(content));
        assert_eq!(read_part(&mut archive, "xl/styles.bin").unwrap(), None);
    }
}
