//! XLSX reader
//!
//! Parts are pulled out of the package whole and scanned with quick-xml.
//! Only cell values are kept; styles, formulas and drawings are skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::escape::decode_excel_escapes;
use gridsheet_core::{CellAddress, CellValue, SharedString, StringPool, Workbook, Worksheet};

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Rows read between two interrupt checks
const INTERRUPT_CHECK_ROWS: u32 = 256;

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        Self::read(File::open(path)?)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        Self::read_with_interrupt(reader, &|| false)
    }

    /// Read a workbook, polling `interrupted` between parts and rows.
    ///
    /// Returns [`XlsxError::Interrupted`] as soon as the callback reports `true`.
    pub fn read_with_interrupt<R: Read + Seek>(
        reader: R,
        interrupted: &dyn Fn() -> bool,
    ) -> XlsxResult<Workbook> {
        let mut archive = ZipArchive::new(reader)?;
        if !archive.file_names().any(|name| name == CONTENT_TYPES_PART) {
            return Err(XlsxError::InvalidFormat(format!("Missing {CONTENT_TYPES_PART}")));
        }

        let mut pool = StringPool::new();
        let shared = match part_bytes(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => shared_strings(&xml, &mut pool)?,
            None => Vec::new(),
        };
        let targets = worksheet_targets(&mut archive)?;

        let mut workbook = Workbook::new();
        for (name, id) in sheet_entries(&mut archive)? {
            if interrupted() {
                return Err(XlsxError::Interrupted);
            }
            let Some(path) = targets.get(&id) else {
                log::warn!("sheet '{}' has no worksheet relationship {}, skipping", name, id);
                continue;
            };

            let xml = required_part(&mut archive, path)?;
            let mut worksheet = Worksheet::new(name);
            read_cells(&xml, &mut worksheet, &shared, &mut pool, interrupted)?;
            log::debug!(
                "read sheet '{}' from {} ({} cells)",
                worksheet.name(),
                path,
                worksheet.cell_count()
            );
            workbook.add_worksheet(worksheet)?;
        }

        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat("Workbook contains no worksheets".into()));
        }
        Ok(workbook)
    }
}

/// Contents of a package part, `None` when the package lacks it
fn part_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> XlsxResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn required_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> XlsxResult<Vec<u8>> {
    part_bytes(archive, name)?.ok_or_else(|| XlsxError::MissingPart(name.to_string()))
}

/// Call `visit` for every start or empty element named `element`, ignoring
/// any namespace prefix
fn each_element(
    xml: &[u8],
    element: &[u8],
    mut visit: impl FnMut(&BytesStart) -> XlsxResult<()>,
) -> XlsxResult<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == element => visit(&e)?,
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

/// Sheet names and relationship ids, in workbook order
fn sheet_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<(String, String)>> {
    let xml = required_part(archive, WORKBOOK_PART)?;
    let mut sheets = Vec::new();
    each_element(&xml, b"sheet", |e| {
        match (attribute(e, b"name")?, attribute(e, b"r:id")?) {
            (Some(name), Some(id)) => sheets.push((name, id)),
            _ => log::warn!("skipping <sheet> without name or r:id"),
        }
        Ok(())
    })?;
    Ok(sheets)
}

/// Worksheet part paths keyed by relationship id
fn worksheet_targets<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> XlsxResult<HashMap<String, String>> {
    let xml = required_part(archive, WORKBOOK_RELS_PART)?;
    let mut targets = HashMap::new();
    each_element(&xml, b"Relationship", |e| {
        let is_sheet = attribute(e, b"Type")?.is_some_and(|t| t.ends_with("/worksheet"));
        if let (true, Some(id), Some(target)) = (is_sheet, attribute(e, b"Id")?, attribute(e, b"Target")?) {
            // Relative targets resolve against xl/
            let path = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{target}"),
            };
            targets.insert(id, path);
        }
        Ok(())
    })?;
    Ok(targets)
}

/// The shared string table. Rich text runs are concatenated; phonetic runs
/// (`rPh`) repeat the text in another script and are dropped.
fn shared_strings(xml: &[u8], pool: &mut StringPool) -> XlsxResult<Vec<SharedString>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut text = String::new();
    let mut depth_in_phonetic = 0u32;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => text.clear(),
                b"rPh" => depth_in_phonetic += 1,
                b"t" => in_text = depth_in_phonetic == 0,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(pool.intern("")),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(pool.intern(decode_excel_escapes(&text))),
                b"rPh" => depth_in_phonetic = depth_in_phonetic.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => text.push_str(&e.unescape()?),
            Event::CData(e) if in_text => text.push_str(&String::from_utf8_lossy(&e)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    log::debug!("read {} shared strings", strings.len());
    Ok(strings)
}

/// Fill `worksheet` from a worksheet part
fn read_cells(
    xml: &[u8],
    worksheet: &mut Worksheet,
    shared: &[SharedString],
    pool: &mut StringPool,
    interrupted: &dyn Fn() -> bool,
) -> XlsxResult<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut cell = PendingCell::default();
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut rows_seen = 0u32;
    // Cells without an r attribute follow the previous cell
    let mut next = CellAddress::new(0, 0);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    rows_seen += 1;
                    if rows_seen % INTERRUPT_CHECK_ROWS == 0 && interrupted() {
                        return Err(XlsxError::Interrupted);
                    }
                    if let Some(row) = row_number(&e)? {
                        next = CellAddress::new(row - 1, 0);
                    }
                }
                b"c" => cell = PendingCell::start(&e, next)?,
                b"v" => in_value = true,
                b"t" if cell.active => in_inline_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // A style-only cell still occupies its position
                b"c" => next = PendingCell::start(&e, next)?.addr.right(),
                b"row" => {
                    if let Some(row) = row_number(&e)? {
                        next = CellAddress::new(row, 0);
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_value => cell.value.push_str(&e.unescape()?),
            Event::Text(e) if in_inline_text => cell.inline.push_str(&e.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    let addr = cell.addr;
                    if let Some(value) = std::mem::take(&mut cell).finish(shared, pool)? {
                        worksheet.set_value_at(addr.row, addr.col, value)?;
                    }
                    next = addr.right();
                }
                b"row" => next = CellAddress::new(next.row.saturating_add(1), 0),
                _ => {}
            },
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

/// The one-based `r` attribute of a `<row>`
fn row_number(e: &BytesStart) -> XlsxResult<Option<u32>> {
    let Some(r) = attribute(e, b"r")? else {
        return Ok(None);
    };
    match r.parse::<u32>() {
        Ok(row) if row > 0 => Ok(Some(row)),
        _ => Err(XlsxError::Parse(format!("Invalid row number '{r}'"))),
    }
}

/// A `<c>` element being read
#[derive(Default)]
struct PendingCell {
    active: bool,
    addr: CellAddress,
    cell_type: Option<String>,
    value: String,
    inline: String,
}

impl PendingCell {
    fn start(e: &BytesStart, fallback: CellAddress) -> XlsxResult<Self> {
        let addr = match attribute(e, b"r")? {
            Some(r) => CellAddress::parse(&r).map_err(|err| {
                XlsxError::Parse(format!("Invalid cell reference '{}': {}", r, err))
            })?,
            None => fallback,
        };
        Ok(Self {
            active: true,
            addr,
            cell_type: attribute(e, b"t")?,
            value: String::new(),
            inline: String::new(),
        })
    }

    /// Convert the collected text into a cell value according to the `t` attribute
    fn finish(
        self,
        shared_strings: &[SharedString],
        pool: &mut StringPool,
    ) -> XlsxResult<Option<CellValue>> {
        let value = self.value.as_str();
        let cell_value = match self.cell_type.as_deref() {
            // Inline string - decode Excel escape sequences
            Some("inlineStr") => {
                CellValue::String(pool.intern(decode_excel_escapes(&self.inline)))
            }

            _ if value.is_empty() => return Ok(None),

            // Shared string
            Some("s") => {
                let idx: usize = value.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }

            // Boolean
            Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

            // Error - kept as its displayed text
            Some("e") => CellValue::String(pool.intern(value)),

            // String (formula result)
            Some("str") => CellValue::String(pool.intern(decode_excel_escapes(value))),

            // Number (default type or explicit "n")
            None | Some("n") => match value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::String(pool.intern(value)),
            },

            // Unknown type - treat as string
            Some(other) => {
                log::warn!("unknown cell type '{}' at {}, reading as text", other, self.addr);
                CellValue::String(pool.intern(value))
            }
        };

        Ok(Some(cell_value))
    }
}

/// Unescaped value of the attribute with the given qualified name
fn attribute(e: &BytesStart, key: &[u8]) -> XlsxResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XlsxError::Parse(err.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
