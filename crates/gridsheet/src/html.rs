//! HTML table export

use std::io::{self, Write};

use gridsheet_core::{CellAddress, CellValue, Worksheet};

/// Writes worksheets as tables of a standalone HTML document
pub struct HtmlWriter;

impl HtmlWriter {
    /// Write a document holding one `<table>` per sheet, in the order given.
    ///
    /// Each table spans A1 through the sheet's last populated cell, so every
    /// row has the same number of `<td>` elements.
    pub fn write_sheets<'a, W, I>(sheets: I, mut writer: W) -> io::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a Worksheet>,
    {
        let sheets: Vec<&Worksheet> = sheets.into_iter().collect();
        let title = sheets.first().map_or("Sheet", |s| s.name());

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        html.push_str("</head>\n<body>\n");

        for sheet in sheets {
            write_table(&mut html, sheet);
        }

        html.push_str("</body>\n</html>\n");
        writer.write_all(html.as_bytes())?;
        writer.flush()
    }
}

fn write_table(html: &mut String, sheet: &Worksheet) {
    html.push_str("<table>\n");
    html.push_str(&format!("<caption>{}</caption>\n", escape_html(sheet.name())));

    if let (Some(max_row), Some(max_col)) = (sheet.max_row(), sheet.max_col()) {
        for row in 0..=max_row {
            html.push_str("<tr>");
            for col in 0..=max_col {
                match sheet.get(row, col) {
                    None | Some(CellValue::Empty) => html.push_str("<td></td>"),
                    Some(value) => {
                        let tag = match value {
                            CellValue::Number(_) => "n",
                            CellValue::Boolean(_) => "b",
                            _ => "s",
                        };
                        html.push_str(&format!(
                            "<td id=\"{}\" data-t=\"{}\">{}</td>",
                            CellAddress::new(row, col).to_a1_string(),
                            tag,
                            escape_html(&value.to_string())
                        ));
                    }
                }
            }
            html.push_str("</tr>\n");
        }
    }

    html.push_str("</table>\n");
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
