//! Text escaping shared by the XML parts
//!
//! SpreadsheetML encodes characters XML cannot carry as `_xHHHH_`. A literal
//! `_xHHHH_` in cell text is protected by escaping its underscore as `_x005F_`.

/// Escape the five XML special characters
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('_') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match escape_at(tail) {
            Some(decoded) => {
                result.push(decoded);
                rest = &tail[7..];
            }
            None => {
                result.push('_');
                rest = &tail[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Encode text for a cell: control characters other than tab and LF become
/// `_xHHHH_`, and underscores that would start an escape become `_x005F_`.
pub fn encode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, c) in s.char_indices() {
        match c {
            '_' if escape_at(&s[i..]).is_some() => result.push_str("_x005F_"),
            '\t' | '\n' => result.push(c),
            c if (c as u32) < 0x20 => result.push_str(&format!("_x{:04X}_", c as u32)),
            c => result.push(c),
        }
    }

    result
}

/// Character encoded by a `_xHHHH_` sequence at the start of `s`
fn escape_at(s: &str) -> Option<char> {
    let bytes = s.as_bytes();
    if bytes.len() < 7 || bytes[0] != b'_' || bytes[1] != b'x' || bytes[6] != b'_' {
        return None;
    }
    let hex = s.get(2..6)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Whether text needs `xml:space="preserve"` to keep its outer whitespace
pub fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}
