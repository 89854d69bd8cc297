//! CSV options

/// Options for reading delimited text
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Field delimiter; `None` sniffs it from the first lines
    pub delimiter: Option<u8>,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Detect numbers and booleans instead of keeping every field as text
    pub auto_detect_types: bool,
    /// Name of the sheet the rows are read into
    pub sheet_name: String,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
            auto_detect_types: true,
            sheet_name: "Sheet1".to_string(),
        }
    }
}

/// Options for writing delimited text
#[derive(Debug, Clone)]
pub struct CsvWriteOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Line terminator
    pub line_terminator: LineTerminator,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            line_terminator: LineTerminator::LF,
        }
    }
}

/// Line terminator type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// Unix-style (LF)
    LF,
    /// Windows-style (CRLF)
    CRLF,
    /// Old Mac-style (CR)
    CR,
}

impl LineTerminator {
    pub(crate) fn as_bytes(self) -> &'static [u8] {
        match self {
            LineTerminator::LF => b"\n",
            LineTerminator::CRLF => b"\r\n",
            LineTerminator::CR => b"\r",
        }
    }
}
