//! Human-readable diagnostics for failed operations

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ParseError, SessionError};

/// Subject line of forwarded error reports
pub const REPORT_SUBJECT: &str = "Public Demo Error";

/// Characters left unescaped in `mailto:` header values
const MAILTO_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// What to show the user when an operation fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub title: String,
    pub message: String,
    /// Present when the failure is worth forwarding
    pub report: Option<ErrorReport>,
}

/// A failure report the user can choose to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub subject: String,
    pub body: String,
}

impl ErrorReport {
    /// A report with the default subject
    pub fn new<S: Into<String>>(body: S) -> Self {
        Self {
            subject: REPORT_SUBJECT.to_string(),
            body: body.into(),
        }
    }

    /// `mailto:` link that opens a message with this report
    pub fn mailto_uri(&self, recipient: &str) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            recipient,
            utf8_percent_encode(&self.subject, MAILTO_VALUE),
            utf8_percent_encode(&self.body, MAILTO_VALUE)
        )
    }
}

impl SessionError {
    /// Describe this error for display
    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            SessionError::Parse { source, size } => parse_diagnostic(source, *size),
            SessionError::Export(e) => Diagnostic {
                title: "Export failed".into(),
                message: e.to_string(),
                report: Some(ErrorReport::new(e.to_string())),
            },
            SessionError::Worker(e) => Diagnostic {
                title: "Reading failed".into(),
                message: self.to_string(),
                report: Some(ErrorReport::new(e.to_string())),
            },
            SessionError::Precondition(e) => Diagnostic {
                title: "Operation not allowed".into(),
                message: e.to_string(),
                report: None,
            },
            SessionError::Grid(e) => Diagnostic {
                title: "Edit rejected".into(),
                message: e.to_string(),
                report: None,
            },
        }
    }
}

fn parse_diagnostic(error: &ParseError, size: usize) -> Diagnostic {
    match error {
        ParseError::Malformed(reason) | ParseError::Unsupported(reason) => Diagnostic {
            title: "This file does not appear to be a valid spreadsheet".into(),
            message: format!("Library Error: {reason}"),
            report: Some(ErrorReport::new(reason.clone())),
        },
        ParseError::Timeout { .. } => Diagnostic {
            title: "Timeout".into(),
            message: error.to_string(),
            report: Some(ErrorReport::new(format!(
                "Timeout on file of size {size} bytes"
            ))),
        },
        ParseError::Cancelled => Diagnostic {
            title: "Cancelled".into(),
            message: error.to_string(),
            report: None,
        },
    }
}
