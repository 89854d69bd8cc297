//! Export formats and the export multiplexer

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use gridsheet_core::Workbook;
use thiserror::Error;

use crate::codec::Serializer;
use crate::error::ExportError;

/// Output formats offered for download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Xlsx,
    Xlsb,
    Csv,
    Html,
}

impl ExportFormat {
    /// Every format, in the order they are offered
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Xlsx,
        ExportFormat::Xlsb,
        ExportFormat::Csv,
        ExportFormat::Html,
    ];

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Xlsb => "xlsb",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Xlsb => "application/vnd.ms-excel.sheet.binary.macroEnabled.12",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Html => "text/html",
        }
    }

    /// Whether the format stores a whole workbook rather than one sheet
    pub fn is_multi_sheet(self) -> bool {
        matches!(self, ExportFormat::Xlsx | ExportFormat::Xlsb)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A format name that is not one of [`ExportFormat::ALL`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown export format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ext = s.strip_prefix('.').unwrap_or(s);
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Which sheets a single-sheet format (CSV, HTML) receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleSheetPolicy {
    /// The first sheet in workbook order
    First,
    /// The sheet currently being viewed
    #[default]
    Active,
    /// Every sheet, one after another
    Concatenate,
}

/// The serialized bytes of one export, named for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> std::io::Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Assembles a fresh workbook from the session's sheets and hands it to the
/// serializer.
///
/// Keeps nothing between calls.
#[derive(Clone)]
pub struct Exporter {
    serializer: Arc<dyn Serializer>,
    policy: SingleSheetPolicy,
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    pub fn new(serializer: Arc<dyn Serializer>, policy: SingleSheetPolicy) -> Self {
        Self { serializer, policy }
    }

    pub fn policy(&self) -> SingleSheetPolicy {
        self.policy
    }

    /// Build the container a format receives.
    ///
    /// Multi-sheet formats get every sheet in stored order. Single-sheet
    /// formats get what the policy selects; `active` is the index of the
    /// sheet being viewed.
    pub fn assemble(
        &self,
        workbook: &Workbook,
        format: ExportFormat,
        active: usize,
    ) -> Result<Workbook, ExportError> {
        let selected: Vec<usize> = if format.is_multi_sheet() {
            (0..workbook.sheet_count()).collect()
        } else {
            match self.policy {
                SingleSheetPolicy::First => vec![0],
                SingleSheetPolicy::Active => vec![active],
                SingleSheetPolicy::Concatenate => (0..workbook.sheet_count()).collect(),
            }
        };

        let mut container = Workbook::new();
        for sheet in selected.into_iter().filter_map(|i| workbook.worksheet(i)) {
            container
                .add_worksheet(sheet.clone())
                .map_err(|e| ExportError::Serialization(e.to_string()))?;
        }
        Ok(container)
    }

    /// Serialize `workbook` as `format`
    pub fn export(
        &self,
        workbook: &Workbook,
        format: ExportFormat,
        active: usize,
    ) -> Result<Vec<u8>, ExportError> {
        let container = self.assemble(workbook, format, active)?;
        tracing::debug!(
            "Serializing {} sheet(s) as {}",
            container.sheet_count(),
            format
        );
        self.serializer.serialize(&container, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DefaultCodec;
    use gridsheet_core::Worksheet;
    use pretty_assertions::assert_eq;

    fn workbook(names: &[&str]) -> Workbook {
        let mut wb = Workbook::new();
        for (i, name) in names.iter().enumerate() {
            let mut sheet = Worksheet::new(*name);
            sheet.set_value_at(0, 0, i as i32).unwrap();
            wb.add_worksheet(sheet).unwrap();
        }
        wb
    }

    fn names(wb: &Workbook) -> Vec<&str> {
        wb.sheet_names().collect()
    }

    #[test]
    fn test_format_names() {
        let exts: Vec<_> = ExportFormat::ALL.iter().map(|f| f.extension()).collect();
        assert_eq!(exts, vec!["xlsx", "xlsb", "csv", "html"]);
        assert_eq!("XLSB".parse::<ExportFormat>(), Ok(ExportFormat::Xlsb));
        assert_eq!(".csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!(
            "ods".parse::<ExportFormat>(),
            Err(UnknownFormat("ods".into()))
        );
        assert!(ExportFormat::Xlsx.is_multi_sheet());
        assert!(!ExportFormat::Html.is_multi_sheet());
    }

    #[test]
    fn test_multi_sheet_formats_keep_every_sheet_in_order() {
        let wb = workbook(&["Zeta", "Alpha", "Mid"]);
        let exporter = Exporter::new(Arc::new(DefaultCodec::new()), SingleSheetPolicy::Active);

        let container = exporter.assemble(&wb, ExportFormat::Xlsx, 1).unwrap();
        assert_eq!(names(&container), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(container, wb);
    }

    #[test]
    fn test_single_sheet_policies() {
        let wb = workbook(&["Zeta", "Alpha", "Mid"]);
        let assemble = |policy| {
            Exporter::new(Arc::new(DefaultCodec::new()), policy)
                .assemble(&wb, ExportFormat::Csv, 2)
                .unwrap()
        };

        assert_eq!(names(&assemble(SingleSheetPolicy::First)), vec!["Zeta"]);
        assert_eq!(names(&assemble(SingleSheetPolicy::Active)), vec!["Mid"]);
        assert_eq!(
            names(&assemble(SingleSheetPolicy::Concatenate)),
            vec!["Zeta", "Alpha", "Mid"]
        );
    }

    #[test]
    fn test_serializer_errors_pass_through() {
        struct XlsxOnly;
        impl Serializer for XlsxOnly {
            fn serialize(&self, _: &Workbook, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
                match format {
                    ExportFormat::Xlsx => Ok(b"PK".to_vec()),
                    other => Err(ExportError::UnsupportedFormat(other)),
                }
            }
        }

        let exporter = Exporter::new(Arc::new(XlsxOnly), SingleSheetPolicy::default());
        let wb = workbook(&["Sheet1"]);
        assert_eq!(exporter.export(&wb, ExportFormat::Xlsx, 0), Ok(b"PK".to_vec()));
        assert_eq!(
            exporter.export(&wb, ExportFormat::Html, 0),
            Err(ExportError::UnsupportedFormat(ExportFormat::Html))
        );
    }

    #[test]
    fn test_artifact_is_saved_under_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ExportArtifact {
            file_name: "sheet.csv".into(),
            format: ExportFormat::Csv,
            bytes: b"a,b\n".to_vec(),
        };

        let path = artifact.save_in(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("sheet.csv"));
        assert_eq!(std::fs::read(path).unwrap(), b"a,b\n");
    }
}
