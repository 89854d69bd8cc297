//! Session configuration

use gridsheet_csv::CsvWriteOptions;

use crate::export::SingleSheetPolicy;

/// One mebibyte, the unit large-file warnings are expressed in
pub const MEBIBYTE: usize = 1_048_576;

/// Configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Files larger than this many bytes get a [`SizeAdvisory`]. Default: 1 MiB.
    pub large_file_threshold: usize,
    /// Export file names are `{export_base_name}.{extension}`. Default: "sheet".
    pub export_base_name: String,
    /// Sheets handed to CSV and HTML exports. Default: the active sheet.
    pub single_sheet_policy: SingleSheetPolicy,
    /// Options for CSV exports
    pub csv: CsvWriteOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: MEBIBYTE,
            export_base_name: "sheet".to_string(),
            single_sheet_policy: SingleSheetPolicy::default(),
            csv: CsvWriteOptions::default(),
        }
    }
}

/// Warning for a file large enough that reading it may be slow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeAdvisory {
    /// File size in bytes
    pub bytes: usize,
    /// File size in whole mebibytes, rounded down
    pub megabytes: usize,
}

impl SizeAdvisory {
    pub(crate) fn check(bytes: usize, threshold: usize) -> Option<Self> {
        (bytes > threshold).then(|| Self {
            bytes,
            megabytes: bytes / MEBIBYTE,
        })
    }

    /// The confirmation prompt shown before reading
    pub fn message(&self) -> String {
        format!(
            "File is {} MB and reading may be slow.  Should we proceed?",
            self.megabytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.large_file_threshold, 1_048_576);
        assert_eq!(config.export_base_name, "sheet");
        assert_eq!(config.single_sheet_policy, SingleSheetPolicy::Active);
    }

    #[test]
    fn test_advisory_only_above_threshold() {
        assert_eq!(SizeAdvisory::check(MEBIBYTE, MEBIBYTE), None);

        let advisory = SizeAdvisory::check(5 * MEBIBYTE + 10, MEBIBYTE).unwrap();
        assert_eq!(advisory.megabytes, 5);
        assert_eq!(
            advisory.message(),
            "File is 5 MB and reading may be slow.  Should we proceed?"
        );

        // Just over the threshold rounds down to 1 MB
        assert_eq!(SizeAdvisory::check(MEBIBYTE + 1, MEBIBYTE).unwrap().megabytes, 1);
    }
}
