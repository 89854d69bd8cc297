//! Workbook type - the full loaded document

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook: uniquely named worksheets in a significant order.
///
/// The order sheets were added in is the order they are exported in.
/// Names are unique (case-insensitively), so every name in
/// [`sheet_names`](Workbook::sheet_names) resolves to exactly one sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    /// Create a workbook with no worksheets
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// True until the first sheet is added
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sheets.iter().map(Worksheet::name)
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    /// Look a sheet up by its exact name
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|sheet| sheet.name() == name)
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name() == name)
    }

    /// Position of the named sheet in workbook order
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|sheet| sheet.name() == name)
    }

    /// Check whether a sheet with exactly this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.sheet_index(name).is_some()
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> + '_ {
        self.sheets.iter()
    }

    /// Append a new, empty worksheet
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.add_worksheet(Worksheet::new(name))
    }

    /// Append an existing worksheet under its own name
    pub fn add_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.check_new_name(worksheet.name())?;
        self.sheets.push(worksheet);
        Ok(self.sheets.len() - 1)
    }

    /// Replace the sheet carrying `worksheet`'s name, keeping its position
    pub fn replace_worksheet(&mut self, worksheet: Worksheet) -> Result<()> {
        let index = self
            .sheet_index(worksheet.name())
            .ok_or_else(|| Error::SheetNotFound(worksheet.name().to_string()))?;
        self.sheets[index] = worksheet;
        Ok(())
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        const FORBIDDEN: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

        let problem = if name.is_empty() {
            Some("name is empty".to_string())
        } else if name.chars().count() > MAX_SHEET_NAME_LEN {
            Some(format!("longer than {MAX_SHEET_NAME_LEN} characters"))
        } else {
            name.chars()
                .find(|c| FORBIDDEN.contains(c))
                .map(|c| format!("contains '{c}'"))
        };
        if let Some(problem) = problem {
            return Err(Error::InvalidSheetName(format!("{name:?}: {problem}")));
        }

        let folded = name.to_lowercase();
        if self.sheet_names().any(|existing| existing.to_lowercase() == folded) {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_of(names: &[&str]) -> Workbook {
        let mut workbook = Workbook::new();
        for name in names {
            workbook.add_worksheet_with_name(name).unwrap();
        }
        workbook
    }

    #[test]
    fn test_order_is_preserved() {
        let workbook = workbook_of(&["Zeta", "Alpha", "Mid"]);
        assert_eq!(workbook.sheet_names().collect::<Vec<_>>(), ["Zeta", "Alpha", "Mid"]);
        assert_eq!(workbook.sheet_index("Mid"), Some(2));
        assert!(workbook.contains("Alpha"));
        assert!(!workbook.contains("alpha"));
    }

    #[test]
    fn test_names_are_unique_ignoring_case() {
        let mut workbook = workbook_of(&["Totals"]);
        assert_eq!(
            workbook.add_worksheet_with_name("TOTALS"),
            Err(Error::DuplicateSheetName("TOTALS".into()))
        );
        assert_eq!(workbook.sheet_count(), 1);
    }

    #[test]
    fn test_rejected_names() {
        let mut workbook = Workbook::new();
        let too_long = "n".repeat(MAX_SHEET_NAME_LEN + 1);
        for name in ["", "a/b", "a:b", "[x]", "why?", too_long.as_str()] {
            assert!(
                matches!(
                    workbook.add_worksheet_with_name(name),
                    Err(Error::InvalidSheetName(_))
                ),
                "{name}"
            );
        }
        assert!(workbook.is_empty());

        // Characters are counted, not bytes
        let accented = "é".repeat(MAX_SHEET_NAME_LEN);
        assert_eq!(workbook.add_worksheet_with_name(&accented), Ok(0));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut workbook = workbook_of(&["A", "B"]);

        let mut replacement = Worksheet::new("A");
        replacement.set_value_at(0, 0, "edited").unwrap();
        workbook.replace_worksheet(replacement).unwrap();

        assert_eq!(workbook.sheet_index("A"), Some(0));
        assert_eq!(workbook.worksheet(0).unwrap().value_at(0, 0).as_string(), Some("edited"));
        assert_eq!(
            workbook.replace_worksheet(Worksheet::new("Missing")),
            Err(Error::SheetNotFound("Missing".into()))
        );
    }
}
