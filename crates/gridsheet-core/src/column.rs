//! Column labels and grid column descriptors

/// Spreadsheet-style label for a zero-based column index.
///
/// Bijective base-26 with no zero digit: 0 → `A`, 25 → `Z`, 26 → `AA`,
/// 701 → `ZZ`, 702 → `AAA`. Total over all indices.
pub fn column_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as u128 + 1;

    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }

    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

/// Inverse of [`column_label`]; case-insensitive.
///
/// Returns `None` for empty input, non-letters, or a label too large for `usize`.
pub fn column_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }

    let mut n: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }

    Some(n - 1)
}

/// Descriptor for one column of the editable grid.
///
/// Descriptors are derived, never stored: one exists for every positional
/// key `0..column_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Positional key (the column index the cells of this column flush to)
    pub key: usize,
    /// Display label, e.g. `"C"`
    pub label: String,
}

impl ColumnDescriptor {
    /// Descriptor for the column at `key`
    pub fn new(key: usize) -> Self {
        Self {
            key,
            label: column_label(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_label() {
        assert_eq!(column_label(0), "A");
        assert_eq!(column_label(1), "B");
        assert_eq!(column_label(25), "Z");
        assert_eq!(column_label(26), "AA");
        assert_eq!(column_label(27), "AB");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
        assert_eq!(column_label(16383), "XFD");
    }

    #[test]
    fn test_column_label_max_index() {
        let label = column_label(usize::MAX - 1);
        assert_eq!(column_index(&label), Some(usize::MAX - 1));
    }

    #[test]
    fn test_column_index_rejects_garbage() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("ÄB"), None);
        assert_eq!(column_index(&"Z".repeat(40)), None);
    }

    #[test]
    fn test_descriptor() {
        let col = ColumnDescriptor::new(28);
        assert_eq!(col.key, 28);
        assert_eq!(col.label, "AC");
    }

    proptest! {
        #[test]
        fn label_roundtrips_through_index(index in 0usize..10_000_000) {
            prop_assert_eq!(column_index(&column_label(index)), Some(index));
        }

        #[test]
        fn label_is_injective(a in 0usize..100_000, b in 0usize..100_000) {
            prop_assume!(a != b);
            prop_assert_ne!(column_label(a), column_label(b));
        }

        #[test]
        fn labels_are_uppercase_letters(index in any::<u32>()) {
            let label = column_label(index as usize);
            prop_assert!(!label.is_empty());
            prop_assert!(label.bytes().all(|b| b.is_ascii_uppercase()));
        }
    }
}
