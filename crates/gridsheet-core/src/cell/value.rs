//! Cell values and the shared string type behind them

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use ahash::AHashSet;

/// What a cell holds.
///
/// Formula cells arrive as their cached result and error cells as their
/// display text (`#N/A`, `#DIV/0!`), so there are only four kinds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    /// Every number, dates included, is an `f64`
    Number(f64),
    String(SharedString),
}

impl CellValue {
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        CellValue::String(SharedString::new(s))
    }

    /// True only for [`CellValue::Empty`]; the empty string is a value
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numbers as themselves, booleans as 1 or 0
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            CellValue::Number(n) => Some(n),
            CellValue::Boolean(b) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Booleans as themselves, numbers as "non-zero"
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            CellValue::Boolean(b) => Some(b),
            CellValue::Number(n) => Some(n != 0.0),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        if let CellValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Lower-case kind name, for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
        }
    }
}

/// The text a cell shows: booleans as `TRUE`/`FALSE`, empty cells as nothing
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => f.write_str(s),
        }
    }
}

macro_rules! cell_value_from {
    ($($ty:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for CellValue {
                fn from(v: $ty) -> Self {
                    CellValue::$variant($conv(v))
                }
            }
        )*
    };
}

cell_value_from! {
    bool => Boolean(|b| b),
    i32 => Number(f64::from),
    u32 => Number(f64::from),
    f64 => Number(|n| n),
    &str => String(SharedString::from),
    String => String(SharedString::from),
    SharedString => String(|s| s),
}

/// Immutable, cheaply cloned cell text.
///
/// Readers intern repeated strings through a [`StringPool`] so that equal
/// cells share one allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for SharedString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString(Arc::from(s))
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString(Arc::from(s))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SharedString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SharedString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <std::borrow::Cow<'de, str>>::deserialize(deserializer).map(SharedString::new)
    }
}

/// Set of distinct strings seen while reading one file
#[derive(Debug, Default)]
pub struct StringPool {
    strings: AHashSet<Arc<str>>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pooled copy of `s`, adding it on first sight
    pub fn intern<S: AsRef<str>>(&mut self, s: S) -> SharedString {
        let s = s.as_ref();
        match self.strings.get(s) {
            Some(existing) => SharedString(Arc::clone(existing)),
            None => {
                let text: Arc<str> = Arc::from(s);
                self.strings.insert(Arc::clone(&text));
                SharedString(text)
            }
        }
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
