//! Cell value types

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::Arc;

/// Represents the value stored in a cell
///
/// Formula state (text, shared-group membership, cached dependencies) lives
/// on the cell itself; a formula cell's value is simply its last result.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value
    Number(f64),

    /// String value
    String(SharedString),

    /// Date/time value, handed to formulas as a serial number
    Date(NaiveDateTime),

    /// Formatted text; formulas see only its plain text
    RichText(RichText),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(SharedString::new(s.into()))
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(1.0),
            CellValue::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the error, if this is one
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Date(_) => "date",
            CellValue::RichText(_) => "rich_text",
            CellValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s.as_str()),
            CellValue::Date(d) => write!(f, "{}", d),
            CellValue::RichText(r) => f.write_str(&r.plain_text()),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::string(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl From<RichText> for CellValue {
    fn from(r: RichText) -> Self {
        CellValue::RichText(r)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Spreadsheet error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #CALC! - Calculation error
    Calc,
    /// #CIRC! - The cell is part of a circular reference
    Circular,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Calc => "#CALC!",
            CellError::Circular => "#CIRC!",
        }
    }

    /// Parse an error string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            "#CALC!" => Some(CellError::Calc),
            "#CIRC!" => Some(CellError::Circular),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interned string for memory efficiency
///
/// Using `Arc<str>` lets the same text be shared by many cells and by
/// evaluation results without copying.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    /// Create a new shared string
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    /// Get the string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the string
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
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
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
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
        String::deserialize(deserializer).map(SharedString::from)
    }
}

/// One run of rich text; the style id is opaque to this crate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextRun {
    pub text: String,
    pub style_id: Option<u32>,
}

/// Text made of independently formatted runs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RichText {
    pub runs: Vec<TextRun>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run
    pub fn push(mut self, text: impl Into<String>, style_id: Option<u32>) -> Self {
        self.runs.push(TextRun {
            text: text.into(),
            style_id,
        });
        self
    }

    /// The text with all formatting dropped
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

fn base_date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a date to a serial number.
///
/// In the 1900 system serial 1 is 1900-01-01 and serial 60 is the
/// non-existent 1900-02-29, so every date from March 1900 on is one higher
/// than a plain day count. The 1904 system counts from 1904-01-01 = 0.
pub fn date_to_serial(date: NaiveDateTime, date_1904: bool) -> f64 {
    let base = if date_1904 {
        base_date(1904, 1, 1)
    } else if date < base_date(1900, 3, 1) {
        base_date(1899, 12, 31)
    } else {
        base_date(1899, 12, 30)
    };
    let elapsed = date - base;
    elapsed.num_milliseconds() as f64 / 86_400_000.0
}

/// Convert a serial number back to a date. Returns `None` for the phantom
/// 1900-02-29 and for serials outside chrono's range.
pub fn serial_to_date(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let base = if date_1904 {
        base_date(1904, 1, 1)
    } else if serial < 60.0 {
        base_date(1899, 12, 31)
    } else if serial < 61.0 {
        return None;
    } else {
        base_date(1899, 12, 30)
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        base_date(y, m, d)
    }

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("hello").as_string(), Some("hello"));
    }

    #[test]
    fn test_cell_error_display() {
        assert_eq!(CellError::Div0.to_string(), "#DIV/0!");
        assert_eq!(CellError::Ref.to_string(), "#REF!");
        assert_eq!(CellError::Circular.to_string(), "#CIRC!");
    }

    #[test]
    fn test_cell_error_parse() {
        assert_eq!(CellError::parse("#REF!"), Some(CellError::Ref));
        assert_eq!(CellError::parse("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::parse("#circ!"), Some(CellError::Circular));
        assert_eq!(CellError::parse("invalid"), None);
    }

    #[test]
    fn test_rich_text_plain() {
        let rt = RichText::new().push("Hello, ", None).push("world", Some(3));
        assert_eq!(rt.plain_text(), "Hello, world");
        assert_eq!(CellValue::from(rt).to_string(), "Hello, world");
    }

    #[test]
    fn test_date_serial_1900() {
        assert_eq!(date_to_serial(date(1900, 1, 1), false), 1.0);
        assert_eq!(date_to_serial(date(1900, 2, 28), false), 59.0);
        assert_eq!(date_to_serial(date(1900, 3, 1), false), 61.0);
        assert_eq!(date_to_serial(date(2024, 1, 15), false), 45306.0);

        assert_eq!(serial_to_date(45306.0, false), Some(date(2024, 1, 15)));
        assert_eq!(serial_to_date(59.0, false), Some(date(1900, 2, 28)));
        assert_eq!(serial_to_date(60.0, false), None);
    }

    #[test]
    fn test_date_serial_1904() {
        assert_eq!(date_to_serial(date(1904, 1, 1), true), 0.0);
        assert_eq!(date_to_serial(date(2024, 1, 15), true), 43844.0);
        assert_eq!(serial_to_date(43844.0, true), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_date_serial_keeps_time() {
        let noon = date(2024, 1, 15) + Duration::hours(12);
        assert_eq!(date_to_serial(noon, false), 45306.5);
    }
}
