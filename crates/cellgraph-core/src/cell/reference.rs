//! Typed references: cells, ranges, row bands and column bands
//!
//! A [`Reference`] is always stored as two corners. A single cell is the
//! degenerate range whose corners coincide, a row band spans every column
//! (`3:5`), and a column band spans every row (`C:E`). The kind is derived
//! from the corners by [`Reference::kind`], so there is only one
//! representation for each area of the grid.

use super::address::{check_col, check_row, parse_row_number, CellAddress};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// What shape of area a [`Reference`] covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceKind {
    Cell,
    Range,
    RowBand,
    ColumnBand,
}

/// Grid axis, used by structural edits and reference rewriting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    /// Largest valid index on this axis
    pub fn max_index(self) -> u32 {
        match self {
            Axis::Row => MAX_ROWS,
            Axis::Column => MAX_COLS as u32,
        }
    }

    /// The other axis
    pub fn cross(self) -> Axis {
        match self {
            Axis::Row => Axis::Column,
            Axis::Column => Axis::Row,
        }
    }
}

/// Options for [`Reference::to_address_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressOptions {
    /// Prefix the address with its sheet name (when it has one)
    pub include_sheet: bool,
    /// Render every axis with a `$` marker
    pub anchored: bool,
}

impl Default for AddressOptions {
    fn default() -> Self {
        Self {
            include_sheet: true,
            anchored: false,
        }
    }
}

/// A cell, range, row band or column band, optionally qualified by a sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reference {
    /// Sheet name, `None` for references written without a qualifier
    pub sheet: Option<String>,
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl Reference {
    /// Create a reference from two corners, normalizing them to top-left/bottom-right
    pub fn new(sheet: Option<String>, start: CellAddress, end: CellAddress) -> Self {
        let (top, bottom) = if start.row <= end.row {
            ((start.row, start.row_absolute), (end.row, end.row_absolute))
        } else {
            ((end.row, end.row_absolute), (start.row, start.row_absolute))
        };
        let (left, right) = if start.col <= end.col {
            ((start.col, start.col_absolute), (end.col, end.col_absolute))
        } else {
            ((end.col, end.col_absolute), (start.col, start.col_absolute))
        };

        Self {
            sheet,
            start: CellAddress::with_absolute(top.0, left.0, top.1, left.1),
            end: CellAddress::with_absolute(bottom.0, right.0, bottom.1, right.1),
        }
    }

    /// A single cell on `sheet`
    pub fn cell(sheet: impl Into<String>, row: u32, col: u16) -> Self {
        let addr = CellAddress::new(row, col);
        Self {
            sheet: Some(sheet.into()),
            start: addr,
            end: addr,
        }
    }

    /// A rectangular range on `sheet`
    pub fn range(
        sheet: impl Into<String>,
        start_row: u32,
        start_col: u16,
        end_row: u32,
        end_col: u16,
    ) -> Self {
        Self::new(
            Some(sheet.into()),
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Whole rows `from..=to` on `sheet`
    pub fn row_band(sheet: impl Into<String>, from: u32, to: u32) -> Self {
        Self::range(sheet, from, 1, to, MAX_COLS)
    }

    /// Whole columns `from..=to` on `sheet`
    pub fn column_band(sheet: impl Into<String>, from: u16, to: u16) -> Self {
        Self::range(sheet, 1, from, MAX_ROWS, to)
    }

    /// Whole lines `from..=to` along `axis`
    pub fn band(sheet: impl Into<String>, axis: Axis, from: u32, to: u32) -> Self {
        match axis {
            Axis::Row => Self::row_band(sheet, from, to),
            Axis::Column => Self::column_band(sheet, from as u16, to as u16),
        }
    }

    /// Classify the area covered by this reference
    pub fn kind(&self) -> ReferenceKind {
        if self.start.same_position(&self.end) {
            ReferenceKind::Cell
        } else if self.start.col == 1 && self.end.col == MAX_COLS {
            ReferenceKind::RowBand
        } else if self.start.row == 1 && self.end.row == MAX_ROWS {
            ReferenceKind::ColumnBand
        } else {
            ReferenceKind::Range
        }
    }

    /// True when this is a single cell
    pub fn is_cell(&self) -> bool {
        self.kind() == ReferenceKind::Cell
    }

    /// Replace the sheet qualifier
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Fill in the sheet qualifier when the reference has none
    pub fn qualified_or(mut self, sheet: &str) -> Self {
        if self.sheet.is_none() {
            self.sheet = Some(sheet.to_string());
        }
        self
    }

    /// True when the reference is qualified with `sheet` (case-insensitive)
    pub fn is_on(&self, sheet: &str) -> bool {
        self.sheet
            .as_deref()
            .map_or(false, |s| sheet_names_equal(s, sheet))
    }

    /// Check whether a cell lies inside the reference
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Check whether two references overlap. Qualified references on different
    /// sheets never overlap; an unqualified side matches any sheet.
    pub fn intersects(&self, other: &Reference) -> bool {
        if let (Some(a), Some(b)) = (&self.sheet, &other.sheet) {
            if !sheet_names_equal(a, b) {
                return false;
            }
        }
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// The inclusive extent of the reference along `axis`
    pub fn extent(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Row => (self.start.row, self.end.row),
            Axis::Column => (self.start.col as u32, self.end.col as u32),
        }
    }

    /// Number of rows covered
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns covered
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// The top-left cell, if the reference is sheet-qualified
    pub fn top_left(&self) -> Option<CellRef> {
        self.sheet
            .as_ref()
            .map(|sheet| CellRef::new(sheet.clone(), self.start.row, self.start.col))
    }

    /// Check that both corners are inside the grid
    pub fn validate(&self) -> Result<()> {
        check_row(self.start.row)?;
        check_row(self.end.row)?;
        check_col(self.start.col as u32)?;
        check_col(self.end.col as u32)?;
        Ok(())
    }

    /// Render as an address string such as `Sheet1!A1:C3` or `'My Sheet'!3:5`
    pub fn to_address(&self) -> String {
        self.to_address_with(AddressOptions::default())
    }

    /// Render with explicit [`AddressOptions`]
    pub fn to_address_with(&self, options: AddressOptions) -> String {
        let (start, end) = if options.anchored {
            (self.start.anchored(), self.end.anchored())
        } else {
            (self.start, self.end)
        };

        let body = match self.kind() {
            ReferenceKind::Cell => start.to_a1_string(),
            ReferenceKind::Range => format!("{}:{}", start.to_a1_string(), end.to_a1_string()),
            ReferenceKind::RowBand => format!(
                "{}{}:{}{}",
                dollar(start.row_absolute),
                start.row,
                dollar(end.row_absolute),
                end.row
            ),
            ReferenceKind::ColumnBand => format!(
                "{}{}:{}{}",
                dollar(start.col_absolute),
                CellAddress::column_to_letters(start.col),
                dollar(end.col_absolute),
                CellAddress::column_to_letters(end.col)
            ),
        };

        match (&self.sheet, options.include_sheet) {
            (Some(sheet), true) => format!("{}!{}", quote_sheet_name(sheet), body),
            _ => body,
        }
    }

    /// Parse an address string.
    ///
    /// Accepts `A1`, `A1:C3`, `3:5`, `C:E`, each with an optional sheet
    /// qualifier (`Sheet1!`, `'My Sheet'!`). When the text carries no sheet,
    /// `default_sheet` is used.
    ///
    /// # Examples
    /// ```
    /// use cellgraph_core::{Reference, ReferenceKind};
    ///
    /// let r = Reference::from_address("'Q1 Data'!$B$2:D10", None).unwrap();
    /// assert_eq!(r.sheet.as_deref(), Some("Q1 Data"));
    /// assert_eq!(r.kind(), ReferenceKind::Range);
    ///
    /// let r = Reference::from_address("C:E", Some("Sheet1")).unwrap();
    /// assert_eq!(r.kind(), ReferenceKind::ColumnBand);
    /// assert_eq!(r.to_address(), "Sheet1!C:E");
    /// ```
    pub fn from_address(s: &str, default_sheet: Option<&str>) -> Result<Self> {
        let s = s.trim();
        let (sheet, body) = split_sheet_prefix(s)?;
        let sheet = sheet.or_else(|| default_sheet.map(str::to_string));

        if body.is_empty() {
            return Err(Error::InvalidAddress(format!("missing reference in '{}'", s)));
        }

        let Some((left, right)) = body.split_once(':') else {
            let addr = CellAddress::parse(body)?;
            return Ok(Self {
                sheet,
                start: addr,
                end: addr,
            });
        };

        if let (Some(a), Some(b)) = (parse_row_line(left)?, parse_row_line(right)?) {
            let start = CellAddress::with_absolute(a.0, 1, a.1, false);
            let end = CellAddress::with_absolute(b.0, MAX_COLS, b.1, false);
            return Ok(Self::new(sheet, start, end));
        }

        if let (Some(a), Some(b)) = (parse_column_line(left)?, parse_column_line(right)?) {
            let start = CellAddress::with_absolute(1, a.0, false, a.1);
            let end = CellAddress::with_absolute(MAX_ROWS, b.0, false, b.1);
            return Ok(Self::new(sheet, start, end));
        }

        let start = CellAddress::parse(left)?;
        let end = CellAddress::parse(right)?;
        Ok(Self::new(sheet, start, end))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_address(s, None)
    }
}

/// Identity of a single cell: sheet name plus 1-based coordinates
///
/// This is the handle used for graph nodes and for addressing cells through
/// the workbook; it carries no `$` markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRef {
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    /// Create a new cell handle
    pub fn new(sheet: impl Into<String>, row: u32, col: u16) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Parse `Sheet1!B7`; the sheet may be omitted when `default_sheet` is given
    pub fn parse(s: &str, default_sheet: Option<&str>) -> Result<Self> {
        let reference = Reference::from_address(s, default_sheet)?;
        if !reference.is_cell() {
            return Err(Error::InvalidAddress(format!("'{}' is not a single cell", s)));
        }
        let sheet = reference
            .sheet
            .ok_or_else(|| Error::InvalidAddress(format!("'{}' has no sheet", s)))?;
        Ok(Self::new(sheet, reference.start.row, reference.start.col))
    }

    /// The single-cell [`Reference`] for this cell
    pub fn to_reference(&self) -> Reference {
        Reference::cell(self.sheet.clone(), self.row, self.col)
    }

    /// Coordinate along `axis`
    pub fn index(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row,
            Axis::Column => self.col as u32,
        }
    }

    /// Same cell moved to `index` along `axis`
    pub fn with_index(&self, axis: Axis, index: u32) -> Self {
        let mut moved = self.clone();
        match axis {
            Axis::Row => moved.row = index,
            Axis::Column => moved.col = index as u16,
        }
        moved
    }

    /// A1-style address without the sheet
    pub fn a1(&self) -> String {
        CellAddress::new(self.row, self.col).to_a1_string()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet_name(&self.sheet), self.a1())
    }
}

impl From<&CellRef> for Reference {
    fn from(cell: &CellRef) -> Self {
        cell.to_reference()
    }
}

/// Compare sheet names the way spreadsheet applications do (case-insensitive)
pub fn sheet_names_equal(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Quote a sheet name for use in an address when it needs quoting
pub fn quote_sheet_name(name: &str) -> String {
    if needs_quoting(name) {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() || first == '.' {
        return true;
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return true;
    }
    // Names like "AB12" would read back as a cell address
    CellAddress::parse(name).is_ok()
}

/// Split `Sheet!rest` / `'Quoted Sheet'!rest` into its sheet name and body
fn split_sheet_prefix(s: &str) -> Result<(Option<String>, &str)> {
    if let Some(quoted) = s.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                name.push('\'');
                chars.next();
                continue;
            }
            let rest = &quoted[i + 1..];
            let body = rest.strip_prefix('!').ok_or_else(|| {
                Error::InvalidAddress(format!("expected '!' after sheet name in '{}'", s))
            })?;
            if name.is_empty() {
                return Err(Error::InvalidAddress(format!("empty sheet name in '{}'", s)));
            }
            return Ok((Some(name), body));
        }
        return Err(Error::InvalidAddress(format!("unterminated sheet name in '{}'", s)));
    }

    match s.rfind('!') {
        Some(0) => Err(Error::InvalidAddress(format!("empty sheet name in '{}'", s))),
        Some(pos) => Ok((Some(s[..pos].to_string()), &s[pos + 1..])),
        None => Ok((None, s)),
    }
}

/// `$12` -> (12, true); `None` when the text is not a row number at all
fn parse_row_line(s: &str) -> Result<Option<(u32, bool)>> {
    let (absolute, digits) = match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let Some(row) = parse_row_number(digits) else {
        return Ok(None);
    };
    check_row(row)?;
    Ok(Some((row, absolute)))
}

/// `$C` -> (3, true); `None` when the text is not bare column letters
fn parse_column_line(s: &str) -> Result<Option<(u16, bool)>> {
    let (absolute, letters) = match s.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Ok(None);
    }
    let col = CellAddress::letters_to_column(letters)?;
    Ok(Some((col, absolute)))
}

fn dollar(absolute: bool) -> &'static str {
    if absolute {
        "$"
    } else {
        ""
    }
}
