//! Named range definitions
//!
//! Named ranges give a cell, range or constant a name that formulas can use
//! instead of an address. A name is either workbook-wide or scoped to one
//! sheet; lookups from a formula try the formula's own sheet first.
//!
//! # Example
//!
//! ```text
//! // Define a named range "TaxRate" that refers to cell B1
//! workbook.define_name("TaxRate", "Sheet1!$B$1")?;
//!
//! // Use it in a formula
//! =Price * TaxRate
//! ```

use crate::cell::{CellAddress, Reference};
use crate::error::{Error, Result};
use ahash::AHashMap;

/// Scope of a named range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NameScope {
    /// Available throughout the workbook (global)
    Workbook,
    /// Scoped to the named sheet (local)
    Sheet(String),
}

impl NameScope {
    /// The sheet this scope belongs to, if any
    pub fn sheet(&self) -> Option<&str> {
        match self {
            NameScope::Workbook => None,
            NameScope::Sheet(name) => Some(name),
        }
    }
}

/// A named range definition
///
/// `refers_to` is kept as text so it can be rewritten by structural edits
/// exactly like formula text:
/// - `Sheet1!$A$1` - single cell
/// - `Sheet1!$A$1:$D$10` - range
/// - `0.0725` - constant
/// - `=SUM(Sheet1!A1:A10)` - expression
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRange {
    /// The name as written (lookups are case-insensitive)
    pub name: String,
    /// Scope of this name
    pub scope: NameScope,
    /// What the name refers to
    pub refers_to: String,
    /// Optional comment/description
    pub comment: Option<String>,
    /// Whether this name is hidden from the UI
    pub hidden: bool,
}

impl NamedRange {
    /// Create a new named range
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to: refers_to.into(),
            comment: None,
            hidden: false,
        }
    }

    /// Create a workbook-scoped named range
    pub fn workbook_scope(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self::new(name, refers_to, NameScope::Workbook)
    }

    /// Create a sheet-scoped named range
    pub fn sheet_scope(
        name: impl Into<String>,
        refers_to: impl Into<String>,
        sheet: impl Into<String>,
    ) -> Self {
        Self::new(name, refers_to, NameScope::Sheet(sheet.into()))
    }

    /// Set a comment for this named range
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mark this named range as hidden
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The refers_to text without a leading `=`
    pub fn expression(&self) -> &str {
        let text = self.refers_to.trim();
        text.strip_prefix('=').unwrap_or(text)
    }

    /// The reference this name stands for, when it is a plain address.
    /// Unqualified addresses take the scope's sheet.
    pub fn reference(&self) -> Option<Reference> {
        let reference = Reference::from_address(self.expression(), self.scope.sheet()).ok()?;
        reference.sheet.is_some().then_some(reference)
    }
}

/// Check that `name` can be used as a defined name
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidName("name cannot be empty".into()));
    };
    if !(first.is_alphabetic() || first == '_' || first == '\\') {
        return Err(Error::InvalidName(format!(
            "'{}' must start with a letter, '_' or '\\'",
            name
        )));
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '\\') {
        return Err(Error::InvalidName(format!(
            "'{}' contains characters not allowed in a name",
            name
        )));
    }
    if CellAddress::parse(name).is_ok() || name.eq_ignore_ascii_case("R") || name.eq_ignore_ascii_case("C") {
        return Err(Error::InvalidName(format!(
            "'{}' would be read as a cell reference",
            name
        )));
    }
    Ok(())
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    /// Keyed by lowercase name plus lowercase scope sheet
    ranges: AHashMap<(String, Option<String>), NamedRange>,
}

impl NamedRangeCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(name: &str, scope: &NameScope) -> (String, Option<String>) {
        (
            name.to_lowercase(),
            scope.sheet().map(|s| s.to_lowercase()),
        )
    }

    /// Define a new named range
    ///
    /// Fails if the name is invalid or already exists in the same scope.
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        validate_name(&range.name)?;
        let key = Self::make_key(&range.name, &range.scope);

        if self.ranges.contains_key(&key) {
            return Err(Error::InvalidName(format!(
                "Named range '{}' already exists in this scope",
                range.name
            )));
        }

        self.ranges.insert(key, range);
        Ok(())
    }

    /// Define or update a named range
    pub fn define_or_update(&mut self, range: NamedRange) -> Result<()> {
        validate_name(&range.name)?;
        let key = Self::make_key(&range.name, &range.scope);
        self.ranges.insert(key, range);
        Ok(())
    }

    /// Get a named range as seen from a formula on `current_sheet`
    ///
    /// 1. a name scoped to `current_sheet`
    /// 2. a workbook-scoped name
    pub fn get(&self, name: &str, current_sheet: &str) -> Option<&NamedRange> {
        let sheet_key = Self::make_key(name, &NameScope::Sheet(current_sheet.to_string()));
        if let Some(range) = self.ranges.get(&sheet_key) {
            return Some(range);
        }

        let workbook_key = Self::make_key(name, &NameScope::Workbook);
        self.ranges.get(&workbook_key)
    }

    /// Get a named range by exact scope
    pub fn get_exact(&self, name: &str, scope: &NameScope) -> Option<&NamedRange> {
        self.ranges.get(&Self::make_key(name, scope))
    }

    /// Remove a named range
    pub fn remove(&mut self, name: &str, scope: &NameScope) -> Option<NamedRange> {
        self.ranges.remove(&Self::make_key(name, scope))
    }

    /// Check if a name exists in the given scope
    pub fn contains(&self, name: &str, scope: &NameScope) -> bool {
        self.ranges.contains_key(&Self::make_key(name, scope))
    }

    /// Iterate over all named ranges
    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.values()
    }

    /// Iterate mutably, used to rewrite `refers_to` after structural edits
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NamedRange> {
        self.ranges.values_mut()
    }

    /// Get the number of named ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
