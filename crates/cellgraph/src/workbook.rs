//! Workbook type - owns the sheets, the dependency graph and defined names

use crate::cell::{Cell, CellMut};
use crate::shared::{CascadeClear, HostLossPolicy};
use crate::sheet::{Sheet, SheetMut};
use cellgraph_core::{
    sheet_names_equal, CellRef, CellValue, Error, NameScope, NamedRange, NamedRangeCollection,
    Result, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};
use cellgraph_formula::{DefaultEngine, DependencyGraph, FormulaEngine};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Workbook-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac)
    pub date_1904: bool,
    /// Recalculate dependents on every write. When off, formulas still
    /// register their dependencies and [`Workbook::calculate`] catches up.
    pub auto_calculate: bool,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            date_1904: false,
            auto_calculate: true,
        }
    }
}

/// A workbook (spreadsheet document)
///
/// The workbook owns every sheet and the single dependency graph shared
/// between them. Cells are addressed by [`CellRef`] handles rather than
/// references into the sheet tree, so reads go through [`Workbook::sheet`]
/// and writes through [`Workbook::cell_mut`] or [`Workbook::sheet_mut`].
///
/// # Example
///
/// ```rust
/// use cellgraph::prelude::*;
///
/// let mut wb = Workbook::new();
/// wb.cell_mut("A1")?.set_value(1.0)?;
/// wb.cell_mut("A2")?.set_value(2.0)?;
/// wb.cell_mut("A3")?.set_formula("=A1+A2")?;
/// assert_eq!(wb.value("A3")?, CellValue::Number(3.0));
///
/// wb.cell_mut("A2")?.set_value(5.0)?;
/// assert_eq!(wb.value("A3")?, CellValue::Number(6.0));
/// # Ok::<(), cellgraph::Error>(())
/// ```
#[derive(Debug)]
pub struct Workbook {
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) graph: DependencyGraph,
    pub(crate) names: NamedRangeCollection,
    pub(crate) settings: WorkbookSettings,
    pub(crate) engine: Arc<dyn FormulaEngine>,
    pub(crate) host_loss: Arc<dyn HostLossPolicy>,
    /// Formulas waiting for a name to be defined, keyed by lowercase name
    pub(crate) deferred: BTreeMap<String, BTreeSet<CellRef>>,
}

impl Workbook {
    /// Create a new workbook with one sheet named "Sheet1"
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.sheets.push(Sheet::new("Sheet1"));
        wb
    }

    /// Create a workbook with no sheets
    pub fn empty() -> Self {
        Self {
            sheets: Vec::new(),
            graph: DependencyGraph::new(),
            names: NamedRangeCollection::new(),
            settings: WorkbookSettings::default(),
            engine: Arc::new(DefaultEngine),
            host_loss: Arc::new(CascadeClear),
            deferred: BTreeMap::new(),
        }
    }

    /// Use a different formula engine
    pub fn with_engine(mut self, engine: impl FormulaEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Use a different policy for shared groups that lose their host
    pub fn with_host_loss_policy(mut self, policy: impl HostLossPolicy + 'static) -> Self {
        self.host_loss = Arc::new(policy);
        self
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    // ==================== Sheets ====================

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Add a sheet at the end. Returns its index.
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.sheets.push(Sheet::new(name));
        Ok(self.sheets.len() - 1)
    }

    /// Get a sheet by name (case-insensitive)
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| sheet_names_equal(s.name(), name))
    }

    pub fn sheet_at(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter()
    }

    /// Get the index of a sheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| sheet_names_equal(s.name(), name))
    }

    /// Mutable handle to a sheet
    pub fn sheet_mut(&mut self, name: &str) -> Result<SheetMut<'_>> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        Ok(SheetMut::new(self, index))
    }

    // ==================== Cells ====================

    /// The cell behind a handle, if it exists
    pub fn cell(&self, cell: &CellRef) -> Option<&Cell> {
        self.cell_at(cell)
    }

    /// Mutable handle to the cell at `address` (`Sheet2!B4`, or `B4` on the first sheet)
    pub fn cell_mut(&mut self, address: &str) -> Result<CellMut<'_>> {
        let cell = self.resolve_address(address)?;
        Ok(CellMut::new(self, cell))
    }

    /// Current value at `address`
    pub fn value(&self, address: &str) -> Result<CellValue> {
        let cell = self.resolve_address(address)?;
        Ok(self.cell_at(&cell).map(|c| c.value.clone()).unwrap_or_default())
    }

    /// Effective formula at `address`
    pub fn formula(&self, address: &str) -> Result<Option<String>> {
        let cell = self.resolve_address(address)?;
        Ok(self.effective_formula(&cell))
    }

    /// The dependency graph shared by every sheet
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    // ==================== Named Ranges ====================

    /// Define a workbook-scoped name. Formulas that were waiting for it are
    /// re-registered and recalculated; those cells are returned.
    ///
    /// # Example
    /// ```
    /// use cellgraph::Workbook;
    ///
    /// let mut wb = Workbook::new();
    /// wb.define_name("TaxRate", "Sheet1!$B$1").unwrap();
    /// ```
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<Vec<CellRef>> {
        self.names
            .define(NamedRange::workbook_scope(name, refers_to))?;
        self.refresh_name(name)
    }

    /// Define a name visible only to formulas on `sheet`
    pub fn define_sheet_name(
        &mut self,
        sheet: &str,
        name: &str,
        refers_to: &str,
    ) -> Result<Vec<CellRef>> {
        let sheet = self
            .sheet(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?
            .name()
            .to_string();
        self.names
            .define(NamedRange::sheet_scope(name, refers_to, sheet))?;
        self.refresh_name(name)
    }

    /// Remove a workbook-scoped name; formulas using it recalculate to `#NAME?`
    pub fn remove_name(&mut self, name: &str) -> Result<Option<NamedRange>> {
        let removed = self.names.remove(name, &NameScope::Workbook);
        if removed.is_some() {
            self.refresh_name(name)?;
        }
        Ok(removed)
    }

    pub fn remove_sheet_name(&mut self, sheet: &str, name: &str) -> Result<Option<NamedRange>> {
        let sheet = self
            .sheet(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?
            .name()
            .to_string();
        let removed = self.names.remove(name, &NameScope::Sheet(sheet));
        if removed.is_some() {
            self.refresh_name(name)?;
        }
        Ok(removed)
    }

    pub fn named_ranges(&self) -> &NamedRangeCollection {
        &self.names
    }

    // ==================== Internal lookups ====================

    /// Canonical handle for `sheet!(row, col)`, checking bounds
    pub(crate) fn locate(&self, sheet: &str, row: u32, col: u16) -> Result<CellRef> {
        let sheet = self
            .sheet(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        if col == 0 || col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS));
        }
        Ok(CellRef::new(sheet.name(), row, col))
    }

    pub(crate) fn resolve_address(&self, address: &str) -> Result<CellRef> {
        let default = self.sheets.first().map(|s| s.name());
        let cell = CellRef::parse(address, default)?;
        self.locate(&cell.sheet, cell.row, cell.col)
    }

    pub(crate) fn cell_at(&self, cell: &CellRef) -> Option<&Cell> {
        self.sheet(&cell.sheet)?.get_cell(cell.row, cell.col)
    }

    pub(crate) fn cell_at_mut(&mut self, cell: &CellRef) -> Option<&mut Cell> {
        let index = self.sheet_index(&cell.sheet)?;
        self.sheets[index].cell_mut(cell.row, cell.col)
    }

    pub(crate) fn cell_entry(&mut self, cell: &CellRef) -> Result<&mut Cell> {
        let index = self
            .sheet_index(&cell.sheet)
            .ok_or_else(|| Error::SheetNotFound(cell.sheet.clone()))?;
        Ok(self.sheets[index].cell_entry(cell.row, cell.col))
    }

    pub(crate) fn effective_formula(&self, cell: &CellRef) -> Option<String> {
        self.sheet(&cell.sheet)?.formula_at(cell.row, cell.col)
    }

    /// Every cell carrying a formula, sheet by sheet
    pub(crate) fn formula_cells(&self) -> Vec<CellRef> {
        self.sheets
            .iter()
            .flat_map(|sheet| {
                sheet
                    .formula_positions()
                    .map(move |(row, col)| CellRef::new(sheet.name(), row, col))
            })
            .collect()
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
        if name.starts_with('\'') || name.ends_with('\'') {
            return Err(Error::InvalidSheetName(
                "Sheet name cannot start or end with an apostrophe".into(),
            ));
        }

        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet_at(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.settings(), &WorkbookSettings::default());
        assert!(wb.settings().auto_calculate);
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_sheet("Data").unwrap(), 1);

        assert!(matches!(
            wb.add_sheet("SHEET1"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert!(wb.add_sheet("").is_err());
        assert!(wb.add_sheet("Sheet/1").is_err());
        assert!(wb.add_sheet("Sheet[1]").is_err());
        assert!(wb.add_sheet("'quoted").is_err());
        assert!(wb.add_sheet(&"A".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_sheet_lookup_is_case_insensitive() {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();
        assert_eq!(wb.sheet("data").unwrap().name(), "Data");
        assert_eq!(wb.sheet_index("DATA"), Some(1));
        assert!(matches!(wb.sheet_mut("Missing"), Err(Error::SheetNotFound(_))));
    }

    #[test]
    fn test_addresses_resolve_to_canonical_handles() {
        let mut wb = Workbook::new();
        wb.add_sheet("Q1 Data").unwrap();

        assert_eq!(
            wb.resolve_address("'q1 data'!B4").unwrap(),
            CellRef::new("Q1 Data", 4, 2)
        );
        assert_eq!(wb.resolve_address("C2").unwrap(), CellRef::new("Sheet1", 2, 3));
        assert!(matches!(
            wb.resolve_address("Nope!A1"),
            Err(Error::SheetNotFound(_))
        ));
        assert!(wb.locate("Sheet1", 0, 1).unwrap_err().is_range_error());
        assert!(wb.locate("Sheet1", 1, MAX_COLS + 1).unwrap_err().is_range_error());
    }

    #[test]
    fn test_reading_missing_cells() {
        let wb = Workbook::new();
        assert_eq!(wb.value("Z99").unwrap(), CellValue::Empty);
        assert_eq!(wb.formula("Z99").unwrap(), None);
        assert!(wb.value("not an address").is_err());
    }
}
