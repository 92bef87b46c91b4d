//! Cells and the mutable cell handle
//!
//! A [`Cell`] is plain state owned by its [`Row`](crate::Row). It never
//! points back at its row, sheet or workbook; mutation goes through a
//! [`CellMut`], a short-lived handle made of the workbook borrow plus the
//! cell's [`CellRef`].

use crate::workbook::Workbook;
use cellgraph_core::{CellRef, CellValue, Reference, Result};

/// How a cell gets its formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaType {
    /// A plain value or nothing at all
    None,
    /// The cell owns its formula text
    Normal,
    /// The cell belongs to a shared formula group
    Shared,
}

/// State of one cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub(crate) value: CellValue,
    /// Stored text without the leading `=`; followers of a shared group have none
    pub(crate) formula: Option<String>,
    pub(crate) shared_formula_id: Option<u32>,
    /// References the formula reads, kept so their edges can be unregistered
    pub(crate) dependencies: Vec<Reference>,
    /// Defined names the formula mentions
    pub(crate) names: Vec<String>,
    pub(crate) style_id: Option<u32>,
}

impl Cell {
    /// Current value; for a formula cell, its last result
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    /// Formula text stored on this cell.
    ///
    /// Followers of a shared group store none; use
    /// [`Sheet::formula_at`](crate::Sheet::formula_at) for the effective text.
    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    pub fn formula_type(&self) -> FormulaType {
        if self.shared_formula_id.is_some() {
            FormulaType::Shared
        } else if self.formula.is_some() {
            FormulaType::Normal
        } else {
            FormulaType::None
        }
    }

    pub fn shared_formula_id(&self) -> Option<u32> {
        self.shared_formula_id
    }

    /// References the cell's formula reads
    pub fn dependencies(&self) -> &[Reference] {
        &self.dependencies
    }

    pub fn style_id(&self) -> Option<u32> {
        self.style_id
    }

    pub(crate) fn has_formula(&self) -> bool {
        self.formula.is_some() || self.shared_formula_id.is_some()
    }

    /// Drop value and formula state, keeping the style
    pub(crate) fn reset(&mut self) {
        self.value = CellValue::Empty;
        self.formula = None;
        self.shared_formula_id = None;
        self.dependencies.clear();
        self.names.clear();
    }

    /// True when removing the cell loses nothing
    pub(crate) fn is_blank(&self) -> bool {
        self.value.is_empty() && !self.has_formula() && self.style_id.is_none()
    }
}

/// Mutable handle to one cell of a workbook
///
/// Every write recalculates the cells that depend on this one before it
/// returns, and reports which cells were recalculated.
#[derive(Debug)]
pub struct CellMut<'a> {
    workbook: &'a mut Workbook,
    cell: CellRef,
}

impl<'a> CellMut<'a> {
    pub(crate) fn new(workbook: &'a mut Workbook, cell: CellRef) -> Self {
        Self { workbook, cell }
    }

    /// Identity of the cell
    pub fn cell_ref(&self) -> &CellRef {
        &self.cell
    }

    pub fn value(&self) -> CellValue {
        self.workbook
            .cell_at(&self.cell)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Effective formula text, derived from the host for shared followers
    pub fn formula(&self) -> Option<String> {
        self.workbook.effective_formula(&self.cell)
    }

    pub fn style_id(&self) -> Option<u32> {
        self.workbook.cell_at(&self.cell).and_then(|c| c.style_id)
    }

    /// Store a plain value, dropping any formula
    pub fn set_value(&mut self, value: impl Into<CellValue>) -> Result<Vec<CellRef>> {
        self.workbook.write_value(&self.cell, value.into())
    }

    /// Store and evaluate a formula. Writing the formula the cell already
    /// has is a no-op.
    pub fn set_formula(&mut self, formula: &str) -> Result<Vec<CellRef>> {
        self.workbook.write_formula(&self.cell, formula)
    }

    /// Store a formula with a known result without evaluating anything
    pub fn set_formula_with_result(
        &mut self,
        formula: &str,
        cached: impl Into<CellValue>,
    ) -> Result<()> {
        self.workbook
            .write_formula_with_result(&self.cell, formula, cached.into())
    }

    /// Reset value and formula. Clearing a shared host consults the
    /// workbook's [`HostLossPolicy`](crate::HostLossPolicy).
    pub fn clear(&mut self) -> Result<Vec<CellRef>> {
        self.workbook.clear_cell(&self.cell)
    }

    pub fn set_style_id(&mut self, style_id: Option<u32>) -> Result<()> {
        self.workbook.cell_entry(&self.cell)?.style_id = style_id;
        Ok(())
    }

    /// Turn a shared formula member into a normal formula. Doing this to
    /// the host dissolves its whole group.
    pub fn shared_formula_to_normal(&mut self) -> Result<()> {
        self.workbook.materialize(&self.cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_type_follows_state() {
        let mut cell = Cell::default();
        assert_eq!(cell.formula_type(), FormulaType::None);

        cell.formula = Some("A1+1".into());
        assert_eq!(cell.formula_type(), FormulaType::Normal);

        cell.shared_formula_id = Some(2);
        assert_eq!(cell.formula_type(), FormulaType::Shared);
    }

    #[test]
    fn test_reset_keeps_the_style() {
        let mut cell = Cell {
            value: CellValue::Number(3.0),
            formula: Some("1+2".into()),
            style_id: Some(4),
            ..Default::default()
        };
        cell.reset();
        assert_eq!(cell.value(), &CellValue::Empty);
        assert_eq!(cell.formula(), None);
        assert_eq!(cell.style_id(), Some(4));
        assert!(!cell.is_blank());
    }
}
