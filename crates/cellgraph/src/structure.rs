//! Row and column insertion and deletion
//!
//! A structural edit on sheet `S` along an axis at `index` touches two sets
//! of formula cells: those whose operands reach into `S` at or past `index`
//! (their text is rewritten) and those that live on `S` at or past `index`
//! (their position changes). Both are detached from the graph before the
//! lines move and attached again at their new positions afterwards, so the
//! graph never holds an edge for a text that is no longer stored.

use crate::workbook::Workbook;
use cellgraph_core::{sheet_names_equal, Axis, CellRef, Error, Reference, Result, MAX_COLS};
use cellgraph_formula::FormulaTextRewriter;
use log::debug;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Insert,
    Delete,
}

impl Workbook {
    /// Insert an empty line at `index` on sheet number `sheet`. Returns the
    /// cells that were recalculated.
    pub(crate) fn insert_line(
        &mut self,
        sheet: usize,
        axis: Axis,
        index: u32,
    ) -> Result<Vec<CellRef>> {
        self.structural_edit(sheet, axis, index, Edit::Insert)
    }

    /// Delete line `index` on sheet number `sheet`. Returns the cells that
    /// were recalculated.
    pub(crate) fn delete_line(
        &mut self,
        sheet: usize,
        axis: Axis,
        index: u32,
    ) -> Result<Vec<CellRef>> {
        self.structural_edit(sheet, axis, index, Edit::Delete)
    }

    fn structural_edit(
        &mut self,
        sheet: usize,
        axis: Axis,
        index: u32,
        edit: Edit,
    ) -> Result<Vec<CellRef>> {
        check_index(axis, index)?;
        let name = self.sheets[sheet].name().to_string();

        let band = Reference::band(name.clone(), axis, index, axis.max_index());
        let affected: BTreeSet<CellRef> =
            self.graph.get_direct_references_in(&band)?.into_iter().collect();
        let mut touched = affected.clone();
        touched.extend(
            self.formula_cells()
                .into_iter()
                .filter(|c| sheet_names_equal(&c.sheet, &name) && c.index(axis) >= index),
        );

        self.dissolve_groups_of(&touched)?;
        for cell in &touched {
            self.detach(cell)?;
        }

        let mut rewritten = 0;
        for cell in &affected {
            if edit == Edit::Delete && on_line(cell, &name, axis, index) {
                continue;
            }
            let Some(slot) = self.cell_at_mut(cell) else {
                continue;
            };
            let Some(formula) = slot.formula.as_deref() else {
                continue;
            };
            let text = rewrite(formula, &cell.sheet, &name, axis, index, edit);
            if text != formula {
                slot.formula = Some(text);
                rewritten += 1;
            }
        }
        let renamed = self.rewrite_names(&name, axis, index, edit);

        match edit {
            Edit::Insert => self.sheets[sheet].insert_line(axis, index),
            Edit::Delete => self.sheets[sheet].remove_line(axis, index),
        }

        let survivors: Vec<CellRef> = touched
            .iter()
            .filter_map(|cell| moved(cell, &name, axis, index, edit))
            .collect();
        for cell in &survivors {
            self.attach(cell)?;
        }

        debug!(
            "'{}': {:?} {:?} {}, {} formulas and {} names rewritten, {} cells re-registered",
            name,
            edit,
            axis,
            index,
            rewritten,
            renamed,
            survivors.len()
        );
        self.propagate(&survivors, true)
    }

    /// Turn every shared group with a member in `cells` into normal formulas
    fn dissolve_groups_of(&mut self, cells: &BTreeSet<CellRef>) -> Result<()> {
        let mut groups = BTreeSet::new();
        for cell in cells {
            if let Some(id) = self.cell_at(cell).and_then(|c| c.shared_formula_id) {
                let sheet = self
                    .sheet_index(&cell.sheet)
                    .ok_or_else(|| Error::SheetNotFound(cell.sheet.clone()))?;
                groups.insert((sheet, id));
            }
        }
        for (sheet, id) in groups {
            self.dissolve_group(sheet, id);
        }
        Ok(())
    }

    fn rewrite_names(&mut self, target: &str, axis: Axis, index: u32, edit: Edit) -> usize {
        let mut count = 0;
        for named in self.names.iter_mut() {
            let current = named.scope.sheet().unwrap_or("").to_string();
            let text = rewrite(&named.refers_to, &current, target, axis, index, edit);
            if text != named.refers_to {
                named.refers_to = text;
                count += 1;
            }
        }
        count
    }
}

fn check_index(axis: Axis, index: u32) -> Result<()> {
    if index >= 1 && index <= axis.max_index() {
        return Ok(());
    }
    Err(match axis {
        Axis::Row => Error::RowOutOfBounds(index, axis.max_index()),
        Axis::Column => Error::ColumnOutOfBounds(index, MAX_COLS),
    })
}

fn rewrite(formula: &str, current: &str, target: &str, axis: Axis, index: u32, edit: Edit) -> String {
    match edit {
        Edit::Insert => {
            FormulaTextRewriter::replace_line_number(formula, current, target, axis, index, 1)
        }
        Edit::Delete => FormulaTextRewriter::delete_line(formula, current, target, axis, index),
    }
}

fn on_line(cell: &CellRef, sheet: &str, axis: Axis, index: u32) -> bool {
    sheet_names_equal(&cell.sheet, sheet) && cell.index(axis) == index
}

/// Where `cell` ends up after the edit, or `None` if it is gone
fn moved(cell: &CellRef, sheet: &str, axis: Axis, index: u32, edit: Edit) -> Option<CellRef> {
    let i = cell.index(axis);
    if !sheet_names_equal(&cell.sheet, sheet) || i < index {
        return Some(cell.clone());
    }
    match edit {
        Edit::Insert if i >= axis.max_index() => None,
        Edit::Insert => Some(cell.with_index(axis, i + 1)),
        Edit::Delete if i == index => None,
        Edit::Delete => Some(cell.with_index(axis, i - 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_core::{CellValue, MAX_ROWS};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_positions_after_an_edit() {
        let c5 = CellRef::new("Sheet1", 5, 3);
        assert_eq!(
            moved(&c5, "sheet1", Axis::Row, 5, Edit::Insert),
            Some(CellRef::new("Sheet1", 6, 3))
        );
        assert_eq!(moved(&c5, "Sheet1", Axis::Row, 5, Edit::Delete), None);
        assert_eq!(
            moved(&c5, "Sheet1", Axis::Column, 2, Edit::Delete),
            Some(CellRef::new("Sheet1", 5, 2))
        );
        assert_eq!(
            moved(&c5, "Other", Axis::Row, 1, Edit::Insert),
            Some(c5.clone())
        );

        let last = CellRef::new("Sheet1", MAX_ROWS, 1);
        assert_eq!(moved(&last, "Sheet1", Axis::Row, 10, Edit::Insert), None);
    }

    #[test]
    fn test_indexes_are_checked() {
        assert!(matches!(
            check_index(Axis::Row, 0),
            Err(Error::RowOutOfBounds(0, _))
        ));
        assert!(matches!(
            check_index(Axis::Column, MAX_COLS as u32 + 1),
            Err(Error::ColumnOutOfBounds(_, MAX_COLS))
        ));
        assert!(check_index(Axis::Row, MAX_ROWS).is_ok());
    }

    #[test]
    fn test_formulas_follow_their_operands() {
        let mut wb = Workbook::new();
        wb.cell_mut("A5").unwrap().set_value(4.0).unwrap();
        wb.cell_mut("B1").unwrap().set_formula("A5*2").unwrap();
        wb.cell_mut("B9").unwrap().set_formula("A5+B1").unwrap();

        let recalculated = wb.insert_line(0, Axis::Row, 3).unwrap();
        assert_eq!(wb.formula("B1").unwrap().as_deref(), Some("A6*2"));
        assert_eq!(wb.formula("B10").unwrap().as_deref(), Some("A6+B1"));
        assert_eq!(wb.value("B10").unwrap(), CellValue::Number(12.0));
        assert!(wb.cell(&CellRef::new("Sheet1", 9, 2)).is_none());
        assert!(recalculated.contains(&CellRef::new("Sheet1", 10, 2)));

        wb.delete_line(0, Axis::Row, 6).unwrap();
        assert_eq!(wb.formula("B1").unwrap().as_deref(), Some("#REF!*2"));
        assert_eq!(wb.formula("B9").unwrap().as_deref(), Some("#REF!+B1"));
        assert_eq!(
            wb.dependency_graph()
                .get_direct_references(&CellRef::new("Sheet1", 1, 2))
                .unwrap(),
            vec![CellRef::new("Sheet1", 9, 2)]
        );
    }
}
