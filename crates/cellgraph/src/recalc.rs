//! Recalculation protocol
//!
//! Writes are synchronous. A write changes the cell's own state, asks the
//! dependency graph which cells sit downstream of it and evaluates those in
//! order before returning. Cells found on a dependency cycle are not
//! evaluated; they get `#CIRC!`.
//!
//! An evaluation failure never aborts a pass: the failing cell is left
//! empty, a warning is logged and its siblings still recalculate.

use crate::shared::HostLossAction;
use crate::workbook::Workbook;
use cellgraph_core::{CellError, CellRef, CellValue, Error, Result};
use cellgraph_formula::CalculationOrder;
use log::{debug, trace, warn};
use std::collections::BTreeSet;

/// Statistics from a full recalculation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Number of formula cells in the workbook
    pub formula_count: usize,
    /// Number of cells evaluated
    pub cells_calculated: usize,
    /// Number of cells found on a dependency cycle
    pub circular_references: usize,
    /// Number of formulas the engine failed to evaluate
    pub errors: usize,
}

#[derive(Debug, Default)]
struct Pass {
    evaluated: Vec<CellRef>,
    circular: Vec<CellRef>,
    errors: usize,
}

impl Pass {
    fn into_cells(mut self) -> Vec<CellRef> {
        self.evaluated.append(&mut self.circular);
        self.evaluated
    }
}

/// Why a cell is giving up its formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// A new formula is about to be written
    Overwrite,
    /// The cell is being cleared or set to a plain value
    Clear,
}

/// Formula text as stored: trimmed, without the leading `=`
pub(crate) fn normalize_formula(formula: &str) -> Result<String> {
    let text = formula.trim();
    let text = text.strip_prefix('=').unwrap_or(text).trim();
    if text.is_empty() {
        return Err(Error::Formula("empty formula".into()));
    }
    Ok(text.to_string())
}

impl Workbook {
    /// Recalculate every formula in the workbook in dependency order
    pub fn calculate(&mut self) -> Result<CalculationStats> {
        let formulas = self.formula_cells();
        let order = self.graph.calculation_order_from(&formulas, true)?;
        let pass = self.run(order);

        let stats = CalculationStats {
            formula_count: formulas.len(),
            cells_calculated: pass.evaluated.len(),
            circular_references: pass.circular.len(),
            errors: pass.errors,
        };
        debug!(
            "calculated {} of {} formulas ({} circular, {} failed)",
            stats.cells_calculated, stats.formula_count, stats.circular_references, stats.errors
        );
        Ok(stats)
    }

    pub(crate) fn write_value(&mut self, cell: &CellRef, value: CellValue) -> Result<Vec<CellRef>> {
        let mut changed = vec![cell.clone()];
        changed.extend(self.release_formula(cell, Release::Clear)?);
        self.cell_entry(cell)?.value = value;
        self.prune(cell);
        self.propagate(&changed, false)
    }

    pub(crate) fn write_formula(&mut self, cell: &CellRef, formula: &str) -> Result<Vec<CellRef>> {
        let text = normalize_formula(formula)?;
        if self.effective_formula(cell).as_deref() == Some(text.as_str()) {
            return Ok(Vec::new());
        }

        self.release_formula(cell, Release::Overwrite)?;
        let slot = self.cell_entry(cell)?;
        slot.value = CellValue::Empty;
        slot.formula = Some(text);
        self.attach(cell)?;
        self.propagate(std::slice::from_ref(cell), true)
    }

    pub(crate) fn write_formula_with_result(
        &mut self,
        cell: &CellRef,
        formula: &str,
        cached: CellValue,
    ) -> Result<()> {
        let text = normalize_formula(formula)?;
        self.release_formula(cell, Release::Overwrite)?;
        let slot = self.cell_entry(cell)?;
        slot.value = cached;
        slot.formula = Some(text);
        self.attach(cell)
    }

    pub(crate) fn clear_cell(&mut self, cell: &CellRef) -> Result<Vec<CellRef>> {
        let mut changed = vec![cell.clone()];
        changed.extend(self.release_formula(cell, Release::Clear)?);
        if let Some(slot) = self.cell_at_mut(cell) {
            slot.reset();
        }
        self.prune(cell);
        self.propagate(&changed, false)
    }

    /// Drop `cell`'s formula and its edges. A shared host hands its group
    /// over first; the cells that were cleared along with it are returned.
    pub(crate) fn release_formula(&mut self, cell: &CellRef, why: Release) -> Result<Vec<CellRef>> {
        let mut cleared = Vec::new();

        if let Some(id) = self.cell_at(cell).and_then(|c| c.shared_formula_id) {
            let sheet = self
                .sheet_index(&cell.sheet)
                .ok_or_else(|| Error::SheetNotFound(cell.sheet.clone()))?;
            let action = match self.sheets[sheet].shared.get(&id) {
                Some(group) if group.host() == (cell.row, cell.col) => Some(match why {
                    Release::Overwrite => HostLossAction::MaterializeFollowers,
                    Release::Clear => self.host_loss.on_host_cleared(group),
                }),
                _ => None,
            };

            match action {
                Some(HostLossAction::MaterializeFollowers) => self.dissolve_group(sheet, id),
                Some(HostLossAction::ClearFollowers) => {
                    cleared = self.drop_group(sheet, id, Some((cell.row, cell.col)))?;
                }
                None => self.materialize_member(sheet, id, cell.row, cell.col),
            }
        }

        self.detach(cell)?;
        if let Some(slot) = self.cell_at_mut(cell) {
            slot.formula = None;
            slot.shared_formula_id = None;
        }
        Ok(cleared)
    }

    /// Recalculate what depends on `sources`. With `include_sources` the
    /// sources are formulas that need evaluating themselves.
    pub(crate) fn propagate(
        &mut self,
        sources: &[CellRef],
        include_sources: bool,
    ) -> Result<Vec<CellRef>> {
        if !self.settings.auto_calculate {
            let mut pass = Pass::default();
            if include_sources {
                for cell in sources {
                    self.evaluate_cell(cell, &mut pass);
                }
            }
            return Ok(pass.into_cells());
        }

        let order = self.graph.calculation_order_from(sources, include_sources)?;
        Ok(self.run(order).into_cells())
    }

    /// Re-register and recalculate every formula that mentions `name` or
    /// was waiting for it
    pub(crate) fn refresh_name(&mut self, name: &str) -> Result<Vec<CellRef>> {
        let key = name.to_lowercase();
        let mut cells: BTreeSet<CellRef> = self.deferred.remove(&key).unwrap_or_default();
        let mentioning: Vec<CellRef> = self
            .formula_cells()
            .into_iter()
            .filter(|c| {
                self.cell_at(c)
                    .is_some_and(|cell| cell.names.iter().any(|n| n.to_lowercase() == key))
            })
            .collect();
        cells.extend(mentioning);

        for cell in &cells {
            self.detach(cell)?;
            self.attach(cell)?;
        }
        debug!("name '{}' changed, {} formulas re-registered", name, cells.len());

        let cells: Vec<CellRef> = cells.into_iter().collect();
        self.propagate(&cells, true)
    }

    pub(crate) fn prune(&mut self, cell: &CellRef) {
        if let Some(index) = self.sheet_index(&cell.sheet) {
            self.sheets[index].prune(cell.row, cell.col);
        }
    }

    fn run(&mut self, order: CalculationOrder) -> Pass {
        let mut pass = Pass::default();

        for cell in &order.circular {
            let Some(slot) = self.cell_at_mut(cell).filter(|c| c.has_formula()) else {
                continue;
            };
            slot.value = CellValue::Error(CellError::Circular);
            warn!("{}: circular reference", cell);
            pass.circular.push(cell.clone());
        }
        for cell in &order.cells {
            self.evaluate_cell(cell, &mut pass);
        }
        pass
    }

    fn evaluate_cell(&mut self, cell: &CellRef, pass: &mut Pass) {
        let Some(formula) = self.effective_formula(cell) else {
            return;
        };
        let value = match self.evaluate_formula(cell, &formula) {
            Ok(value) => CellValue::from(value),
            Err(e) => {
                warn!("{}: cannot evaluate '{}': {}", cell, formula, e);
                pass.errors += 1;
                CellValue::Empty
            }
        };
        trace!("{} = {}", cell, value);
        if let Some(slot) = self.cell_at_mut(cell) {
            slot.value = value;
        }
        pass.evaluated.push(cell.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formulas_are_stored_without_the_equals_sign() {
        assert_eq!(normalize_formula("=A1+1").unwrap(), "A1+1");
        assert_eq!(normalize_formula("  = SUM(A1:A3) ").unwrap(), "SUM(A1:A3)");
        assert_eq!(normalize_formula("B2").unwrap(), "B2");
        assert!(matches!(normalize_formula(" = "), Err(Error::Formula(_))));
    }

    #[test]
    fn test_failures_leave_the_cell_empty_and_are_counted() {
        let mut wb = Workbook::new();
        wb.cell_mut("A1").unwrap().set_value(2.0).unwrap();
        wb.cell_mut("B1").unwrap().set_formula("A1*").unwrap();
        wb.cell_mut("C1").unwrap().set_formula("NOSUCHFN(A1)").unwrap();
        wb.cell_mut("D1").unwrap().set_formula("A1*3").unwrap();

        assert_eq!(wb.value("B1").unwrap(), CellValue::Empty);
        assert_eq!(wb.value("C1").unwrap(), CellValue::Empty);
        assert_eq!(wb.value("D1").unwrap(), CellValue::Number(6.0));

        let stats = wb.calculate().unwrap();
        assert_eq!(
            stats,
            CalculationStats {
                formula_count: 3,
                cells_calculated: 3,
                circular_references: 0,
                errors: 2,
            }
        );
    }

    #[test]
    fn test_writing_the_same_formula_twice_is_a_no_op() {
        let mut wb = Workbook::new();
        wb.cell_mut("A1").unwrap().set_value(1.0).unwrap();
        let first = wb.cell_mut("B1").unwrap().set_formula("=A1+1").unwrap();
        assert_eq!(first, vec![CellRef::new("Sheet1", 1, 2)]);

        let again = wb.cell_mut("B1").unwrap().set_formula("A1+1").unwrap();
        assert!(again.is_empty());
        assert_eq!(wb.dependency_graph().edge_count(), 1);
    }
}
