//! Formula binding
//!
//! Connects the formula engine to the document: operands are read from the
//! workbook through [`WorkbookResolver`], and a formula's operands are turned
//! into dependency graph edges for the cell that holds it.

use crate::workbook::Workbook;
use cellgraph_core::{CellError, CellRef, Reference, ReferenceKind, Result};
use cellgraph_formula::{
    DependencyScan, EvaluationContext, FormulaResult, FormulaValue, NameTarget, ReferenceResolver,
};
use log::warn;

/// Reads operands from a workbook
#[derive(Debug, Clone, Copy)]
pub struct WorkbookResolver<'a> {
    workbook: &'a Workbook,
}

impl<'a> WorkbookResolver<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        Self { workbook }
    }
}

impl ReferenceResolver for WorkbookResolver<'_> {
    fn cell_value(&self, reference: &Reference) -> FormulaValue {
        let Some(sheet) = reference.sheet.as_deref().and_then(|s| self.workbook.sheet(s)) else {
            return FormulaValue::Error(CellError::Ref);
        };
        match sheet.get_cell(reference.start.row, reference.start.col) {
            Some(cell) => FormulaValue::from_cell(&cell.value, self.workbook.settings.date_1904),
            None => FormulaValue::Empty,
        }
    }

    /// Whole rows and columns only cover the populated part of the sheet
    fn range_values(&self, reference: &Reference) -> FormulaValue {
        let Some(sheet) = reference.sheet.as_deref().and_then(|s| self.workbook.sheet(s)) else {
            return FormulaValue::Error(CellError::Ref);
        };

        let (top, left) = (reference.start.row, reference.start.col);
        let (mut bottom, mut right) = (reference.end.row, reference.end.col);
        if matches!(
            reference.kind(),
            ReferenceKind::RowBand | ReferenceKind::ColumnBand
        ) {
            let Some(used) = sheet.used_range() else {
                return FormulaValue::Array(Vec::new());
            };
            bottom = bottom.min(used.end.row);
            right = right.min(used.end.col);
        }

        let date_1904 = self.workbook.settings.date_1904;
        let rows = (top..=bottom)
            .map(|row| {
                (left..=right)
                    .map(|col| match sheet.get_cell(row, col) {
                        Some(cell) => FormulaValue::from_cell(&cell.value, date_1904),
                        None => FormulaValue::Empty,
                    })
                    .collect()
            })
            .collect();
        FormulaValue::Array(rows)
    }

    fn resolve_name(&self, name: &str, sheet: &str) -> Option<NameTarget> {
        let named = self.workbook.names.get(name, sheet)?;
        Some(match named.reference() {
            Some(reference) => NameTarget::Reference(reference),
            None => NameTarget::Expression(named.expression().to_string()),
        })
    }
}

impl Workbook {
    /// Evaluate `formula` as if it were written in `cell`
    pub(crate) fn evaluate_formula(
        &self,
        cell: &CellRef,
        formula: &str,
    ) -> FormulaResult<FormulaValue> {
        let resolver = WorkbookResolver::new(self);
        let ctx = EvaluationContext::new(&resolver, &cell.sheet, cell.row, cell.col)
            .with_date_1904(self.settings.date_1904);
        self.engine.evaluate(formula, &ctx)
    }

    /// References and names `formula` reads, without evaluating it
    pub(crate) fn scan_formula(
        &self,
        cell: &CellRef,
        formula: &str,
    ) -> FormulaResult<DependencyScan> {
        let resolver = WorkbookResolver::new(self);
        let ctx = EvaluationContext::new(&resolver, &cell.sheet, cell.row, cell.col)
            .with_date_1904(self.settings.date_1904);
        self.engine.dependencies(formula, &ctx)
    }

    /// Register the edges of `cell`'s formula and remember what it read.
    /// Names that are not defined yet park the cell until they are.
    pub(crate) fn attach(&mut self, cell: &CellRef) -> Result<()> {
        let Some(formula) = self.effective_formula(cell) else {
            return Ok(());
        };
        let scan = self.scan_formula(cell, &formula).unwrap_or_else(|e| {
            warn!("{}: cannot read the operands of '{}': {}", cell, formula, e);
            DependencyScan::default()
        });

        for reference in &scan.references {
            self.graph.add(reference, cell)?;
        }
        for name in &scan.unresolved_names {
            self.deferred
                .entry(name.to_lowercase())
                .or_default()
                .insert(cell.clone());
        }
        if let Some(slot) = self.cell_at_mut(cell) {
            slot.dependencies = scan.references;
            slot.names = scan.names;
        }
        Ok(())
    }

    /// Unregister every edge `cell`'s formula added
    pub(crate) fn detach(&mut self, cell: &CellRef) -> Result<()> {
        let Some(slot) = self.cell_at_mut(cell) else {
            return Ok(());
        };
        let dependencies = std::mem::take(&mut slot.dependencies);
        slot.names.clear();

        for dependency in &dependencies {
            self.graph.remove(dependency, cell)?;
        }
        self.deferred.retain(|_, cells| {
            cells.remove(cell);
            !cells.is_empty()
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_core::{CellValue, RichText};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();
        for (address, value) in [
            ("Data!A1", CellValue::Number(1.0)),
            ("Data!B1", CellValue::Number(2.0)),
            ("Data!A3", CellValue::string("x")),
        ] {
            wb.cell_mut(address).unwrap().set_value(value).unwrap();
        }
        wb
    }

    #[test]
    fn test_cells_read_current_values() {
        let mut wb = workbook();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        wb.cell_mut("C1").unwrap().set_value(date).unwrap();
        wb.cell_mut("C2")
            .unwrap()
            .set_value(RichText::new().push("ab", Some(1)).push("c", None))
            .unwrap();

        let resolver = WorkbookResolver::new(&wb);
        assert_eq!(
            resolver.cell_value(&Reference::cell("data", 1, 2)),
            FormulaValue::Number(2.0)
        );
        assert_eq!(
            resolver.cell_value(&Reference::cell("Sheet1", 1, 3)),
            FormulaValue::Number(45292.0)
        );
        assert_eq!(
            resolver.cell_value(&Reference::cell("Sheet1", 2, 3)),
            FormulaValue::String("abc".into())
        );
        assert_eq!(
            resolver.cell_value(&Reference::cell("Sheet1", 9, 9)),
            FormulaValue::Empty
        );
        assert_eq!(
            resolver.cell_value(&Reference::cell("Gone", 1, 1)),
            FormulaValue::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_bands_only_cover_the_populated_extent() {
        let wb = workbook();
        let resolver = WorkbookResolver::new(&wb);

        let FormulaValue::Array(rows) = resolver.range_values(&Reference::column_band("Data", 1, 1))
        else {
            panic!("expected an array");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![FormulaValue::String("x".into())]);

        let FormulaValue::Array(rows) = resolver.range_values(&Reference::row_band("Data", 1, 1))
        else {
            panic!("expected an array");
        };
        assert_eq!(
            rows,
            vec![vec![FormulaValue::Number(1.0), FormulaValue::Number(2.0)]]
        );

        assert_eq!(
            resolver.range_values(&Reference::row_band("Sheet1", 1, 4)),
            FormulaValue::Array(Vec::new())
        );
    }

    #[test]
    fn test_names_resolve_sheet_scope_first() {
        let mut wb = workbook();
        wb.define_name("Rate", "Data!$A$1").unwrap();
        wb.define_sheet_name("Data", "Rate", "Data!$B$1").unwrap();
        wb.define_name("Half", "0.5").unwrap();

        let resolver = WorkbookResolver::new(&wb);
        assert_eq!(
            resolver.resolve_name("rate", "Sheet1"),
            Some(NameTarget::Reference(
                Reference::from_address("Data!$A$1", None).unwrap()
            ))
        );
        assert_eq!(
            resolver.resolve_name("RATE", "Data"),
            Some(NameTarget::Reference(
                Reference::from_address("Data!$B$1", None).unwrap()
            ))
        );
        assert_eq!(
            resolver.resolve_name("Half", "Data"),
            Some(NameTarget::Expression("0.5".into()))
        );
        assert_eq!(resolver.resolve_name("Missing", "Data"), None);
    }

    #[test]
    fn test_attach_and_detach_mirror_each_other() {
        let mut wb = workbook();
        wb.cell_mut("D1")
            .unwrap()
            .set_formula("SUM(Data!A1:B1)+Later")
            .unwrap();
        let d1 = CellRef::new("Sheet1", 1, 4);

        assert_eq!(
            wb.cell(&d1).unwrap().dependencies(),
            &[Reference::range("Data", 1, 1, 1, 2)]
        );
        assert!(wb.deferred["later"].contains(&d1));
        assert_eq!(
            wb.graph.get_direct_references(&CellRef::new("Data", 1, 2)).unwrap(),
            vec![d1.clone()]
        );

        wb.detach(&d1).unwrap();
        assert!(wb.graph.is_empty());
        assert!(wb.deferred.is_empty());
        assert!(wb.cell(&d1).unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_evaluation_uses_the_formula_position() {
        let wb = workbook();
        let cell = CellRef::new("Data", 5, 5);
        assert_eq!(
            wb.evaluate_formula(&cell, "A1+B1").unwrap(),
            FormulaValue::Number(3.0)
        );
        assert!(wb.evaluate_formula(&cell, "SUM(").is_err());
    }
}
