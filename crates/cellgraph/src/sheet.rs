//! Sheet type and the mutable sheet handle

use crate::cell::{Cell, CellMut};
use crate::row::Row;
use crate::shared::SharedFormulaGroup;
use crate::workbook::Workbook;
use cellgraph_core::{
    Axis, CellAddress, CellRef, Column, Error, Reference, ReferenceKind, Result, MAX_COLS,
    MAX_ROWS,
};
use log::warn;
use std::collections::BTreeMap;

/// A worksheet: rows ordered by number, column metadata and shared
/// formula groups
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    pub(crate) rows: BTreeMap<u32, Row>,
    pub(crate) columns: BTreeMap<u16, Column>,
    pub(crate) shared: BTreeMap<u32, SharedFormulaGroup>,
    pub(crate) max_shared_id: u32,
}

impl Sheet {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            columns: BTreeMap::new(),
            shared: BTreeMap::new(),
            max_shared_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell at `(row, col)`, if one has been created
    pub fn get_cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&col)
    }

    /// Current value at `(row, col)`, empty when there is no cell
    pub fn value_at(&self, row: u32, col: u16) -> cellgraph_core::CellValue {
        self.get_cell(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Effective formula at `(row, col)`. Followers of a shared group get
    /// the host's text moved by their offset.
    pub fn formula_at(&self, row: u32, col: u16) -> Option<String> {
        let cell = self.get_cell(row, col)?;
        if let Some(text) = &cell.formula {
            return Some(text.clone());
        }
        let group = self.shared.get(&cell.shared_formula_id?)?;
        Some(group.formula_for(row, col))
    }

    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows.get(&index)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Populated cells of column `col`, in row order
    pub fn column(&self, col: u16) -> impl Iterator<Item = (u32, &Cell)> + '_ {
        self.rows
            .iter()
            .filter_map(move |(&row, r)| r.cells.get(&col).map(|cell| (row, cell)))
    }

    /// Width, visibility and style of column `col`, when customized
    pub fn column_meta(&self, col: u16) -> Option<&Column> {
        self.columns.get(&col)
    }

    /// Bounding reference of every populated cell
    pub fn used_range(&self) -> Option<Reference> {
        let first_row = *self.rows.iter().find(|(_, r)| !r.cells.is_empty())?.0;
        let last_row = *self.rows.iter().rev().find(|(_, r)| !r.cells.is_empty())?.0;
        let first_col = self.rows.values().filter_map(|r| r.cells.keys().next()).min()?;
        let last_col = self.rows.values().filter_map(|r| r.cells.keys().next_back()).max()?;
        Some(Reference::range(
            self.name.clone(),
            first_row,
            *first_col,
            last_row,
            *last_col,
        ))
    }

    pub fn shared_formula(&self, id: u32) -> Option<&SharedFormulaGroup> {
        self.shared.get(&id)
    }

    /// Highest shared formula id issued on this sheet, 0 when none
    pub fn max_shared_formula_id(&self) -> u32 {
        self.max_shared_id
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.cells.len()).sum()
    }

    /// Every cell carrying a formula, as `(row, col)`
    pub(crate) fn formula_positions(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.rows.iter().flat_map(|(&row, r)| {
            r.cells
                .iter()
                .filter(|(_, c)| c.has_formula())
                .map(move |(&col, _)| (row, col))
        })
    }

    pub(crate) fn cell_mut(&mut self, row: u32, col: u16) -> Option<&mut Cell> {
        self.rows.get_mut(&row)?.cells.get_mut(&col)
    }

    /// The cell at `(row, col)`, created on first access
    pub(crate) fn cell_entry(&mut self, row: u32, col: u16) -> &mut Cell {
        self.rows
            .entry(row)
            .or_insert_with(|| Row::new(row))
            .cells
            .entry(col)
            .or_default()
    }

    /// Remove the cell when it no longer holds anything
    pub(crate) fn prune(&mut self, row: u32, col: u16) {
        let Some(r) = self.rows.get_mut(&row) else {
            return;
        };
        if r.cells.get(&col).is_some_and(Cell::is_blank) {
            r.cells.remove(&col);
        }
        if r.is_vacant() {
            self.rows.remove(&row);
        }
    }

    pub(crate) fn next_shared_id(&mut self) -> u32 {
        self.max_shared_id += 1;
        self.max_shared_id
    }

    /// Move every line `>= index` along `axis` one step further out.
    /// The new line at `index` takes the formatting of the line it pushed,
    /// including the style of each of its cells.
    pub(crate) fn insert_line(&mut self, axis: Axis, index: u32) {
        match axis {
            Axis::Row => {
                let tail = self.rows.split_off(&index);
                for (i, mut row) in tail.into_iter().rev() {
                    if i >= MAX_ROWS {
                        warn!(
                            "'{}': row {} pushed past the last row, dropping {} cells",
                            self.name,
                            i,
                            row.cells.len()
                        );
                        continue;
                    }
                    row.index = i + 1;
                    self.rows.insert(i + 1, row);
                }
                let mut styled = Vec::new();
                if let Some(pushed) = self.rows.get(&(index + 1)) {
                    styled.extend(
                        pushed
                            .cells
                            .iter()
                            .filter_map(|(&col, cell)| cell.style_id.map(|style| (col, style))),
                    );
                    if pushed.has_custom_settings() {
                        let new = pushed.inherit(index);
                        self.rows.insert(index, new);
                    }
                }
                for (col, style) in styled {
                    self.cell_entry(index, col).style_id = Some(style);
                }
            }
            Axis::Column => {
                let col = index as u16;
                for row in self.rows.values_mut() {
                    let tail = row.cells.split_off(&col);
                    for (c, cell) in tail.into_iter().rev() {
                        if c >= MAX_COLS {
                            warn!(
                                "'{}': {} pushed past the last column, dropping it",
                                self.name,
                                CellAddress::new(row.index, c)
                            );
                            continue;
                        }
                        row.cells.insert(c + 1, cell);
                    }
                    let style = row.cells.get(&(col + 1)).and_then(|cell| cell.style_id);
                    if let Some(style) = style {
                        row.cells.entry(col).or_default().style_id = Some(style);
                    }
                }
                let tail = self.columns.split_off(&col);
                for (c, meta) in tail.into_iter().rev() {
                    if c < MAX_COLS {
                        self.columns.insert(c + 1, meta.moved_to(c + 1));
                    }
                }
                if let Some(pushed) = self.columns.get(&(col + 1)) {
                    let new = pushed.moved_to(col);
                    self.columns.insert(col, new);
                }
            }
        }
    }

    /// Remove line `index` along `axis` and pull every later line back one.
    pub(crate) fn remove_line(&mut self, axis: Axis, index: u32) {
        match axis {
            Axis::Row => {
                self.rows.remove(&index);
                let tail = self.rows.split_off(&index);
                for (i, mut row) in tail {
                    row.index = i - 1;
                    self.rows.insert(i - 1, row);
                }
            }
            Axis::Column => {
                let col = index as u16;
                for row in self.rows.values_mut() {
                    row.cells.remove(&col);
                    let tail = row.cells.split_off(&col);
                    for (c, cell) in tail {
                        row.cells.insert(c - 1, cell);
                    }
                }
                self.rows.retain(|_, r| !r.is_vacant());
                self.columns.remove(&col);
                let tail = self.columns.split_off(&col);
                for (c, meta) in tail {
                    self.columns.insert(c - 1, meta.moved_to(c - 1));
                }
            }
        }
    }
}

/// Mutable handle to one sheet of a workbook
#[derive(Debug)]
pub struct SheetMut<'a> {
    workbook: &'a mut Workbook,
    index: usize,
}

impl<'a> SheetMut<'a> {
    pub(crate) fn new(workbook: &'a mut Workbook, index: usize) -> Self {
        Self { workbook, index }
    }

    fn sheet(&self) -> &Sheet {
        &self.workbook.sheets[self.index]
    }

    fn sheet_mut(&mut self) -> &mut Sheet {
        &mut self.workbook.sheets[self.index]
    }

    pub fn name(&self) -> &str {
        self.sheet().name()
    }

    /// Read-only view of the sheet
    pub fn as_sheet(&self) -> &Sheet {
        self.sheet()
    }

    /// Handle to the cell at `(row, col)`
    pub fn cell(&mut self, row: u32, col: u16) -> Result<CellMut<'_>> {
        let name = self.name().to_string();
        let cell = self.workbook.locate(&name, row, col)?;
        Ok(CellMut::new(self.workbook, cell))
    }

    /// Handle to the cell at an A1 address on this sheet
    pub fn cell_at(&mut self, address: &str) -> Result<CellMut<'_>> {
        let addr = CellAddress::parse(address)?;
        self.cell(addr.row, addr.col)
    }

    /// Fill `range` with one shared formula anchored at its top-left cell.
    /// Returns the id of the new group.
    pub fn set_shared_formula(&mut self, range: &str, formula: &str) -> Result<u32> {
        let name = self.name().to_string();
        let area = Reference::from_address(range, Some(&name))?;
        if !area.is_on(&name) {
            return Err(Error::InvalidAddress(format!(
                "'{}' is not on sheet '{}'",
                range, name
            )));
        }
        if matches!(area.kind(), ReferenceKind::RowBand | ReferenceKind::ColumnBand) {
            return Err(Error::InvalidAddress(format!(
                "a shared formula needs a bounded range, got '{}'",
                range
            )));
        }
        area.validate()?;
        self.workbook.create_shared_group(self.index, &area, formula)
    }

    /// Clear every cell of shared group `id`
    pub fn clear_cells_using_shared_formula(&mut self, id: u32) -> Result<Vec<CellRef>> {
        self.workbook.clear_shared_group(self.index, id)
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) -> Result<()> {
        self.column_entry(col)?.width = Some(width);
        Ok(())
    }

    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) -> Result<()> {
        self.column_entry(col)?.hidden = hidden;
        Ok(())
    }

    pub fn set_column_style_id(&mut self, col: u16, style_id: Option<u32>) -> Result<()> {
        self.column_entry(col)?.style_id = style_id;
        Ok(())
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> Result<()> {
        self.row_entry(row)?.height = Some(height);
        Ok(())
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) -> Result<()> {
        self.row_entry(row)?.hidden = hidden;
        Ok(())
    }

    pub fn set_row_style_id(&mut self, row: u32, style_id: Option<u32>) -> Result<()> {
        self.row_entry(row)?.style_id = style_id;
        Ok(())
    }

    /// Insert an empty row at `row`, moving everything at or below it down
    pub fn insert_row(&mut self, row: u32) -> Result<Vec<CellRef>> {
        self.workbook.insert_line(self.index, Axis::Row, row)
    }

    /// Delete row `row`, moving everything below it up
    pub fn delete_row(&mut self, row: u32) -> Result<Vec<CellRef>> {
        self.workbook.delete_line(self.index, Axis::Row, row)
    }

    /// Insert an empty column at `col`, moving everything at or right of it
    pub fn insert_column(&mut self, col: u16) -> Result<Vec<CellRef>> {
        self.workbook.insert_line(self.index, Axis::Column, col as u32)
    }

    /// Delete column `col`, moving everything right of it left
    pub fn delete_column(&mut self, col: u16) -> Result<Vec<CellRef>> {
        self.workbook.delete_line(self.index, Axis::Column, col as u32)
    }

    fn column_entry(&mut self, col: u16) -> Result<&mut Column> {
        if col == 0 || col > MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS));
        }
        Ok(self
            .sheet_mut()
            .columns
            .entry(col)
            .or_insert_with(|| Column::new(col)))
    }

    fn row_entry(&mut self, row: u32) -> Result<&mut Row> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS));
        }
        Ok(self
            .sheet_mut()
            .rows
            .entry(row)
            .or_insert_with(|| Row::new(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgraph_core::CellValue;
    use pretty_assertions::assert_eq;

    fn sheet_with(cells: &[(u32, u16, f64)]) -> Sheet {
        let mut sheet = Sheet::new("Data");
        for &(row, col, n) in cells {
            sheet.cell_entry(row, col).value = CellValue::Number(n);
        }
        sheet
    }

    #[test]
    fn test_used_range_bounds_populated_cells() {
        assert_eq!(Sheet::new("Empty").used_range(), None);

        let sheet = sheet_with(&[(3, 2, 1.0), (7, 5, 2.0), (4, 1, 3.0)]);
        assert_eq!(sheet.used_range(), Some(Reference::range("Data", 3, 1, 7, 5)));
    }

    #[test]
    fn test_column_iterates_in_row_order() {
        let sheet = sheet_with(&[(9, 2, 9.0), (1, 2, 1.0), (4, 3, 4.0)]);
        let rows: Vec<u32> = sheet.column(2).map(|(row, _)| row).collect();
        assert_eq!(rows, vec![1, 9]);
    }

    #[test]
    fn test_inserting_a_row_moves_rows_down() {
        let mut sheet = sheet_with(&[(1, 1, 1.0), (2, 1, 2.0), (3, 1, 3.0)]);
        sheet.rows.get_mut(&2).unwrap().style_id = Some(5);

        sheet.insert_line(Axis::Row, 2);
        assert_eq!(sheet.value_at(1, 1), CellValue::Number(1.0));
        assert_eq!(sheet.value_at(2, 1), CellValue::Empty);
        assert_eq!(sheet.value_at(3, 1), CellValue::Number(2.0));
        assert_eq!(sheet.value_at(4, 1), CellValue::Number(3.0));
        assert_eq!(sheet.row(3).unwrap().index(), 3);
        assert_eq!(sheet.row(2).unwrap().style_id(), Some(5));
    }

    #[test]
    fn test_inserted_lines_take_cell_styles() {
        let mut sheet = sheet_with(&[(2, 1, 1.0), (2, 4, 2.0)]);
        sheet.cell_entry(2, 1).style_id = Some(7);
        sheet.cell_entry(2, 3).style_id = Some(9);

        sheet.insert_line(Axis::Row, 2);
        assert_eq!(sheet.get_cell(2, 1).and_then(|c| c.style_id), Some(7));
        assert_eq!(sheet.get_cell(2, 3).and_then(|c| c.style_id), Some(9));
        assert_eq!(sheet.get_cell(2, 4), None);
        assert_eq!(sheet.value_at(2, 1), CellValue::Empty);
        assert_eq!(sheet.value_at(3, 1), CellValue::Number(1.0));

        sheet.insert_line(Axis::Column, 3);
        assert_eq!(sheet.get_cell(2, 3).and_then(|c| c.style_id), Some(9));
        assert_eq!(sheet.get_cell(3, 3), None);
    }

    #[test]
    fn test_the_last_row_falls_off_on_insert() {
        let mut sheet = sheet_with(&[(MAX_ROWS, 1, 1.0), (MAX_ROWS - 1, 1, 2.0)]);
        sheet.insert_line(Axis::Row, 10);
        assert_eq!(sheet.value_at(MAX_ROWS, 1), CellValue::Number(2.0));
        assert_eq!(sheet.cell_count(), 1);
    }

    #[test]
    fn test_deleting_a_column_pulls_cells_and_metadata_left() {
        let mut sheet = sheet_with(&[(1, 1, 1.0), (1, 2, 2.0), (1, 3, 3.0)]);
        sheet.columns.insert(3, Column::new(3));
        sheet.columns.get_mut(&3).unwrap().width = Some(20.0);

        sheet.remove_line(Axis::Column, 2);
        assert_eq!(sheet.value_at(1, 2), CellValue::Number(3.0));
        assert_eq!(sheet.get_cell(1, 3), None);
        let meta = sheet.column_meta(2).unwrap();
        assert_eq!((meta.index, meta.width), (2, Some(20.0)));
        assert!(sheet.column_meta(3).is_none());
    }

    #[test]
    fn test_inserted_columns_inherit_the_pushed_metadata() {
        let mut sheet = Sheet::new("Data");
        let mut meta = Column::new(2);
        meta.hidden = true;
        sheet.columns.insert(2, meta);

        sheet.insert_line(Axis::Column, 2);
        assert!(sheet.column_meta(2).unwrap().hidden);
        assert_eq!(sheet.column_meta(3).unwrap().index, 3);
    }

    #[test]
    fn test_prune_drops_blank_cells_and_rows() {
        let mut sheet = sheet_with(&[(2, 2, 1.0)]);
        sheet.cell_entry(2, 2).reset();
        sheet.prune(2, 2);
        assert!(sheet.row(2).is_none());
    }
}
