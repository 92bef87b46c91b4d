//! Row type

use crate::cell::Cell;
use std::collections::BTreeMap;

/// A row and the cells it owns, ordered by column
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub(crate) index: u32,
    pub(crate) cells: BTreeMap<u16, Cell>,
    pub(crate) style_id: Option<u32>,
    pub(crate) height: Option<f64>,
    pub(crate) hidden: bool,
}

impl Row {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    /// Row number (1-based)
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Cell in column `col`, if one exists
    pub fn cell(&self, col: u16) -> Option<&Cell> {
        self.cells.get(&col)
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (u16, &Cell)> {
        self.cells.iter().map(|(&col, cell)| (col, cell))
    }

    /// Row-level style id
    pub fn style_id(&self) -> Option<u32> {
        self.style_id
    }

    /// Custom height in points (None = default)
    pub fn height(&self) -> Option<f64> {
        self.height
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some() || self.hidden || self.style_id.is_some()
    }

    /// An empty row at `index` carrying this row's formatting
    pub(crate) fn inherit(&self, index: u32) -> Self {
        Self {
            index,
            style_id: self.style_id,
            height: self.height,
            ..Default::default()
        }
    }

    /// True when the row holds nothing worth keeping
    pub(crate) fn is_vacant(&self) -> bool {
        self.cells.is_empty() && !self.has_custom_settings()
    }
}
