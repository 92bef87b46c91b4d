//! Dependency tracking for formula calculation
//!
//! The graph stores edges "a cell inside `dependency` changed, so `dependent`
//! must be recalculated". Dependencies are arbitrary areas (cells, ranges,
//! whole rows, whole columns), so edges are not keyed by cell but by the
//! pair of bands the area occupies:
//!
//! ```text
//! sheet -> row band key -> column band key -> dependent sheet -> {cell keys}
//! ```
//!
//! A band key packs an inclusive `[from, to]` interval into one integer with
//! [`encode_band`]. Keys sort by `from` first, so "every band that can contain
//! row 40" is the key range `..=encode_band(40, MAX)` filtered on `to >= 40`.

use cellgraph_core::{Axis, CellRef, Error, Reference, Result};
use ahash::AHashMap;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

type DependentCells = BTreeMap<String, BTreeSet<u64>>;
type ColumnBands = BTreeMap<u64, DependentCells>;
type SheetTable = BTreeMap<u64, ColumnBands>;

/// Pack the inclusive interval `[from, to]` on `axis` into a map key
pub fn encode_band(axis: Axis, from: u32, to: u32) -> u64 {
    from as u64 * (axis.max_index() as u64 + 1) + to as u64
}

/// Inverse of [`encode_band`]
pub fn decode_band(axis: Axis, key: u64) -> (u32, u32) {
    let base = axis.max_index() as u64 + 1;
    ((key / base) as u32, (key % base) as u32)
}

/// Pack a cell position into a map key
pub fn encode_cell(row: u32, col: u16) -> u64 {
    row as u64 * (Axis::Column.max_index() as u64 + 1) + col as u64
}

/// Inverse of [`encode_cell`]
pub fn decode_cell(key: u64) -> (u32, u16) {
    let base = Axis::Column.max_index() as u64 + 1;
    ((key / base) as u32, (key % base) as u16)
}

/// Result of a calculation-order query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationOrder {
    /// Cells to recalculate, each after every cell it reads
    pub cells: Vec<CellRef>,
    /// Cells found on a dependency cycle; they are not part of `cells`
    pub circular: BTreeSet<CellRef>,
}

impl CalculationOrder {
    /// True when nothing needs recalculating
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.circular.is_empty()
    }
}

/// Band-keyed reference table shared by every sheet of a workbook
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Keyed by lowercase sheet name of the dependency
    sheets: AHashMap<String, SheetTable>,
    edges: usize,
}

struct Frame {
    cell: CellRef,
    index: usize,
    low: usize,
    /// The cell reads itself
    looped: bool,
    pending: std::vec::IntoIter<CellRef>,
}

/// State of Tarjan's strongly connected components walk
#[derive(Default)]
struct Walk {
    index: BTreeMap<CellRef, usize>,
    stack: Vec<CellRef>,
    on_stack: BTreeSet<CellRef>,
    /// Acyclic cells, dependents before the cells they read
    finished: Vec<CellRef>,
    circular: BTreeSet<CellRef>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register that `dependent` must be recalculated when anything inside
    /// `dependency` changes
    pub fn add(&mut self, dependency: &Reference, dependent: &CellRef) -> Result<()> {
        let (sheet, row_key, col_key) = Self::keys(dependency)?;
        let cell_key = Self::cell_key(dependent)?;

        let inserted = self
            .sheets
            .entry(sheet)
            .or_default()
            .entry(row_key)
            .or_default()
            .entry(col_key)
            .or_default()
            .entry(dependent.sheet.clone())
            .or_default()
            .insert(cell_key);
        if inserted {
            self.edges += 1;
        }
        Ok(())
    }

    /// Remove an edge registered with [`add`](Self::add). Removing an edge
    /// that does not exist is a no-op.
    pub fn remove(&mut self, dependency: &Reference, dependent: &CellRef) -> Result<()> {
        let (sheet, row_key, col_key) = Self::keys(dependency)?;
        let cell_key = Self::cell_key(dependent)?;

        let Some(table) = self.sheets.get_mut(&sheet) else {
            return Ok(());
        };
        let Some(columns) = table.get_mut(&row_key) else {
            return Ok(());
        };
        let Some(dependents) = columns.get_mut(&col_key) else {
            return Ok(());
        };
        let Some(cells) = dependents.get_mut(&dependent.sheet) else {
            return Ok(());
        };

        if cells.remove(&cell_key) {
            self.edges -= 1;
        }

        if cells.is_empty() {
            dependents.remove(&dependent.sheet);
        }
        if dependents.is_empty() {
            columns.remove(&col_key);
        }
        if columns.is_empty() {
            table.remove(&row_key);
        }
        if table.is_empty() {
            self.sheets.remove(&sheet);
        }
        Ok(())
    }

    /// Cells whose formulas read `cell` directly, excluding `cell` itself
    pub fn get_direct_references(&self, cell: &CellRef) -> Result<Vec<CellRef>> {
        let found = self.dependents_in(&cell.to_reference())?;
        Ok(found.into_iter().filter(|c| c != cell).collect())
    }

    /// Cells whose formulas read any part of `area` directly
    pub fn get_direct_references_in(&self, area: &Reference) -> Result<Vec<CellRef>> {
        Ok(self.dependents_in(area)?.into_iter().collect())
    }

    /// Every cell that must be recalculated after `changed` updates
    ///
    /// `changed` itself is only reported when it sits on a cycle.
    pub fn get_calculation_order(&self, changed: &CellRef) -> Result<CalculationOrder> {
        self.calculation_order_from(std::slice::from_ref(changed), false)
    }

    /// Calculation order for several changed cells at once
    ///
    /// With `include_sources` the seeds themselves are part of the order
    /// (used after structural edits, where the seeds are rewritten formulas).
    pub fn calculation_order_from(
        &self,
        sources: &[CellRef],
        include_sources: bool,
    ) -> Result<CalculationOrder> {
        let mut walk = Walk::default();

        // Components finish sinks first and are reversed at the end,
        // so walk seeds back to front
        for source in sources.iter().rev() {
            self.visit(source, &mut walk)?;
        }

        let seeds: BTreeSet<&CellRef> = sources.iter().collect();
        let cells = walk
            .finished
            .into_iter()
            .rev()
            .filter(|c| include_sources || !seeds.contains(c))
            .collect();

        Ok(CalculationOrder {
            cells,
            circular: walk.circular,
        })
    }

    /// Number of registered edges
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// True when no edges are registered
    pub fn is_empty(&self) -> bool {
        self.edges == 0
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.sheets.clear();
        self.edges = 0;
    }

    /// Tarjan's walk from `root`. Every component with more than one cell,
    /// or a single cell that reads itself, is circular; the remaining cells
    /// are appended to `walk.finished` once everything they feed is done.
    /// Iterative so long chains do not exhaust the stack.
    fn visit(&self, root: &CellRef, walk: &mut Walk) -> Result<()> {
        if walk.index.contains_key(root) {
            return Ok(());
        }
        let mut stack = vec![self.enter(root.clone(), walk)?];

        while let Some(frame) = stack.last_mut() {
            match frame.pending.next() {
                Some(next) if next == frame.cell => frame.looped = true,
                Some(next) => match walk.index.get(&next).copied() {
                    Some(index) => {
                        if walk.on_stack.contains(&next) {
                            frame.low = frame.low.min(index);
                        }
                    }
                    None => {
                        let child = self.enter(next, walk)?;
                        stack.push(child);
                    }
                },
                None => {
                    let Some(done) = stack.pop() else { break };
                    if let Some(parent) = stack.last_mut() {
                        parent.low = parent.low.min(done.low);
                    }
                    if done.low == done.index {
                        Self::close_component(&done, walk);
                    }
                }
            }
        }
        Ok(())
    }

    fn enter(&self, cell: CellRef, walk: &mut Walk) -> Result<Frame> {
        let index = walk.index.len();
        walk.index.insert(cell.clone(), index);
        walk.on_stack.insert(cell.clone());
        walk.stack.push(cell.clone());
        let pending = self.dependents_of(&cell)?.into_iter();
        Ok(Frame {
            cell,
            index,
            low: index,
            looped: false,
            pending,
        })
    }

    fn close_component(root: &Frame, walk: &mut Walk) {
        let mut component = Vec::new();
        while let Some(member) = walk.stack.pop() {
            walk.on_stack.remove(&member);
            let last = member == root.cell;
            component.push(member);
            if last {
                break;
            }
        }
        if component.len() > 1 || root.looped {
            walk.circular.extend(component);
        } else {
            walk.finished.extend(component);
        }
    }

    /// Direct dependents used by the walk. Self-edges are kept here so a
    /// formula that reads itself is reported as circular.
    fn dependents_of(&self, cell: &CellRef) -> Result<Vec<CellRef>> {
        Ok(self.dependents_in(&cell.to_reference())?.into_iter().collect())
    }

    fn dependents_in(&self, area: &Reference) -> Result<BTreeSet<CellRef>> {
        let (sheet, (row_from, row_to), (col_from, col_to)) = Self::bounds(area)?;
        let mut found = BTreeSet::new();

        let Some(table) = self.sheets.get(&sheet) else {
            return Ok(found);
        };

        let row_limit = encode_band(Axis::Row, row_to, Axis::Row.max_index());
        let col_limit = encode_band(Axis::Column, col_to, Axis::Column.max_index());

        for (&row_key, columns) in table.range(..=row_limit) {
            if decode_band(Axis::Row, row_key).1 < row_from {
                continue;
            }
            for (&col_key, dependents) in columns.range(..=col_limit) {
                if decode_band(Axis::Column, col_key).1 < col_from {
                    continue;
                }
                for (dep_sheet, cells) in dependents {
                    found.extend(cells.iter().map(|&key| {
                        let (row, col) = decode_cell(key);
                        CellRef::new(dep_sheet.clone(), row, col)
                    }));
                }
            }
        }
        Ok(found)
    }

    fn bounds(reference: &Reference) -> Result<(String, (u32, u32), (u32, u32))> {
        let sheet = reference.sheet.as_deref().ok_or_else(|| {
            Error::GraphConsistency(format!(
                "reference '{}' has no sheet",
                reference.to_address()
            ))
        })?;
        if sheet.is_empty() {
            return Err(Error::GraphConsistency("empty sheet name".into()));
        }

        let rows = reference.extent(Axis::Row);
        let cols = reference.extent(Axis::Column);
        check_band(Axis::Row, rows)?;
        check_band(Axis::Column, cols)?;
        Ok((sheet.to_lowercase(), rows, cols))
    }

    fn keys(reference: &Reference) -> Result<(String, u64, u64)> {
        let (sheet, rows, cols) = Self::bounds(reference)?;
        Ok((
            sheet,
            encode_band(Axis::Row, rows.0, rows.1),
            encode_band(Axis::Column, cols.0, cols.1),
        ))
    }

    fn cell_key(cell: &CellRef) -> Result<u64> {
        if cell.sheet.is_empty() {
            return Err(Error::GraphConsistency("dependent has an empty sheet name".into()));
        }
        check_band(Axis::Row, (cell.row, cell.row))?;
        check_band(Axis::Column, (cell.col as u32, cell.col as u32))?;
        Ok(encode_cell(cell.row, cell.col))
    }
}

fn check_band(axis: Axis, (from, to): (u32, u32)) -> Result<()> {
    if from == 0 || from > to || to > axis.max_index() {
        warn!("rejecting {:?} band {}..={}", axis, from, to);
        return Err(Error::GraphConsistency(format!(
            "{:?} band {}..={} outside 1..={}",
            axis,
            from,
            to,
            axis.max_index()
        )));
    }
    Ok(())
}
