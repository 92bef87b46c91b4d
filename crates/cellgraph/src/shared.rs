//! Shared formula groups
//!
//! A group is one formula text anchored at a host cell. Every other member
//! (a follower) stores no text of its own and derives its formula by moving
//! the host's relative references by its offset from the host.
//!
//! Groups are owned by their sheet. What happens to the followers when the
//! host is cleared is decided by a [`HostLossPolicy`] installed on the
//! workbook.

use crate::recalc::{normalize_formula, Release};
use crate::workbook::Workbook;
use cellgraph_core::{CellRef, CellValue, Error, Reference, Result};
use cellgraph_formula::FormulaTextRewriter;
use log::debug;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// One shared formula and the cells using it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFormulaGroup {
    id: u32,
    host: (u32, u16),
    formula: String,
    members: BTreeSet<(u32, u16)>,
}

impl SharedFormulaGroup {
    pub(crate) fn new(
        id: u32,
        host: (u32, u16),
        formula: impl Into<String>,
        members: impl IntoIterator<Item = (u32, u16)>,
    ) -> Self {
        let mut members: BTreeSet<_> = members.into_iter().collect();
        members.insert(host);
        Self {
            id,
            host,
            formula: formula.into(),
            members,
        }
    }

    /// Group id, unique within the sheet
    pub fn id(&self) -> u32 {
        self.id
    }

    /// `(row, col)` of the host cell
    pub fn host(&self) -> (u32, u16) {
        self.host
    }

    /// The host's formula text
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Every member, host included, in row-major order
    pub fn members(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.members.iter().copied()
    }

    /// Every member except the host
    pub fn followers(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.members().filter(move |m| *m != self.host)
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        self.members.contains(&(row, col))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Effective formula of the member at `(row, col)`
    pub fn formula_for(&self, row: u32, col: u16) -> String {
        let (host_row, host_col) = self.host;
        if (row, col) == self.host {
            return self.formula.clone();
        }
        FormulaTextRewriter::translate(
            &self.formula,
            row as i64 - host_row as i64,
            col as i64 - host_col as i64,
        )
    }

    pub(crate) fn remove_member(&mut self, row: u32, col: u16) -> bool {
        self.members.remove(&(row, col))
    }
}

/// What to do with the followers of a host that is being cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLossAction {
    /// Clear every follower along with the host
    ClearFollowers,
    /// Turn every follower into a normal formula with its effective text
    MaterializeFollowers,
}

/// Decides the fate of a shared group whose host is cleared or overwritten
/// with a plain value
pub trait HostLossPolicy: Debug + Send + Sync {
    fn on_host_cleared(&self, group: &SharedFormulaGroup) -> HostLossAction;
}

/// Clears the whole group with its host. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeClear;

impl HostLossPolicy for CascadeClear {
    fn on_host_cleared(&self, _group: &SharedFormulaGroup) -> HostLossAction {
        HostLossAction::ClearFollowers
    }
}

/// Keeps every follower alive as a normal formula
#[derive(Debug, Clone, Copy, Default)]
pub struct PromoteFollowers;

impl HostLossPolicy for PromoteFollowers {
    fn on_host_cleared(&self, _group: &SharedFormulaGroup) -> HostLossAction {
        HostLossAction::MaterializeFollowers
    }
}

impl Workbook {
    pub(crate) fn create_shared_group(
        &mut self,
        sheet: usize,
        area: &Reference,
        formula: &str,
    ) -> Result<u32> {
        let text = normalize_formula(formula)?;
        let name = self.sheets[sheet].name().to_string();
        let members: Vec<(u32, u16)> = (area.start.row..=area.end.row)
            .flat_map(|row| (area.start.col..=area.end.col).map(move |col| (row, col)))
            .collect();
        let cells: Vec<CellRef> = members
            .iter()
            .map(|&(row, col)| CellRef::new(name.clone(), row, col))
            .collect();

        for cell in &cells {
            self.release_formula(cell, Release::Overwrite)?;
        }

        let host = (area.start.row, area.start.col);
        let target = &mut self.sheets[sheet];
        let id = target.next_shared_id();
        target.shared.insert(
            id,
            SharedFormulaGroup::new(id, host, text.clone(), members.iter().copied()),
        );
        for &(row, col) in &members {
            let slot = target.cell_entry(row, col);
            slot.value = CellValue::Empty;
            slot.shared_formula_id = Some(id);
            slot.formula = ((row, col) == host).then(|| text.clone());
        }

        for cell in &cells {
            self.attach(cell)?;
        }
        self.propagate(&cells, true)?;
        Ok(id)
    }

    pub(crate) fn clear_shared_group(&mut self, sheet: usize, id: u32) -> Result<Vec<CellRef>> {
        if !self.sheets[sheet].shared.contains_key(&id) {
            return Err(Error::Other(format!(
                "sheet '{}' has no shared formula {}",
                self.sheets[sheet].name(),
                id
            )));
        }
        let cleared = self.drop_group(sheet, id, None)?;
        self.propagate(&cleared, false)
    }

    /// Turn `cell` into a normal formula if it belongs to a shared group.
    /// The host takes its whole group with it.
    pub(crate) fn materialize(&mut self, cell: &CellRef) -> Result<()> {
        let Some(id) = self.cell_at(cell).and_then(|c| c.shared_formula_id) else {
            return Ok(());
        };
        let sheet = self
            .sheet_index(&cell.sheet)
            .ok_or_else(|| Error::SheetNotFound(cell.sheet.clone()))?;
        let is_host = self.sheets[sheet]
            .shared
            .get(&id)
            .is_some_and(|g| g.host() == (cell.row, cell.col));
        if is_host {
            self.dissolve_group(sheet, id);
        } else {
            self.materialize_member(sheet, id, cell.row, cell.col);
        }
        Ok(())
    }

    /// Give every member its effective formula and forget the group.
    /// The texts do not change, so neither do the graph edges.
    pub(crate) fn dissolve_group(&mut self, sheet: usize, id: u32) {
        let target = &mut self.sheets[sheet];
        let Some(group) = target.shared.remove(&id) else {
            return;
        };
        for (row, col) in group.members() {
            if let Some(cell) = target.cell_mut(row, col) {
                cell.formula = Some(group.formula_for(row, col));
                cell.shared_formula_id = None;
            }
        }
        debug!(
            "'{}': shared formula {} dissolved into {} normal formulas",
            target.name(),
            id,
            group.len()
        );
    }

    pub(crate) fn materialize_member(&mut self, sheet: usize, id: u32, row: u32, col: u16) {
        let target = &mut self.sheets[sheet];
        let text = match target.shared.get_mut(&id) {
            Some(group) => {
                group.remove_member(row, col);
                Some(group.formula_for(row, col))
            }
            None => None,
        };
        if let Some(cell) = target.cell_mut(row, col) {
            cell.formula = text;
            cell.shared_formula_id = None;
        }
    }

    /// Clear every member of group `id` except `keep`. Returns the cleared cells.
    pub(crate) fn drop_group(
        &mut self,
        sheet: usize,
        id: u32,
        keep: Option<(u32, u16)>,
    ) -> Result<Vec<CellRef>> {
        let Some(group) = self.sheets[sheet].shared.remove(&id) else {
            return Ok(Vec::new());
        };
        let name = self.sheets[sheet].name().to_string();
        let mut cleared = Vec::new();

        for (row, col) in group.members().filter(|m| Some(*m) != keep) {
            let cell = CellRef::new(name.clone(), row, col);
            self.detach(&cell)?;
            if let Some(slot) = self.sheets[sheet].cell_mut(row, col) {
                slot.reset();
            }
            self.sheets[sheet].prune(row, col);
            cleared.push(cell);
        }
        debug!("'{}': shared formula {} cleared", name, id);
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_followers_move_relative_references() {
        // host E2, followers E3 and E4
        let group = SharedFormulaGroup::new(1, (2, 5), "SUM(A1:A2)", [(3, 5), (4, 5)]);
        assert_eq!(group.formula_for(2, 5), "SUM(A1:A2)");
        assert_eq!(group.formula_for(3, 5), "SUM(A2:A3)");
        assert_eq!(group.formula_for(4, 5), "SUM(A3:A4)");
    }

    #[test]
    fn test_anchors_stay_put() {
        let group = SharedFormulaGroup::new(7, (1, 3), "$A$1*B1+A$1", [(2, 4)]);
        assert_eq!(group.formula_for(2, 4), "$A$1*C2+B$1");
    }

    #[test]
    fn test_references_pushed_off_the_grid_become_ref_errors() {
        let group = SharedFormulaGroup::new(1, (3, 2), "A2+1", [(1, 2)]);
        assert_eq!(group.formula_for(1, 2), "#REF!+1");
    }

    #[test]
    fn test_membership() {
        let mut group = SharedFormulaGroup::new(3, (1, 1), "B1", [(2, 1), (3, 1)]);
        assert_eq!(group.len(), 3);
        assert_eq!(group.followers().collect::<Vec<_>>(), vec![(2, 1), (3, 1)]);
        assert!(group.remove_member(2, 1));
        assert!(!group.contains(2, 1));
        assert_eq!(group.members().collect::<Vec<_>>(), vec![(1, 1), (3, 1)]);
    }

    #[test]
    fn test_policies() {
        let group = SharedFormulaGroup::new(1, (1, 1), "B1", [(2, 1)]);
        assert_eq!(
            CascadeClear.on_host_cleared(&group),
            HostLossAction::ClearFollowers
        );
        assert_eq!(
            PromoteFollowers.on_host_cleared(&group),
            HostLossAction::MaterializeFollowers
        );
    }
}
