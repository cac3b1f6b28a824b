//! Row selection keyed by row identity, independent of filter and sort order.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::row::{Row, RowId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionModel {
    selected: BTreeSet<RowId>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    /// Number of selected ids, whether or not they are currently visible.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RowId> {
        self.selected.iter()
    }

    pub fn toggle(&mut self, id: &RowId) {
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
    }

    /// Add every id in `visible` to the selection.
    pub fn select_all<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        self.selected.extend(visible.into_iter().cloned());
    }

    /// Header checkbox: when every visible row is already selected, deselect
    /// exactly those rows; otherwise select them all. Rows outside `visible`
    /// are never touched.
    pub fn toggle_all<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a RowId>,
        I::IntoIter: Clone,
    {
        let visible = visible.into_iter();
        if self.all_selected(visible.clone()) {
            for id in visible {
                self.selected.remove(id);
            }
        } else {
            self.select_all(visible);
        }
    }

    /// True when `visible` is non-empty and fully selected.
    pub fn all_selected<'a, I>(&self, visible: I) -> bool
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        let mut any = false;
        for id in visible {
            if !self.selected.contains(id) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop ids that no longer exist. Returns whether anything was removed.
    pub fn retain_existing(&mut self, existing: &HashSet<&RowId>) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| existing.contains(id));
        before != self.selected.len()
    }

    /// Selected rows among `view`, in view order.
    pub fn selected_rows<'a>(&self, view: &[&'a Row]) -> Vec<&'a Row> {
        view.iter()
            .copied()
            .filter(|row| self.selected.contains(row.id()))
            .collect()
    }
}
