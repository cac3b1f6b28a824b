//! Composite grid state, the transitions over it, and the derived view.
//!
//! Data flows one way: the dataset and column definitions are inputs, every
//! piece of mutable state lives in [`GridState`], and [`derive_view`] turns
//! (dataset, state, config) into render-ready rows and column geometry:
//! filter, then sort, then number, then lay out columns.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::column::{ColumnDef, ColumnGeometry, ColumnModel, DisplayWidthMeasurer, Measure, Pin};
use crate::config::GridConfig;
use crate::error::Outcome;
use crate::filter::{filter_rows, FilterState};
use crate::row::{Dataset, Row, RowId};
use crate::rownumber;
use crate::selection::SelectionModel;
use crate::sort::{sort_rows, SortKey, SortKeys};

#[cfg(test)]
mod test;

/// Every user-facing transition. Serializable so an action log can be
/// replayed against the same dataset to reproduce a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GridAction {
    ApplyFilters { filters: FilterState },
    SetGlobalSearch { term: String },
    /// Clears column filters and the search term; selection, sort and layout stay.
    ClearFilters,
    SetSort { keys: Vec<SortKey> },
    ToggleSort { column: String },
    ToggleColumnVisibility { column: String },
    SetColumnVisibility { column: String, visible: bool },
    ResizeColumn { column: String, width: i64 },
    /// Auto-fit using the config's display-width measurer.
    AutoFitColumn { column: String },
    PinColumn { column: String, pin: Pin },
    UnpinAll,
    ResetPinning,
    ResetSizing,
    ToggleRowSelection { row: RowId },
    /// Header checkbox over the currently filtered rows.
    ToggleSelectAll,
    ClearSelection,
}

impl GridAction {
    fn touches_filters(&self) -> bool {
        matches!(
            self,
            GridAction::ApplyFilters { .. } | GridAction::SetGlobalSearch { .. } | GridAction::ClearFilters
        )
    }
}

/// The single composite view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    pub columns: ColumnModel,
    pub filters: FilterState,
    pub sort: SortKeys,
    pub selection: SelectionModel,
}

impl GridState {
    pub fn new(defs: Vec<ColumnDef>, config: &GridConfig) -> Self {
        Self {
            columns: ColumnModel::new(defs, config),
            filters: FilterState::default(),
            sort: SortKeys::default(),
            selection: SelectionModel::default(),
        }
    }

    /// Pure transition: the state after `action`, and what the action did.
    pub fn reduce(&self, action: &GridAction, dataset: &Dataset, config: &GridConfig) -> (GridState, Outcome) {
        let mut next = self.clone();
        let outcome = next.apply(action, dataset, config);
        (next, outcome)
    }

    fn filtered<'a>(&self, dataset: &'a Dataset, config: &GridConfig) -> Vec<&'a Row> {
        filter_rows(&self.columns, dataset.rows(), &self.filters, config.parallel_threshold)
    }

    fn apply(&mut self, action: &GridAction, dataset: &Dataset, config: &GridConfig) -> Outcome {
        match action {
            GridAction::ApplyFilters { filters } => {
                let mut next = filters.sanitized(&self.columns);
                if next.search_term().is_none() {
                    next.global_search = std::mem::take(&mut self.filters.global_search);
                }
                self.filters = next;
                Outcome::Applied
            }
            GridAction::SetGlobalSearch { term } => {
                self.filters.global_search = term.trim().to_string();
                Outcome::Applied
            }
            GridAction::ClearFilters => {
                self.filters = FilterState::default();
                Outcome::Applied
            }
            GridAction::SetSort { keys } => {
                self.sort = SortKeys::sanitized(keys.clone(), &self.columns);
                if self.sort.keys().len() != keys.len() {
                    debug!(
                        requested = keys.len(),
                        kept = self.sort.keys().len(),
                        "dropped sort keys"
                    );
                }
                Outcome::Applied
            }
            GridAction::ToggleSort { column } => {
                if self.sort.cycle(column, &self.columns) {
                    Outcome::Applied
                } else {
                    Outcome::Ignored
                }
            }
            GridAction::ToggleColumnVisibility { column } => self.columns.toggle_visibility(column),
            GridAction::SetColumnVisibility { column, visible } => {
                self.columns.set_visible(column, *visible)
            }
            GridAction::ResizeColumn { column, width } => {
                let resizable = self.columns.def(column).is_some_and(|d| d.resizable);
                match self.columns.resize(column, *width) {
                    Some(_) if !resizable => Outcome::Ignored,
                    Some(applied) if i64::from(applied) == *width => Outcome::Applied,
                    Some(_) => Outcome::Clamped,
                    None => Outcome::Ignored,
                }
            }
            GridAction::AutoFitColumn { column } => {
                let measurer = DisplayWidthMeasurer::from(&config.measure);
                self.auto_fit(column, dataset, config, &measurer)
            }
            GridAction::PinColumn { column, pin } => self.columns.pin(column, *pin),
            GridAction::UnpinAll => {
                self.columns.unpin_all();
                Outcome::Applied
            }
            GridAction::ResetPinning => {
                self.columns.reset_pinning();
                Outcome::Applied
            }
            GridAction::ResetSizing => {
                self.columns.reset_sizing();
                Outcome::Applied
            }
            GridAction::ToggleRowSelection { row } => {
                if !config.enable_selection || !dataset.contains(row) {
                    debug!(row = %row, "ignoring selection toggle");
                    return Outcome::Ignored;
                }
                self.selection.toggle(row);
                Outcome::Applied
            }
            GridAction::ToggleSelectAll => {
                if !config.enable_selection {
                    return Outcome::Ignored;
                }
                let visible = self.filtered(dataset, config);
                self.selection.toggle_all(visible.iter().map(|row| row.id()));
                Outcome::Applied
            }
            GridAction::ClearSelection => {
                self.selection.clear();
                Outcome::Applied
            }
        }
    }

    /// Auto-fit a column against the rows that currently pass the filters.
    pub fn auto_fit<M: Measure + ?Sized>(
        &mut self,
        column: &str,
        dataset: &Dataset,
        config: &GridConfig,
        measurer: &M,
    ) -> Outcome {
        let resizable = self.columns.def(column).is_some_and(|d| d.resizable);
        if !resizable {
            return Outcome::Ignored;
        }
        let visible = self.filtered(dataset, config);
        match self.columns.auto_fit(column, visible, measurer) {
            Some(_) => Outcome::Applied,
            None => Outcome::Ignored,
        }
    }

    /// Drop selected ids that are not in `dataset`. Returns whether any were dropped.
    pub fn prune_selection(&mut self, dataset: &Dataset) -> bool {
        self.selection.retain_existing(&dataset.ids())
    }
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow<'a> {
    pub row: &'a Row,
    /// 1-based position in the rendered sequence.
    pub number: usize,
    pub selected: bool,
}

/// Everything the rendering layer needs for one pass.
#[derive(Debug, Clone)]
pub struct GridView<'a> {
    pub rows: Vec<RenderedRow<'a>>,
    pub columns: Vec<ColumnGeometry>,
    pub total_rows: usize,
    /// Selected ids overall, visible or not.
    pub selected_count: usize,
}

impl<'a> GridView<'a> {
    pub fn visible_count(&self) -> usize {
        self.rows.len()
    }

    /// Selected rows that are currently visible, in rendered order.
    pub fn selected_rows(&self) -> Vec<&'a Row> {
        self.rows.iter().filter(|r| r.selected).map(|r| r.row).collect()
    }

    pub fn selected_visible_count(&self) -> usize {
        self.rows.iter().filter(|r| r.selected).count()
    }

    /// Header checkbox state.
    pub fn all_visible_selected(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.selected)
    }

    pub fn row_ids(&self) -> Vec<&'a RowId> {
        self.rows.iter().map(|r| r.row.id()).collect()
    }

    pub fn number_of(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().find(|r| r.row.id() == id).map(|r| r.number)
    }

    pub fn column(&self, id: &str) -> Option<&ColumnGeometry> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// Derive the render-ready view. Pure: same inputs, same view.
pub fn derive_view<'a>(dataset: &'a Dataset, state: &GridState, config: &GridConfig) -> GridView<'a> {
    let mut rows = state.filtered(dataset, config);
    sort_rows(&state.columns, &mut rows, &state.sort, config.parallel_threshold);

    let rendered: Vec<RenderedRow<'a>> = rownumber::project(&rows)
        .into_iter()
        .map(|(number, row)| RenderedRow {
            row,
            number,
            selected: state.selection.is_selected(row.id()),
        })
        .collect();

    trace!(total = dataset.len(), visible = rendered.len(), "derived grid view");

    GridView {
        rows: rendered,
        columns: state.columns.geometry(),
        total_rows: dataset.len(),
        selected_count: state.selection.len(),
    }
}

/// Outbound notifications, delivered synchronously after a transition.
pub trait GridListener {
    /// The selection changed; `selected` is the visible selected rows.
    /// Not called when an action leaves the selected id set as it was.
    fn on_selection_change(&mut self, _selected: &[&Row]) {}

    /// Filters were applied or cleared; `filters` holds only active entries.
    fn on_filter_apply(&mut self, _filters: &FilterState) {}
}

/// Owns the dataset, the config and the current state, and routes every
/// user action through [`GridState::reduce`].
pub struct ViewCoordinator {
    dataset: Dataset,
    config: GridConfig,
    state: GridState,
    listeners: Vec<Box<dyn GridListener>>,
}

impl ViewCoordinator {
    pub fn new(dataset: Dataset, defs: Vec<ColumnDef>, config: GridConfig) -> Self {
        let state = GridState::new(defs, &config);
        Self::with_state(dataset, state, config)
    }

    /// Resume from a previously captured state.
    pub fn with_state(dataset: Dataset, mut state: GridState, config: GridConfig) -> Self {
        state.prune_selection(&dataset);
        Self {
            dataset,
            config,
            state,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn GridListener>) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn view(&self) -> GridView<'_> {
        derive_view(&self.dataset, &self.state, &self.config)
    }

    /// Apply one action and notify listeners.
    pub fn dispatch(&mut self, action: GridAction) -> Outcome {
        let (next, outcome) = self.state.reduce(&action, &self.dataset, &self.config);
        debug!(?action, ?outcome, "grid action");
        self.commit(next, action.touches_filters());
        outcome
    }

    fn commit(&mut self, next: GridState, filters_applied: bool) {
        let selection_changed = next.selection != self.state.selection;
        self.state = next;

        if filters_applied {
            for listener in self.listeners.iter_mut() {
                listener.on_filter_apply(&self.state.filters);
            }
        }
        if selection_changed {
            let view = derive_view(&self.dataset, &self.state, &self.config);
            let selected = view.selected_rows();
            for listener in self.listeners.iter_mut() {
                listener.on_selection_change(&selected);
            }
        }
    }

    /// Replace the dataset. Selection of rows that disappeared is dropped.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        let mut next = self.state.clone();
        if next.prune_selection(&self.dataset) {
            debug!("dropped selection of removed rows");
        }
        self.commit(next, false);
    }

    /// Replace the column filters. An empty search term in `filters` keeps
    /// the current one; use [`Self::set_global_search`] or [`Self::clear_filters`] to drop it.
    pub fn apply_filters(&mut self, filters: FilterState) -> Outcome {
        self.dispatch(GridAction::ApplyFilters { filters })
    }

    pub fn set_global_search(&mut self, term: impl Into<String>) -> Outcome {
        self.dispatch(GridAction::SetGlobalSearch { term: term.into() })
    }

    pub fn clear_filters(&mut self) -> Outcome {
        self.dispatch(GridAction::ClearFilters)
    }

    pub fn set_sort(&mut self, keys: Vec<SortKey>) -> Outcome {
        self.dispatch(GridAction::SetSort { keys })
    }

    pub fn toggle_sort(&mut self, column: &str) -> Outcome {
        self.dispatch(GridAction::ToggleSort { column: column.to_string() })
    }

    pub fn toggle_column_visibility(&mut self, column: &str) -> Outcome {
        self.dispatch(GridAction::ToggleColumnVisibility { column: column.to_string() })
    }

    pub fn set_column_visibility(&mut self, column: &str, visible: bool) -> Outcome {
        self.dispatch(GridAction::SetColumnVisibility {
            column: column.to_string(),
            visible,
        })
    }

    /// Returns the width now in effect, or `None` for an unknown column.
    pub fn resize_column(&mut self, column: &str, width: i64) -> Option<u32> {
        self.dispatch(GridAction::ResizeColumn {
            column: column.to_string(),
            width,
        });
        self.state.columns.size(column)
    }

    pub fn auto_fit_column(&mut self, column: &str) -> Option<u32> {
        self.dispatch(GridAction::AutoFitColumn { column: column.to_string() });
        self.state.columns.size(column)
    }

    /// Auto-fit with a caller-supplied measurer (e.g. real font metrics).
    pub fn auto_fit_column_with<M: Measure + ?Sized>(&mut self, column: &str, measurer: &M) -> Option<u32> {
        let mut next = self.state.clone();
        next.auto_fit(column, &self.dataset, &self.config, measurer);
        self.commit(next, false);
        self.state.columns.size(column)
    }

    pub fn pin_column(&mut self, column: &str, pin: Pin) -> Outcome {
        self.dispatch(GridAction::PinColumn {
            column: column.to_string(),
            pin,
        })
    }

    pub fn unpin_all(&mut self) -> Outcome {
        self.dispatch(GridAction::UnpinAll)
    }

    pub fn reset_pinning(&mut self) -> Outcome {
        self.dispatch(GridAction::ResetPinning)
    }

    pub fn reset_sizing(&mut self) -> Outcome {
        self.dispatch(GridAction::ResetSizing)
    }

    pub fn toggle_row_selection(&mut self, row: impl Into<RowId>) -> Outcome {
        self.dispatch(GridAction::ToggleRowSelection { row: row.into() })
    }

    pub fn toggle_select_all(&mut self) -> Outcome {
        self.dispatch(GridAction::ToggleSelectAll)
    }

    pub fn clear_selection(&mut self) -> Outcome {
        self.dispatch(GridAction::ClearSelection)
    }

    /// Visible selected rows, for action menus and bulk actions.
    pub fn selected_rows(&self) -> Vec<&Row> {
        self.view().selected_rows()
    }
}
