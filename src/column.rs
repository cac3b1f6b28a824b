//! Column descriptors and the column layout model (size, pin side, visibility).

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::config::{GridConfig, MeasureConfig};
use crate::error::Outcome;
use crate::row::Row;
use crate::value::CellValue;

pub const SELECTION_COLUMN_ID: &str = "__select";
pub const ROW_NUMBER_COLUMN_ID: &str = "__row_number";
pub const ACTIONS_COLUMN_ID: &str = "__actions";

/// Ids owned by the synthetic columns, whether or not the config enables them.
const RESERVED_COLUMN_IDS: [&str; 3] = [SELECTION_COLUMN_ID, ROW_NUMBER_COLUMN_ID, ACTIONS_COLUMN_ID];

const DEFAULT_COLUMN_SIZE: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pin {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Data,
    Selection,
    RowNumber,
    Actions,
}

/// Which filter widget (and which `FilterValue` variant) a column accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Number,
    Select,
    MultiSelect,
    Date,
    DateRange,
}

/// Immutable description of a column, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: String,
    pub header: String,
    /// Field read off each row; `None` for synthetic columns.
    pub accessor: Option<String>,
    pub kind: ColumnKind,
    pub sortable: bool,
    pub filterable: bool,
    pub resizable: bool,
    pub pinnable: bool,
    pub hideable: bool,
    pub default_size: u32,
    /// Falls back to the grid config when unset.
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub default_pin: Pin,
    pub filter: Option<FilterKind>,
    /// Fixed option set offered by select / multiselect filters.
    pub options: Vec<String>,
}

impl ColumnDef {
    /// A data column reading the field of the same name, with every capability enabled.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            header: id.clone(),
            accessor: Some(id.clone()),
            id,
            kind: ColumnKind::Data,
            sortable: true,
            filterable: true,
            resizable: true,
            pinnable: true,
            hideable: true,
            default_size: DEFAULT_COLUMN_SIZE,
            min_size: None,
            max_size: None,
            default_pin: Pin::None,
            filter: Some(FilterKind::Text),
            options: Vec::new(),
        }
    }

    fn synthetic(kind: ColumnKind, size: u32) -> Self {
        let (id, header) = match kind {
            ColumnKind::Selection => (SELECTION_COLUMN_ID, ""),
            ColumnKind::RowNumber => (ROW_NUMBER_COLUMN_ID, "#"),
            ColumnKind::Actions => (ACTIONS_COLUMN_ID, ""),
            ColumnKind::Data => unreachable!("data columns are never synthetic"),
        };
        Self {
            id: id.to_string(),
            header: header.to_string(),
            accessor: None,
            kind,
            sortable: false,
            filterable: false,
            resizable: false,
            pinnable: false,
            hideable: false,
            default_size: size,
            min_size: Some(size),
            max_size: Some(size),
            default_pin: Pin::None,
            filter: None,
            options: Vec::new(),
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn accessor(mut self, field: impl Into<String>) -> Self {
        self.accessor = Some(field.into());
        self
    }

    pub fn sortable(mut self, yes: bool) -> Self {
        self.sortable = yes;
        self
    }

    pub fn filterable(mut self, yes: bool) -> Self {
        self.filterable = yes;
        self
    }

    pub fn resizable(mut self, yes: bool) -> Self {
        self.resizable = yes;
        self
    }

    pub fn pinnable(mut self, yes: bool) -> Self {
        self.pinnable = yes;
        self
    }

    pub fn hideable(mut self, yes: bool) -> Self {
        self.hideable = yes;
        self
    }

    pub fn size(mut self, default: u32, min: u32, max: u32) -> Self {
        self.default_size = default;
        self.min_size = Some(min);
        self.max_size = Some(max);
        self
    }

    pub fn pinned(mut self, pin: Pin) -> Self {
        self.default_pin = pin;
        self
    }

    pub fn filter(mut self, kind: FilterKind) -> Self {
        self.filter = Some(kind);
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.kind != ColumnKind::Data
    }

    /// The row's value for this column; `None` for synthetic columns.
    pub fn value<'r>(&self, row: &'r Row) -> Option<&'r CellValue> {
        self.accessor.as_deref().map(|field| row.get(field))
    }

    /// Pin side enforced by the engine, if any.
    fn forced_pin(&self) -> Option<Pin> {
        match self.kind {
            ColumnKind::Selection | ColumnKind::RowNumber => Some(Pin::Left),
            ColumnKind::Actions => Some(Pin::Right),
            ColumnKind::Data => None,
        }
    }
}

/// Measures the rendered width of a piece of text, in pixels.
pub trait Measure {
    fn measure(&self, text: &str) -> u32;
}

impl<F: Fn(&str) -> u32> Measure for F {
    fn measure(&self, text: &str) -> u32 {
        self(text)
    }
}

/// Terminal-cell based measurer: display width times a fixed cell width, plus padding.
#[derive(Debug, Clone)]
pub struct DisplayWidthMeasurer {
    pub px_per_cell: u32,
    pub padding: u32,
}

impl From<&MeasureConfig> for DisplayWidthMeasurer {
    fn from(cfg: &MeasureConfig) -> Self {
        Self {
            px_per_cell: cfg.px_per_cell,
            padding: cfg.padding,
        }
    }
}

impl Measure for DisplayWidthMeasurer {
    fn measure(&self, text: &str) -> u32 {
        let cells = u32::try_from(text.width()).unwrap_or(u32::MAX);
        cells.saturating_mul(self.px_per_cell).saturating_add(self.padding)
    }
}

/// Render-ready placement of one visible column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGeometry {
    pub id: String,
    pub header: String,
    pub kind: ColumnKind,
    pub size: u32,
    pub pin: Pin,
    /// Sticky offset: from the left edge for left-pinned columns, from the
    /// right edge for right-pinned ones, from the scroll area start otherwise.
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnEntry {
    def: ColumnDef,
    min: u32,
    max: u32,
    size: u32,
    pin: Pin,
    visible: bool,
    /// Order in which the user pinned this column.
    pin_seq: u64,
}

impl ColumnEntry {
    fn clamp(&self, proposed: i64) -> u32 {
        proposed.clamp(i64::from(self.min), i64::from(self.max)) as u32
    }

    fn effective_pin(&self) -> Pin {
        self.def.forced_pin().unwrap_or(self.pin)
    }
}

/// Authoritative per-column layout state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnModel {
    entries: Vec<ColumnEntry>,
    next_pin_seq: u64,
}

impl ColumnModel {
    /// Build the layout from the host's column definitions, adding the
    /// synthetic selection, row-number and actions columns the config asks for.
    pub fn new(defs: Vec<ColumnDef>, config: &GridConfig) -> Self {
        let mut all = Vec::with_capacity(defs.len() + 3);
        if config.enable_selection {
            all.push(ColumnDef::synthetic(ColumnKind::Selection, config.synthetic.selection));
        }
        if config.show_row_numbers {
            all.push(ColumnDef::synthetic(ColumnKind::RowNumber, config.synthetic.row_number));
        }
        for def in defs {
            let reserved = def.is_synthetic() || RESERVED_COLUMN_IDS.contains(&def.id.as_str());
            if reserved || all.iter().any(|d: &ColumnDef| d.id == def.id) {
                debug!(column = %def.id, "dropping duplicate or reserved column definition");
                continue;
            }
            all.push(def);
        }
        if config.row_actions {
            all.push(ColumnDef::synthetic(ColumnKind::Actions, config.synthetic.actions));
        }

        let mut model = Self {
            entries: Vec::with_capacity(all.len()),
            next_pin_seq: 0,
        };
        for def in all {
            let min = def.min_size.unwrap_or(config.default_min_size);
            let max = def.max_size.unwrap_or(config.default_max_size).max(min);
            let mut entry = ColumnEntry {
                min,
                max,
                size: 0,
                pin: Pin::None,
                visible: true,
                pin_seq: 0,
                def,
            };
            entry.size = entry.clamp(i64::from(entry.def.default_size));
            model.entries.push(entry);
        }
        model.reset_pinning();
        model
    }

    fn entry(&self, id: &str) -> Option<&ColumnEntry> {
        self.entries.iter().find(|e| e.def.id == id)
    }

    fn entry_mut(&mut self, id: &str) -> Option<&mut ColumnEntry> {
        self.entries.iter_mut().find(|e| e.def.id == id)
    }

    /// All column definitions, synthetic ones included, in definition order.
    pub fn defs(&self) -> impl Iterator<Item = &ColumnDef> {
        self.entries.iter().map(|e| &e.def)
    }

    pub fn def(&self, id: &str) -> Option<&ColumnDef> {
        self.entry(id).map(|e| &e.def)
    }

    pub fn size(&self, id: &str) -> Option<u32> {
        self.entry(id).map(|e| e.size)
    }

    /// Pin side as rendered, forced sides included.
    pub fn pin_of(&self, id: &str) -> Option<Pin> {
        self.entry(id).map(ColumnEntry::effective_pin)
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.entry(id).map(|e| e.visible)
    }

    /// Set a column's width, clamped to its `[min, max]` range.
    ///
    /// Returns the width now in effect, or `None` for an unknown column.
    /// Non-resizable columns keep their width.
    pub fn resize(&mut self, id: &str, proposed: i64) -> Option<u32> {
        let entry = self.entry_mut(id)?;
        if !entry.def.resizable {
            debug!(column = %id, "ignoring resize of non-resizable column");
            return Some(entry.size);
        }
        let applied = entry.clamp(proposed);
        if i64::from(applied) != proposed {
            debug!(column = %id, proposed, applied, "clamped column width");
        }
        entry.size = applied;
        Some(applied)
    }

    /// Size a column to fit its header and the given (filtered) rows.
    pub fn auto_fit<'r, M, I>(&mut self, id: &str, rows: I, measurer: &M) -> Option<u32>
    where
        M: Measure + ?Sized,
        I: IntoIterator<Item = &'r Row>,
    {
        let def = self.def(id)?;
        if !def.resizable {
            debug!(column = %id, "ignoring auto-fit of non-resizable column");
            return self.size(id);
        }
        let header_width = measurer.measure(&def.header);
        let widest = rows
            .into_iter()
            .filter_map(|row| def.value(row).and_then(CellValue::to_display))
            .map(|text| measurer.measure(&text))
            .fold(header_width, u32::max);
        self.resize(id, i64::from(widest))
    }

    /// Pin a column to a side, or unpin it with `Pin::None`.
    pub fn pin(&mut self, id: &str, side: Pin) -> Outcome {
        let seq = self.next_pin_seq;
        let Some(entry) = self.entry_mut(id) else {
            return Outcome::Ignored;
        };
        if entry.def.is_synthetic() || !entry.def.pinnable {
            debug!(column = %id, ?side, "ignoring pin request on non-pinnable column");
            return Outcome::Ignored;
        }
        if entry.pin != side {
            entry.pin = side;
            entry.pin_seq = seq;
            self.next_pin_seq += 1;
        }
        Outcome::Applied
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> Outcome {
        let Some(entry) = self.entry_mut(id) else {
            return Outcome::Ignored;
        };
        if entry.def.is_synthetic() || !entry.def.hideable {
            debug!(column = %id, visible, "ignoring visibility change on non-hideable column");
            return Outcome::Ignored;
        }
        entry.visible = visible;
        Outcome::Applied
    }

    pub fn toggle_visibility(&mut self, id: &str) -> Outcome {
        match self.is_visible(id) {
            Some(visible) => self.set_visible(id, !visible),
            None => Outcome::Ignored,
        }
    }

    /// Restore every user-pinnable column to its declared pin side.
    pub fn reset_pinning(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.def.is_synthetic() {
                continue;
            }
            entry.pin = if entry.def.pinnable {
                entry.def.default_pin
            } else {
                Pin::None
            };
            entry.pin_seq = self.next_pin_seq;
            self.next_pin_seq += 1;
        }
    }

    /// Clear every user pin.
    pub fn unpin_all(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| !e.def.is_synthetic()) {
            entry.pin = Pin::None;
        }
    }

    pub fn reset_sizing(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.size = entry.clamp(i64::from(entry.def.default_size));
        }
    }

    fn ordered_entries(&self) -> Vec<&ColumnEntry> {
        let visible = || self.entries.iter().filter(|e| e.visible);
        let user_pinned = |side: Pin| {
            let mut pinned: Vec<&ColumnEntry> = visible()
                .filter(|e| !e.def.is_synthetic() && e.pin == side)
                .collect();
            pinned.sort_by_key(|e| e.pin_seq);
            pinned
        };

        let mut order: Vec<&ColumnEntry> = Vec::with_capacity(self.entries.len());
        for kind in [ColumnKind::Selection, ColumnKind::RowNumber] {
            order.extend(visible().filter(|e| e.def.kind == kind));
        }
        order.extend(user_pinned(Pin::Left));
        order.extend(visible().filter(|e| !e.def.is_synthetic() && e.pin == Pin::None));
        order.extend(user_pinned(Pin::Right));
        order.extend(visible().filter(|e| e.def.kind == ColumnKind::Actions));
        order
    }

    /// Visible column ids in rendered order.
    pub fn effective_order(&self) -> Vec<&str> {
        self.ordered_entries()
            .into_iter()
            .map(|e| e.def.id.as_str())
            .collect()
    }

    /// Pixel offset of a visible column within its pin group.
    pub fn offset(&self, id: &str) -> Option<u32> {
        self.geometry().into_iter().find(|g| g.id == id).map(|g| g.offset)
    }

    /// Width, pin side and offset of every visible column, in rendered order.
    pub fn geometry(&self) -> Vec<ColumnGeometry> {
        let order = self.ordered_entries();
        let mut geometry: Vec<ColumnGeometry> = order
            .iter()
            .map(|e| ColumnGeometry {
                id: e.def.id.clone(),
                header: e.def.header.clone(),
                kind: e.def.kind,
                size: e.size,
                pin: e.effective_pin(),
                offset: 0,
            })
            .collect();

        let (mut left, mut center) = (0u32, 0u32);
        for g in geometry.iter_mut() {
            let acc = match g.pin {
                Pin::Left => &mut left,
                Pin::None => &mut center,
                Pin::Right => continue,
            };
            g.offset = *acc;
            *acc = acc.saturating_add(g.size);
        }

        let mut right = 0u32;
        for g in geometry.iter_mut().rev().filter(|g| g.pin == Pin::Right) {
            g.offset = right;
            right = right.saturating_add(g.size);
        }

        geometry
    }
}
