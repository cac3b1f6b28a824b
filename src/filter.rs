//! Per-column filter values, global search, and their AND-composition.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::column::{ColumnDef, ColumnModel, FilterKind};
use crate::row::Row;
use crate::value::CellValue;

/// A filter for one column. A value with an empty payload is inactive and
/// constrains nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    /// Case-insensitive substring.
    Text(String),
    /// Exact numeric equality.
    Number(Option<f64>),
    /// Exact equality with one option.
    Select(Option<String>),
    /// Membership in a set of options.
    MultiSelect(BTreeSet<String>),
    /// Same calendar day.
    Date(Option<NaiveDate>),
    /// Inclusive bounds, either of which may be open.
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn select(s: impl Into<String>) -> Self {
        FilterValue::Select(Some(s.into()))
    }

    pub fn multi<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::MultiSelect(options.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterValue::Text(_) => FilterKind::Text,
            FilterValue::Number(_) => FilterKind::Number,
            FilterValue::Select(_) => FilterKind::Select,
            FilterValue::MultiSelect(_) => FilterKind::MultiSelect,
            FilterValue::Date(_) => FilterKind::Date,
            FilterValue::DateRange { .. } => FilterKind::DateRange,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Text(s) => !s.is_empty(),
            FilterValue::Number(n) => n.is_some_and(|n| !n.is_nan()),
            FilterValue::Select(s) => s.as_deref().is_some_and(|s| !s.is_empty()),
            FilterValue::MultiSelect(set) => !set.is_empty(),
            FilterValue::Date(d) => d.is_some(),
            FilterValue::DateRange { from, to } => from.is_some() || to.is_some(),
        }
    }

    /// Evaluate against one cell. Null and unparseable values never match.
    pub fn matches_value(&self, value: &CellValue) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            FilterValue::Text(needle) => value
                .to_display()
                .is_some_and(|hay| contains_ignore_case(&hay, needle)),
            FilterValue::Number(Some(n)) => value.as_number().is_some_and(|v| v == *n),
            FilterValue::Select(Some(option)) => {
                value.to_display().is_some_and(|v| v == *option)
            }
            FilterValue::MultiSelect(options) => {
                value.to_display().is_some_and(|v| options.contains(&v))
            }
            FilterValue::Date(Some(day)) => value.as_date().is_some_and(|d| d == *day),
            FilterValue::DateRange { from, to } => value.as_date().is_some_and(|d| {
                from.map_or(true, |from| d >= from) && to.map_or(true, |to| d <= to)
            }),
            FilterValue::Number(None) | FilterValue::Select(None) | FilterValue::Date(None) => {
                false
            }
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Every column filter plus the global search term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub columns: BTreeMap<String, FilterValue>,
    pub global_search: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column filter.
    pub fn with(mut self, column: impl Into<String>, value: FilterValue) -> Self {
        self.columns.insert(column.into(), value);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.global_search = term.into();
        self
    }

    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.columns.get(column)
    }

    pub fn search_term(&self) -> Option<&str> {
        let term = self.global_search.trim();
        (!term.is_empty()).then_some(term)
    }

    /// True when no filter and no search term constrains the rows.
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none() && !self.columns.values().any(FilterValue::is_active)
    }

    /// Drop inactive values and filters on unknown or non-filterable columns.
    pub fn sanitized(&self, columns: &ColumnModel) -> FilterState {
        let kept = self
            .columns
            .iter()
            .filter(|(id, value)| {
                let filterable = columns.def(id).is_some_and(|d| d.filterable);
                if !filterable {
                    debug!(column = %id, "ignoring filter on non-filterable column");
                }
                filterable && value.is_active()
            })
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect();
        FilterState {
            columns: kept,
            global_search: self.search_term().unwrap_or_default().to_string(),
        }
    }
}

fn searchable(def: &ColumnDef) -> bool {
    def.filterable && !def.is_synthetic() && def.accessor.is_some()
}

/// Whether a row passes every active column filter and the global search.
pub fn matches(columns: &ColumnModel, row: &Row, filters: &FilterState) -> bool {
    let columns_pass = filters.columns.iter().all(|(id, value)| {
        if !value.is_active() {
            return true;
        }
        match columns.def(id) {
            Some(def) if def.filterable => def
                .value(row)
                .is_some_and(|cell| value.matches_value(cell)),
            _ => true,
        }
    });

    columns_pass && matches_search(columns, row, filters.search_term())
}

/// Global search: the term must appear in at least one filterable column.
pub fn matches_search(columns: &ColumnModel, row: &Row, term: Option<&str>) -> bool {
    let Some(term) = term else {
        return true;
    };
    let term = term.to_lowercase();
    columns
        .defs()
        .filter(|def| searchable(def))
        .filter_map(|def| def.value(row).and_then(CellValue::to_display))
        .any(|text| text.to_lowercase().contains(&term))
}

/// Rows passing `filters`, in dataset order. Large inputs are filtered on the rayon pool.
pub fn filter_rows<'a>(
    columns: &ColumnModel,
    rows: &'a [Row],
    filters: &FilterState,
    parallel_threshold: usize,
) -> Vec<&'a Row> {
    if filters.is_empty() {
        return rows.iter().collect();
    }

    let kept: Vec<&Row> = if rows.len() >= parallel_threshold {
        rows.par_iter()
            .filter(|row| matches(columns, row, filters))
            .collect()
    } else {
        rows.iter()
            .filter(|row| matches(columns, row, filters))
            .collect()
    };

    trace!(total = rows.len(), kept = kept.len(), "filtered rows");
    kept
}
