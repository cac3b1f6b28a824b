//! Composite, stable row ordering.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::column::ColumnModel;
use crate::row::Row;

/// Sorting direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Ordered sort keys; earlier keys take priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKeys(Vec<SortKey>);

impl SortKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn direction_of(&self, column: &str) -> Option<SortDirection> {
        self.0.iter().find(|k| k.column == column).map(|k| k.direction)
    }

    /// Keep only keys on known sortable columns, first occurrence wins.
    pub fn sanitized(keys: Vec<SortKey>, columns: &ColumnModel) -> SortKeys {
        let mut kept: Vec<SortKey> = Vec::with_capacity(keys.len());
        for key in keys {
            let sortable = columns
                .def(&key.column)
                .is_some_and(|d| d.sortable && !d.is_synthetic());
            if !sortable {
                debug!(column = %key.column, "ignoring sort on non-sortable column");
                continue;
            }
            if kept.iter().any(|k| k.column == key.column) {
                continue;
            }
            kept.push(key);
        }
        SortKeys(kept)
    }

    /// Header click: unsorted -> ascending -> descending -> unsorted.
    ///
    /// Returns false when the column can't be sorted.
    pub fn cycle(&mut self, column: &str, columns: &ColumnModel) -> bool {
        let sortable = columns
            .def(column)
            .is_some_and(|d| d.sortable && !d.is_synthetic());
        if !sortable {
            debug!(column = %column, "ignoring sort toggle on non-sortable column");
            return false;
        }

        match self.0.iter().position(|k| k.column == column) {
            None => self.0.push(SortKey::ascending(column)),
            Some(idx) => match self.0[idx].direction {
                SortDirection::Ascending => self.0[idx].direction = SortDirection::Descending,
                SortDirection::Descending => {
                    self.0.remove(idx);
                }
            },
        }
        true
    }
}

impl From<Vec<SortKey>> for SortKeys {
    fn from(keys: Vec<SortKey>) -> Self {
        SortKeys(keys)
    }
}

/// Compare two rows by the sort keys, first non-equal key wins.
///
/// Nulls sort after every value in both directions.
pub fn compare(columns: &ColumnModel, a: &Row, b: &Row, keys: &SortKeys) -> Ordering {
    for key in keys.keys() {
        let Some(def) = columns.def(&key.column) else {
            continue;
        };
        let (Some(va), Some(vb)) = (def.value(a), def.value(b)) else {
            continue;
        };

        let ord = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let base = va.sort_cmp(vb);
                match key.direction {
                    SortDirection::Ascending => base,
                    SortDirection::Descending => base.reverse(),
                }
            }
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable in-place sort. Large inputs sort on the rayon pool (still stable).
pub fn sort_rows(columns: &ColumnModel, rows: &mut [&Row], keys: &SortKeys, parallel_threshold: usize) {
    if keys.is_empty() {
        return;
    }
    let cmp_fn = |a: &&Row, b: &&Row| compare(columns, a, b, keys);
    if rows.len() >= parallel_threshold {
        rows.par_sort_by(cmp_fn);
    } else {
        rows.sort_by(cmp_fn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDef, SELECTION_COLUMN_ID};
    use crate::config::GridConfig;
    use crate::value::CellValue;
    use chrono::NaiveDate;

    fn columns() -> ColumnModel {
        ColumnModel::new(
            vec![
                ColumnDef::new("status"),
                ColumnDef::new("joined"),
                ColumnDef::new("score"),
                ColumnDef::new("notes").sortable(false),
            ],
            &GridConfig::default(),
        )
    }

    fn row(id: &str, status: &str, joined: (i32, u32, u32), score: Option<f64>) -> Row {
        Row::new(id)
            .with("status", status)
            .with("joined", NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap())
            .with("score", CellValue::from(score))
    }

    fn ids(rows: &[&Row]) -> Vec<String> {
        rows.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_cycle_through_states() {
        let cols = columns();
        let mut keys = SortKeys::new();
        assert!(keys.cycle("status", &cols));
        assert_eq!(keys.direction_of("status"), Some(SortDirection::Ascending));
        assert!(keys.cycle("status", &cols));
        assert_eq!(keys.direction_of("status"), Some(SortDirection::Descending));
        assert!(keys.cycle("status", &cols));
        assert_eq!(keys.direction_of("status"), None);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_cycle_appends_new_columns_and_mutates_in_place() {
        let cols = columns();
        let mut keys = SortKeys::new();
        keys.cycle("status", &cols);
        keys.cycle("joined", &cols);
        keys.cycle("status", &cols);
        assert_eq!(
            keys.keys(),
            &[SortKey::descending("status"), SortKey::ascending("joined")]
        );
    }

    #[test]
    fn test_non_sortable_never_enters_keys() {
        let cols = columns();
        let mut keys = SortKeys::new();
        assert!(!keys.cycle("notes", &cols));
        assert!(!keys.cycle(SELECTION_COLUMN_ID, &cols));
        assert!(!keys.cycle("missing", &cols));
        assert!(keys.is_empty());

        let keys = SortKeys::sanitized(
            vec![
                SortKey::ascending("notes"),
                SortKey::ascending("score"),
                SortKey::descending("score"),
            ],
            &cols,
        );
        assert_eq!(keys.keys(), &[SortKey::ascending("score")]);
    }

    #[test]
    fn test_composite_sort_status_then_joined_desc() {
        let cols = columns();
        let data = vec![
            row("a", "pending", (2023, 1, 5), None),
            row("b", "active", (2022, 6, 1), None),
            row("c", "active", (2023, 3, 1), None),
            row("d", "pending", (2023, 7, 9), None),
            row("e", "active", (2021, 1, 1), None),
        ];
        let mut rows: Vec<&Row> = data.iter().collect();
        let keys = SortKeys::from(vec![SortKey::ascending("status"), SortKey::descending("joined")]);
        sort_rows(&cols, &mut rows, &keys, usize::MAX);
        assert_eq!(ids(&rows), vec!["c", "b", "e", "d", "a"]);
    }

    #[test]
    fn test_ties_keep_original_order() {
        let cols = columns();
        let data: Vec<Row> = (0..50)
            .map(|i| row(&format!("r{}", i), if i % 2 == 0 { "x" } else { "y" }, (2020, 1, 1), None))
            .collect();
        let keys = SortKeys::from(vec![SortKey::descending("status")]);

        for threshold in [usize::MAX, 1] {
            let mut rows: Vec<&Row> = data.iter().collect();
            sort_rows(&cols, &mut rows, &keys, threshold);
            let ys: Vec<String> = (0..50).filter(|i| i % 2 == 1).map(|i| format!("r{}", i)).collect();
            let xs: Vec<String> = (0..50).filter(|i| i % 2 == 0).map(|i| format!("r{}", i)).collect();
            assert_eq!(ids(&rows), [ys, xs].concat());
        }
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let cols = columns();
        let data = vec![
            row("n", "s", (2020, 1, 1), None),
            row("lo", "s", (2020, 1, 1), Some(1.0)),
            row("hi", "s", (2020, 1, 1), Some(9.0)),
        ];
        let mut rows: Vec<&Row> = data.iter().collect();
        sort_rows(&cols, &mut rows, &SortKeys::from(vec![SortKey::ascending("score")]), usize::MAX);
        assert_eq!(ids(&rows), vec!["lo", "hi", "n"]);
        sort_rows(&cols, &mut rows, &SortKeys::from(vec![SortKey::descending("score")]), usize::MAX);
        assert_eq!(ids(&rows), vec!["hi", "lo", "n"]);
    }

    #[test]
    fn test_no_keys_is_identity() {
        let cols = columns();
        let data = vec![row("b", "z", (2020, 1, 1), None), row("a", "a", (2020, 1, 1), None)];
        let mut rows: Vec<&Row> = data.iter().collect();
        sort_rows(&cols, &mut rows, &SortKeys::new(), 0);
        assert_eq!(ids(&rows), vec!["b", "a"]);
    }
}
