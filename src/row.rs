//! Row records, their identities, and the resident dataset.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::value::CellValue;

/// Stable row identity. Selection and ordering are keyed on this, never on
/// a row's position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RowId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// An application record: an identity plus named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    id: RowId,
    fields: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn id(&self) -> &RowId {
        &self.id
    }

    /// Missing fields read as `CellValue::Null`.
    pub fn get(&self, field: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The fully resident, ordered set of rows the grid presents.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    index: HashMap<RowId, usize>,
}

impl Dataset {
    /// Build a dataset, rejecting empty or duplicate row ids.
    pub fn new(rows: Vec<Row>) -> Result<Self, GridError> {
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            if row.id().as_str().is_empty() {
                return Err(GridError::EmptyRowId { position: pos });
            }
            if index.insert(row.id().clone(), pos).is_some() {
                return Err(GridError::DuplicateRowId(row.id().clone()));
            }
        }
        Ok(Self { rows, index })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> HashSet<&RowId> {
        self.index.keys().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reads_null() {
        let row = Row::new("1").with("name", "Ada");
        assert_eq!(row.get("name"), &CellValue::from("Ada"));
        assert!(row.get("email").is_null());
    }

    #[test]
    fn test_dataset_rejects_duplicate_ids() {
        let rows = vec![Row::new("a"), Row::new("b"), Row::new("a")];
        match Dataset::new(rows) {
            Err(GridError::DuplicateRowId(id)) => assert_eq!(id.as_str(), "a"),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_dataset_rejects_empty_id() {
        let rows = vec![Row::new("a"), Row::new("")];
        assert!(matches!(
            Dataset::new(rows),
            Err(GridError::EmptyRowId { position: 1 })
        ));
    }

    #[test]
    fn test_dataset_lookup_by_id() {
        let ds = Dataset::new(vec![Row::new("a").with("n", 1i64), Row::new("b")]).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.contains(&RowId::from("b")));
        assert_eq!(ds.get(&RowId::from("a")).unwrap().get("n"), &CellValue::Number(1.0));
        assert!(ds.get(&RowId::from("zzz")).is_none());
    }
}
