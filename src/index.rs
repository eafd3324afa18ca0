//! Per-column secondary indices.
//!
//! Each column owns one [ColumnIndex] mapping every distinct value to the set
//! of row identifiers currently holding it. The map is ordered, so range
//! predicates resolve to a contiguous run of keys located in `O(log n)`.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
    sync::Arc,
};

use allocative::Allocative;

use crate::{
    ast::ComparisonOp,
    data_type::DataType,
    error::{Error, Result},
    value::Value,
};

/// Stable identifier of a row inside its table, never reused.
pub type RowId = usize;

/// Set of row identifiers, iterated in insertion order.
pub type RowIdSet = BTreeSet<RowId>;

/// Ordered map from a key to the rows holding it. Keys with no rows are pruned.
#[derive(Debug, Clone, Allocative)]
pub struct SortedIndex<K: Ord> {
    entries: BTreeMap<K, RowIdSet>,
}

impl<K: Ord> Default for SortedIndex<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> SortedIndex<K> {
    pub fn insert(&mut self, key: K, row_id: RowId) {
        self.entries.entry(key).or_default().insert(row_id);
    }

    /// Removes `row_id` from `key`'s set, dropping the key once its set is empty.
    pub fn remove(&mut self, key: &K, row_id: RowId) {
        if let Some(rows) = self.entries.get_mut(key) {
            rows.remove(&row_id);
            if rows.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// Rows whose key satisfies `key op value`.
    pub fn lookup(&self, op: ComparisonOp, value: &K) -> RowIdSet {
        match op {
            ComparisonOp::Eq => self.entries.get(value).cloned().unwrap_or_default(),
            ComparisonOp::NotEq => {
                let below = self.entries.range(..value);
                let above = self
                    .entries
                    .range((Bound::Excluded(value), Bound::Unbounded));
                union(below.chain(above).map(|(_, rows)| rows))
            }
            ComparisonOp::Lt => union(self.entries.range(..value).map(|(_, rows)| rows)),
            ComparisonOp::LtEq => union(self.entries.range(..=value).map(|(_, rows)| rows)),
            ComparisonOp::Gt => union(
                self.entries
                    .range((Bound::Excluded(value), Bound::Unbounded))
                    .map(|(_, rows)| rows),
            ),
            ComparisonOp::GtEq => union(self.entries.range(value..).map(|(_, rows)| rows)),
        }
    }

    /// Every row referenced by the index.
    pub fn all(&self) -> RowIdSet {
        union(self.entries.values())
    }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        self.entries.len()
    }
}

fn union<'a>(sets: impl Iterator<Item = &'a RowIdSet>) -> RowIdSet {
    sets.flat_map(|rows| rows.iter().copied()).collect()
}

/// A [SortedIndex] keyed by the column's declared scalar type.
#[derive(Debug, Clone, Allocative)]
pub enum ColumnIndex {
    Int(SortedIndex<i64>),
    Text(SortedIndex<Arc<str>>),
    Bool(SortedIndex<bool>),
}

impl ColumnIndex {
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => Self::Int(SortedIndex::default()),
            DataType::Varchar(_) => Self::Text(SortedIndex::default()),
            DataType::Bool => Self::Bool(SortedIndex::default()),
        }
    }

    /// Records that `row_id` holds `value`.
    ///
    /// # Errors
    /// Returns [Error::IndexKeyMismatch] if `value` is not of the indexed type.
    pub fn insert(&mut self, value: &Value, row_id: RowId) -> Result<()> {
        match (self, value) {
            (Self::Int(index), Value::Int(v)) => index.insert(*v, row_id),
            (Self::Text(index), Value::Text(v)) => index.insert(Arc::clone(v), row_id),
            (Self::Bool(index), Value::Bool(v)) => index.insert(*v, row_id),
            (index, value) => return Err(index.mismatch(value)),
        }
        Ok(())
    }

    /// Forgets that `row_id` holds `value`.
    pub fn remove(&mut self, value: &Value, row_id: RowId) -> Result<()> {
        match (self, value) {
            (Self::Int(index), Value::Int(v)) => index.remove(v, row_id),
            (Self::Text(index), Value::Text(v)) => index.remove(v, row_id),
            (Self::Bool(index), Value::Bool(v)) => index.remove(v, row_id),
            (index, value) => return Err(index.mismatch(value)),
        }
        Ok(())
    }

    /// Rows whose indexed value satisfies `column op value`.
    pub fn lookup(&self, op: ComparisonOp, value: &Value) -> Result<RowIdSet> {
        match (self, value) {
            (Self::Int(index), Value::Int(v)) => Ok(index.lookup(op, v)),
            (Self::Text(index), Value::Text(v)) => Ok(index.lookup(op, v)),
            (Self::Bool(index), Value::Bool(v)) => Ok(index.lookup(op, v)),
            (index, value) => Err(index.mismatch(value)),
        }
    }

    pub fn all(&self) -> RowIdSet {
        match self {
            Self::Int(index) => index.all(),
            Self::Text(index) => index.all(),
            Self::Bool(index) => index.all(),
        }
    }

    pub fn distinct_keys(&self) -> usize {
        match self {
            Self::Int(index) => index.distinct_keys(),
            Self::Text(index) => index.distinct_keys(),
            Self::Bool(index) => index.distinct_keys(),
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        let expected = match self {
            Self::Int(_) => "INT",
            Self::Text(_) => "VARCHAR",
            Self::Bool(_) => "BOOLEAN",
        };
        Error::IndexKeyMismatch {
            expected: expected.into(),
            found: value.type_name().into(),
        }
    }
}
