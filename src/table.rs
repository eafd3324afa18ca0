use allocative::Allocative;
use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::ast::Condition;
use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::index::{ColumnIndex, RowId, RowIdSet};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

/// A table: schema, columnar row storage and one index per column.
///
/// Row ids are handed out in increasing order and never reused. Rows live
/// in slots; `slot_ids[slot]` is the id of the row stored there, ascending,
/// so an id is found by binary search. Deleting a row clears its bit in
/// `live`; once dead slots outnumber live ones the columns are compacted.
/// For every column `c` and live row `r`, the index of `c` maps `row[r][c]`
/// to a set containing `r`, and nothing else.
#[derive(Debug, Clone, Allocative)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    columns: Vec<Column>,
    indexes: Vec<ColumnIndex>,
    slot_ids: Vec<RowId>,
    #[allocative(skip)]
    live: BitVec,
    row_count: usize,
    next_row_id: RowId,
}

impl Table {
    /// Creates an empty table with one empty index per column.
    ///
    /// # Errors
    /// Returns [Error::DuplicateColumn] if two columns share a name.
    pub fn new(name: String, schema: Schema) -> Result<Self> {
        for (i, col) in schema.columns.iter().enumerate() {
            if schema.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::DuplicateColumn {
                    table: name,
                    column: col.name.clone(),
                });
            }
        }

        let columns = schema
            .columns
            .iter()
            .map(|column| Column::new(column.name.clone(), column.data_type))
            .collect();
        let indexes = schema
            .columns
            .iter()
            .map(|column| ColumnIndex::new(column.data_type))
            .collect();
        Ok(Self {
            name,
            schema,
            columns,
            indexes,
            slot_ids: Vec::new(),
            live: BitVec::new(),
            row_count: 0,
            next_row_id: 0,
        })
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of occupied slots, dead rows not yet compacted away included.
    pub fn slot_count(&self) -> usize {
        self.slot_ids.len()
    }

    /// Column names in declared order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Position of a column in the schema.
    ///
    /// # Errors
    /// Returns [Error::UnknownColumn] if the table has no such column.
    pub fn column_position(&self, name: &str) -> Result<usize> {
        self.schema
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::unknown_column(&self.name, name))
    }

    /// Slot-ordered storage of a column.
    pub fn get_col(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// The index maintained for a column.
    pub fn index(&self, name: &str) -> Option<&ColumnIndex> {
        let pos = self.column_position(name).ok()?;
        self.indexes.get(pos)
    }

    pub fn contains(&self, row_id: RowId) -> bool {
        self.slot(row_id).is_some()
    }

    /// Ids of every live row, ascending.
    pub fn row_ids(&self) -> RowIdSet {
        self.live.iter_ones().map(|slot| self.slot_ids[slot]).collect()
    }

    /// The row's values in declared column order, if the row is live.
    pub fn get_row(&self, row_id: RowId) -> Option<Vec<Value>> {
        self.row_at(self.slot(row_id)?)
    }

    /// Full unfiltered iteration over live rows in row-id order.
    pub fn scan(&self) -> impl Iterator<Item = (RowId, Vec<Value>)> + '_ {
        self.live
            .iter_ones()
            .filter_map(|slot| Some((self.slot_ids[slot], self.row_at(slot)?)))
    }

    /// Coerces a literal to the declared type of the column at `pos`.
    ///
    /// # Errors
    /// [Error::ColumnOutOfRange] for a position past the last column,
    /// [Error::TypeMismatch] if no coercion applies, [Error::ValueTooLong] if
    /// `enforce_length` is set and the text exceeds the VARCHAR bound.
    pub fn coerce(&self, pos: usize, value: Value, enforce_length: bool) -> Result<Value> {
        let def = self.column_def(pos)?;
        let value = value.coerce_to(def.data_type, &def.name)?;
        if let (true, DataType::Varchar(max), Value::Text(s)) =
            (enforce_length, def.data_type, &value)
        {
            let len = s.chars().count();
            if len > max {
                return Err(Error::ValueTooLong {
                    column: def.name.clone(),
                    max,
                    len,
                });
            }
        }
        Ok(value)
    }

    /// Stores a full row, already coerced and in declared column order, and
    /// indexes every column. Returns the new row id.
    ///
    /// # Errors
    /// [Error::ColumnCountMismatch] or [Error::TypeMismatch] if the row does
    /// not fit the schema; the table is unchanged in that case.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<RowId> {
        if values.len() != self.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (col, value) in self.columns.iter().zip(&values) {
            if !value.is_of(col.data_type) {
                return Err(Error::TypeMismatch {
                    column: col.name.clone(),
                    expected: col.data_type.to_string(),
                    found: value.type_name().to_string(),
                });
            }
        }

        let row_id = self.next_row_id;
        for ((col, index), value) in self.columns.iter_mut().zip(&mut self.indexes).zip(values) {
            index.insert(&value, row_id)?;
            col.push(value)?;
        }
        self.slot_ids.push(row_id);
        self.live.push(true);
        self.row_count += 1;
        self.next_row_id += 1;
        Ok(row_id)
    }

    /// Applies `(column position, value)` assignments to every given row,
    /// moving index entries for the values that change. Values must already
    /// be coerced. Returns the number of rows updated.
    ///
    /// # Errors
    /// [Error::UnknownRow] if any id is not live, [Error::ColumnOutOfRange]
    /// for a bad position, [Error::TypeMismatch] if a value does not fit its
    /// column; nothing is changed then.
    pub fn update(&mut self, row_ids: &RowIdSet, assignments: &[(usize, Value)]) -> Result<usize> {
        let slots = self.slots_of(row_ids)?;
        for (pos, value) in assignments {
            let def = self.column_def(*pos)?;
            if !value.is_of(def.data_type) {
                return Err(Error::TypeMismatch {
                    column: def.name.clone(),
                    expected: def.data_type.to_string(),
                    found: value.type_name().to_string(),
                });
            }
        }

        for (row_id, slot) in slots {
            for (pos, value) in assignments {
                let (Some(column), Some(index)) =
                    (self.columns.get_mut(*pos), self.indexes.get_mut(*pos))
                else {
                    return Err(Error::ColumnOutOfRange {
                        table: self.name.clone(),
                        position: *pos,
                    });
                };
                let old = column.get(slot).ok_or(Error::UnknownRow(row_id))?;
                if old == *value {
                    continue;
                }
                column.set(slot, value)?;
                index.remove(&old, row_id)?;
                index.insert(value, row_id)?;
            }
        }
        Ok(row_ids.len())
    }

    /// Removes every given row from the row storage and from every index.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    /// [Error::UnknownRow] if any id is not live; nothing is changed then.
    pub fn delete(&mut self, row_ids: &RowIdSet) -> Result<usize> {
        let slots = self.slots_of(row_ids)?;

        for (row_id, slot) in slots {
            for (col, index) in self.columns.iter().zip(&mut self.indexes) {
                if let Some(value) = col.get(slot) {
                    index.remove(&value, row_id)?;
                }
            }
            self.live.set(slot, false);
            self.row_count -= 1;
        }

        if self.slot_ids.len() - self.row_count > self.row_count {
            self.compact();
        }
        Ok(row_ids.len())
    }

    /// Ids of the live rows satisfying one condition. With `use_index` the
    /// column's index answers; otherwise every live row is compared directly.
    ///
    /// # Errors
    /// [Error::UnknownColumn] for an unknown column, [Error::TypeMismatch] if
    /// the literal cannot be coerced to the column type.
    pub fn matching(&self, condition: &Condition, use_index: bool) -> Result<RowIdSet> {
        let pos = self.column_position(&condition.column)?;
        let def = self.column_def(pos)?;
        let value = condition.value.clone().coerce_to(def.data_type, &def.name)?;

        if use_index {
            trace!(table = %self.name, column = %def.name, op = %condition.op, "index lookup");
            let index = self.indexes.get(pos).ok_or_else(|| self.out_of_range(pos))?;
            return index.lookup(condition.op, &value);
        }

        trace!(table = %self.name, column = %def.name, op = %condition.op, "scan fallback");
        let column = self.columns.get(pos).ok_or_else(|| self.out_of_range(pos))?;
        Ok(self
            .live
            .iter_ones()
            .filter(|&slot| {
                column
                    .get(slot)
                    .is_some_and(|v| condition.op.matches(&v, &value))
            })
            .map(|slot| self.slot_ids[slot])
            .collect())
    }

    /// Heap memory owned by the table, indices included.
    pub fn heap_bytes(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }

    fn column_def(&self, pos: usize) -> Result<&ColumnDef> {
        self.schema
            .columns
            .get(pos)
            .ok_or_else(|| self.out_of_range(pos))
    }

    fn out_of_range(&self, position: usize) -> Error {
        Error::ColumnOutOfRange {
            table: self.name.clone(),
            position,
        }
    }

    fn slot(&self, row_id: RowId) -> Option<usize> {
        let slot = self.slot_ids.binary_search(&row_id).ok()?;
        self.live.get(slot).is_some_and(|bit| *bit).then_some(slot)
    }

    fn row_at(&self, slot: usize) -> Option<Vec<Value>> {
        self.columns.iter().map(|col| col.get(slot)).collect()
    }

    /// `(row id, slot)` of every id, failing on the first one not live.
    fn slots_of(&self, row_ids: &RowIdSet) -> Result<Vec<(RowId, usize)>> {
        row_ids
            .iter()
            .map(|&id| self.slot(id).map(|slot| (id, slot)).ok_or(Error::UnknownRow(id)))
            .collect()
    }

    /// Drops dead slots from every column. Row ids are untouched.
    fn compact(&mut self) {
        let keep = std::mem::take(&mut self.live);
        for col in &mut self.columns {
            col.retain(&keep);
        }
        let mut flags = keep.iter().by_vals();
        self.slot_ids.retain(|_| flags.next().unwrap_or(false));
        self.slot_ids.shrink_to_fit();
        self.live = BitVec::repeat(true, self.slot_ids.len());
        debug!(table = %self.name, dropped = keep.count_zeros(), "compacted");
    }
}
