use std::sync::Arc;

use allocative::Allocative;
use bitvec::prelude::*;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Typed backing vector of a column, one slot per stored row.
#[derive(Debug, Clone, Allocative)]
pub enum ColumnData {
    Int(Vec<i64>),
    /// Shares its strings with the column's index.
    Text(Vec<Arc<str>>),
    /// One bit per row.
    Bool(#[allocative(skip)] BitVec),
}

/// One column of a table: its declaration plus a slot for every stored row.
/// Slots of deleted rows keep their last value until the owning
/// [crate::Table] compacts them away; liveness and the slot to row id
/// mapping are tracked there.
#[derive(Debug, Clone, Allocative)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub data: ColumnData,
}

impl Column {
    /// An empty column whose backing vector matches `data_type`.
    pub fn new(name: String, data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Int => ColumnData::Int(Vec::new()),
            DataType::Varchar(_) => ColumnData::Text(Vec::new()),
            DataType::Bool => ColumnData::Bool(BitVec::new()),
        };
        Self {
            name,
            data_type,
            data,
        }
    }

    /// Appends a slot.
    ///
    /// # Errors
    /// [Error::TypeMismatch] if `value` is not of the column's type; nothing
    /// is appended then.
    ///
    /// # Example
    /// ```
    /// # use minidb::column::Column;
    /// # use minidb::data_type::DataType;
    /// # use minidb::value::Value;
    /// let mut flags = Column::new("active".into(), DataType::Bool);
    /// flags.push(Value::Bool(true)).unwrap();
    /// assert!(flags.push(Value::Int(1)).is_err());
    ///
    /// assert_eq!(flags.len(), 1);
    /// assert_eq!(flags.get(0), Some(Value::Bool(true)));
    /// ```
    pub fn push(&mut self, value: Value) -> Result<()> {
        match (&mut self.data, value) {
            (ColumnData::Int(slots), Value::Int(v)) => slots.push(v),
            (ColumnData::Text(slots), Value::Text(v)) => slots.push(v),
            (ColumnData::Bool(bits), Value::Bool(v)) => bits.push(v),
            (_, value) => return Err(self.mismatch(&value)),
        }
        Ok(())
    }

    /// Number of slots, dead rows included.
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(slots) => slots.len(),
            ColumnData::Text(slots) => slots.len(),
            ColumnData::Bool(bits) => bits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value in `slot`, `None` past the end.
    pub fn get(&self, slot: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Int(slots) => slots.get(slot).copied().map(Value::Int),
            ColumnData::Text(slots) => slots.get(slot).cloned().map(Value::Text),
            ColumnData::Bool(bits) => bits.get(slot).map(|bit| Value::Bool(*bit)),
        }
    }

    /// Overwrites `slot`.
    ///
    /// # Errors
    /// [Error::UnknownRow] past the end, [Error::TypeMismatch] for a value of
    /// another type. The slot is untouched on error.
    pub fn set(&mut self, slot: usize, value: &Value) -> Result<()> {
        if slot >= self.len() {
            return Err(Error::UnknownRow(slot));
        }
        match (&mut self.data, value) {
            (ColumnData::Int(slots), Value::Int(v)) => slots[slot] = *v,
            (ColumnData::Text(slots), Value::Text(v)) => slots[slot] = Arc::clone(v),
            (ColumnData::Bool(bits), Value::Bool(v)) => bits.set(slot, *v),
            (_, value) => return Err(self.mismatch(value)),
        }
        Ok(())
    }

    /// Keeps the slots whose bit in `keep` is set, in order, and releases
    /// the freed capacity. Slots past the end of `keep` are dropped.
    pub fn retain(&mut self, keep: &BitSlice) {
        match &mut self.data {
            ColumnData::Int(slots) => retain_slots(slots, keep),
            ColumnData::Text(slots) => retain_slots(slots, keep),
            ColumnData::Bool(bits) => {
                *bits = bits
                    .iter()
                    .by_vals()
                    .zip(keep.iter().by_vals())
                    .filter_map(|(bit, kept)| kept.then_some(bit))
                    .collect();
            }
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::TypeMismatch {
            column: self.name.clone(),
            expected: self.data_type.to_string(),
            found: value.type_name().to_string(),
        }
    }
}

fn retain_slots<T>(slots: &mut Vec<T>, keep: &BitSlice) {
    let mut flags = keep.iter().by_vals();
    slots.retain(|_| flags.next().unwrap_or(false));
    slots.shrink_to_fit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_column_is_empty() {
        let col = Column::new("name".into(), DataType::Varchar(20));

        assert!(col.is_empty());
        assert!(matches!(col.data, ColumnData::Text(_)));
        assert_eq!(col.get(0), None);
    }

    #[test]
    fn test_text_slots() {
        let mut col = Column::new("name".into(), DataType::Varchar(20));

        col.push(Value::from("Alice")).unwrap();
        col.push(Value::from("Bob")).unwrap();

        assert_eq!(col.len(), 2);
        assert_eq!(col.get(1), Some(Value::from("Bob")));
        assert_eq!(col.get(2), None);
    }

    #[test]
    fn test_bool_slots() {
        let mut col = Column::new("active".into(), DataType::Bool);

        for i in 0..70 {
            col.push(Value::Bool(i % 7 == 0)).unwrap();
        }

        assert_eq!(col.len(), 70);
        assert_eq!(col.get(63), Some(Value::Bool(true)));
        assert_eq!(col.get(64), Some(Value::Bool(false)));
    }

    #[test]
    fn test_push_rejects_other_types() {
        let mut col = Column::new("age".into(), DataType::Int);

        let err = col.push(Value::from("ten")).unwrap_err();

        assert_eq!(
            err,
            Error::TypeMismatch {
                column: "age".into(),
                expected: "INT".into(),
                found: "VARCHAR".into(),
            }
        );
        assert!(col.is_empty());
    }

    #[test]
    fn test_set_overwrites_in_place() {
        let mut col = Column::new("age".into(), DataType::Int);
        col.push(Value::Int(30)).unwrap();
        col.push(Value::Int(40)).unwrap();

        col.set(1, &Value::Int(41)).unwrap();
        assert_eq!(col.get(1), Some(Value::Int(41)));

        assert_eq!(col.set(2, &Value::Int(1)), Err(Error::UnknownRow(2)));
        assert!(col.set(0, &Value::Bool(true)).is_err());
        assert_eq!(col.get(0), Some(Value::Int(30)));
    }

    #[test]
    fn test_retain_drops_unkept_slots() {
        let mut names = Column::new("name".into(), DataType::Varchar(20));
        let mut flags = Column::new("active".into(), DataType::Bool);
        for (i, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
            names.push(Value::from(name)).unwrap();
            flags.push(Value::Bool(i % 2 == 1)).unwrap();
        }

        let keep = bitvec![0, 1, 0, 1];
        names.retain(&keep);
        flags.retain(&keep);

        assert_eq!(names.len(), 2);
        assert_eq!(names.get(0), Some(Value::from("b")));
        assert_eq!(names.get(1), Some(Value::from("d")));
        assert_eq!(flags.len(), 2);
        assert_eq!(flags.get(1), Some(Value::Bool(true)));

        names.retain(&BitVec::new());
        assert!(names.is_empty());
    }
}
