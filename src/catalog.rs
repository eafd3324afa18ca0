use std::collections::HashMap;

use tracing::info;

use crate::{
    ColumnDef, Value,
    error::{Error, Result},
    index::{RowId, RowIdSet},
    table::{Schema, Table},
};

/// Name-keyed collection of every table of one database.
///
/// Mutations resolve and validate their whole input before touching a
/// table, so a failed call leaves the catalog exactly as it found it.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty table.
    ///
    /// # Errors
    /// [Error::DuplicateTable] if the name is taken, [Error::DuplicateColumn]
    /// if two columns share a name.
    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }
        let table = Table::new(name.to_string(), Schema { columns })?;
        info!(table = name, columns = table.schema.columns.len(), "created table");
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Removes a table and returns it.
    ///
    /// # Errors
    /// [Error::UnknownTable] if no table has that name.
    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        let table = self
            .tables
            .remove(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        info!(table = name, rows = table.row_count(), "dropped table");
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    /// Table names, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Inserts value tuples, binding them to `columns` or, when absent, to the
    /// declared column order. Every tuple is resolved and coerced before the
    /// first one is stored. Returns the new row ids.
    ///
    /// # Errors
    /// [Error::UnknownTable], [Error::UnknownColumn], [Error::DuplicateColumn],
    /// [Error::ColumnCountMismatch], [Error::TypeMismatch] or
    /// [Error::ValueTooLong].
    pub fn insert(
        &mut self,
        table: &str,
        columns: Option<&[String]>,
        rows: Vec<Vec<Value>>,
        enforce_length: bool,
    ) -> Result<Vec<RowId>> {
        let table = self.get_table_mut(table)?;
        let width = table.schema.columns.len();

        // order[pos] = where the value of declared column `pos` sits in a tuple
        let order: Vec<usize> = match columns {
            None => (0..width).collect(),
            Some(names) => {
                let mut positions = Vec::with_capacity(names.len());
                for name in names {
                    let pos = table.column_position(name)?;
                    if positions.contains(&pos) {
                        return Err(Error::DuplicateColumn {
                            table: table.name.clone(),
                            column: name.clone(),
                        });
                    }
                    positions.push(pos);
                }
                (0..width)
                    .map(|pos| {
                        positions.iter().position(|&p| p == pos).ok_or(
                            Error::ColumnCountMismatch {
                                expected: width,
                                found: names.len(),
                            },
                        )
                    })
                    .collect::<Result<_>>()?
            }
        };
        let arity = columns.map_or(width, <[String]>::len);

        let mut resolved = Vec::with_capacity(rows.len());
        for tuple in rows {
            if tuple.len() != arity {
                return Err(Error::ColumnCountMismatch {
                    expected: arity,
                    found: tuple.len(),
                });
            }
            let row = order
                .iter()
                .enumerate()
                .map(|(pos, &i)| table.coerce(pos, tuple[i].clone(), enforce_length))
                .collect::<Result<Vec<_>>>()?;
            resolved.push(row);
        }

        resolved.into_iter().map(|row| table.insert(row)).collect()
    }

    /// Assigns literals to the given rows after resolving and coercing every
    /// assignment. Returns the number of rows updated.
    ///
    /// # Errors
    /// [Error::UnknownTable], [Error::UnknownColumn], [Error::TypeMismatch] or
    /// [Error::ValueTooLong], all raised before any row changes.
    pub fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Value)],
        row_ids: &RowIdSet,
        enforce_length: bool,
    ) -> Result<usize> {
        let table = self.get_table_mut(table)?;
        let resolved = assignments
            .iter()
            .map(|(column, value)| -> Result<(usize, Value)> {
                let pos = table.column_position(column)?;
                Ok((pos, table.coerce(pos, value.clone(), enforce_length)?))
            })
            .collect::<Result<Vec<_>>>()?;

        table.update(row_ids, &resolved)
    }

    /// Removes the given rows. Returns the number removed.
    pub fn delete(&mut self, table: &str, row_ids: &RowIdSet) -> Result<usize> {
        self.get_table_mut(table)?.delete(row_ids)
    }

    /// Every live row of a table in row-id order.
    pub fn scan(&self, table: &str) -> Result<impl Iterator<Item = (RowId, Vec<Value>)> + '_> {
        Ok(self.get_table(table)?.scan())
    }
}
