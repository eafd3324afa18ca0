//! Interprets parsed statements against a [Catalog].
//!
//! WHERE clauses are resolved to row-id sets one condition at a time, through
//! the column's index or, when indices are disabled, by comparing every live
//! row. The per-condition sets are then intersected (AND) or united (OR).
//! Errors raised by the storage layer propagate untouched.

use tracing::debug;

use crate::{
    ast::{
        ColumnsSelect, Connective, CreateTable, Delete, InsertInto, Select, Statement, Update,
        WhereClause,
    },
    catalog::Catalog,
    config::Config,
    database::{ExecResult, QueryResult},
    error::{Error, Result},
    index::RowIdSet,
    table::Table,
};

/// Runs statements against one catalog with one configuration.
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
    config: &'a Config,
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a mut Catalog, config: &'a Config) -> Self {
        Self { catalog, config }
    }

    /// Executes one statement.
    ///
    /// SELECT yields [ExecResult::Rows]; every other statement yields
    /// [ExecResult::Affected], which is `0` for CREATE TABLE.
    pub fn execute(&mut self, statement: Statement) -> Result<ExecResult> {
        let kind = statement.kind();
        let result = match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::InsertInto(insert) => self.insert(insert),
            Statement::Select(select) => {
                select_rows(self.catalog, self.config, &select).map(ExecResult::Rows)
            }
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(&delete),
        }?;

        match &result {
            ExecResult::Rows(rows) => debug!(statement = kind, count = rows.count, "executed"),
            ExecResult::Affected(n) => debug!(statement = kind, affected = n, "executed"),
        }
        Ok(result)
    }

    fn create_table(&mut self, create: CreateTable) -> Result<ExecResult> {
        self.catalog.create_table(&create.name, create.columns)?;
        Ok(ExecResult::Affected(0))
    }

    fn insert(&mut self, insert: InsertInto) -> Result<ExecResult> {
        let ids = self.catalog.insert(
            &insert.table,
            insert.columns.as_deref(),
            insert.rows,
            self.config.enforce_varchar_length,
        )?;
        Ok(ExecResult::Affected(ids.len()))
    }

    fn update(&mut self, update: Update) -> Result<ExecResult> {
        let row_ids = {
            let table = self.catalog.get_table(&update.table)?;
            resolve_predicate(table, update.where_clause.as_ref(), self.config.use_indexes)?
        };
        let affected = self.catalog.update(
            &update.table,
            &update.assignments,
            &row_ids,
            self.config.enforce_varchar_length,
        )?;
        Ok(ExecResult::Affected(affected))
    }

    fn delete(&mut self, delete: &Delete) -> Result<ExecResult> {
        let row_ids = {
            let table = self.catalog.get_table(&delete.table)?;
            resolve_predicate(table, delete.where_clause.as_ref(), self.config.use_indexes)?
        };
        let affected = self.catalog.delete(&delete.table, &row_ids)?;
        Ok(ExecResult::Affected(affected))
    }
}

/// Filters, orders, limits then projects.
///
/// Ordering happens on full rows so that ORDER BY may name a column that
/// is not projected. The sort is stable, so ties keep row-id order.
///
/// # Errors
/// [Error::DuplicateColumn] if the projection names a column twice, since
/// each output record is keyed by column name.
pub fn select_rows(catalog: &Catalog, config: &Config, select: &Select) -> Result<QueryResult> {
    let table = catalog.get_table(&select.table)?;

    let columns = match &select.columns {
        ColumnsSelect::Star => table.column_names(),
        ColumnsSelect::ColumnsNames(names) => names.clone(),
    };
    if let Some(i) = (1..columns.len()).find(|&i| columns[..i].contains(&columns[i])) {
        return Err(Error::DuplicateColumn {
            table: table.name.clone(),
            column: columns[i].clone(),
        });
    }
    let projection = columns
        .iter()
        .map(|name| table.column_position(name))
        .collect::<Result<Vec<_>>>()?;
    let order_by = select
        .order_by
        .as_deref()
        .map(|name| table.column_position(name))
        .transpose()?;

    let row_ids = resolve_predicate(table, select.where_clause.as_ref(), config.use_indexes)?;
    let mut rows = row_ids
        .into_iter()
        .map(|id| table.get_row(id).ok_or(Error::UnknownRow(id)))
        .collect::<Result<Vec<_>>>()?;

    if let Some(pos) = order_by {
        rows.sort_by(|a, b| a[pos].cmp(&b[pos]));
    }
    if let Some(limit) = select.limit {
        rows.truncate(limit);
    }

    let rows: Vec<_> = rows
        .into_iter()
        .map(|row| projection.iter().map(|&pos| row[pos].clone()).collect())
        .collect();
    Ok(QueryResult {
        columns,
        count: rows.len(),
        rows,
    })
}

/// Ids of the live rows of `table` matching the clause; every live row when
/// the clause is absent.
///
/// # Errors
/// [Error::UnknownColumn] or [Error::TypeMismatch] from any condition, even
/// when an earlier condition already decided the outcome.
pub fn resolve_predicate(
    table: &Table,
    where_clause: Option<&WhereClause>,
    use_indexes: bool,
) -> Result<RowIdSet> {
    let Some(clause) = where_clause else {
        return Ok(table.row_ids());
    };

    let sets = clause
        .conditions
        .iter()
        .map(|condition| table.matching(condition, use_indexes))
        .collect::<Result<Vec<_>>>()?;

    let mut sets = sets.into_iter();
    let first = sets.next().unwrap_or_default();
    Ok(match clause.connective {
        Connective::And => sets.fold(first, |acc, set| &acc & &set),
        Connective::Or => sets.fold(first, |mut acc, set| {
            acc.extend(set);
            acc
        }),
    })
}
