use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeStruct},
};
use tracing::debug;

use crate::{
    ColumnDef, Value,
    ast::Statement,
    catalog::Catalog,
    config::Config,
    error::{Error, Result},
    executor::{Executor, select_rows},
    parser::parse_sql,
    table::Table,
};

/// The main entry point for the in-memory database engine.
/// It owns the catalog of tables and runs SQL statements against it.
#[derive(Debug, Default)]
pub struct Database {
    catalog: Catalog,
    config: Config,
}

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set, in projection order.
    pub columns: Vec<String>,
    /// The actual data, returned as a vector of rows, where each row is a vector of [Value].
    pub rows: Vec<Vec<Value>>,
    /// Number of rows returned, after LIMIT.
    pub count: usize,
}

impl QueryResult {
    /// Value of `column` in the `row`-th returned row.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let pos = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(pos)
    }

    /// Rows as `(column, value)` pairs in projection order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(|row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }
}

/// `{"rows": [{column: value, ..}], "count": n}`
impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let records: Vec<Record<'_>> = self
            .rows
            .iter()
            .map(|row| Record {
                columns: &self.columns,
                row,
            })
            .collect();
        let mut state = serializer.serialize_struct("QueryResult", 2)?;
        state.serialize_field("rows", &records)?;
        state.serialize_field("count", &self.count)?;
        state.end()
    }
}

struct Record<'a> {
    columns: &'a [String],
    row: &'a [Value],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    /// Rows produced by a SELECT.
    Rows(QueryResult),
    /// Rows inserted, updated or deleted; `0` for CREATE TABLE.
    Affected(usize),
}

impl ExecResult {
    pub fn rows(&self) -> Option<&QueryResult> {
        match self {
            Self::Rows(result) => Some(result),
            Self::Affected(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<QueryResult> {
        match self {
            Self::Rows(result) => Some(result),
            Self::Affected(_) => None,
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Self::Rows(_) => None,
            Self::Affected(n) => Some(*n),
        }
    }
}

/// Either the query payload or `{"affected": n}`.
impl Serialize for ExecResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Rows(result) => result.serialize(serializer),
            Self::Affected(n) => {
                let mut state = serializer.serialize_struct("Affected", 1)?;
                state.serialize_field("affected", n)?;
                state.end()
            }
        }
    }
}

/// Summary of one table, see [Database::describe_table].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<(String, String)>,
    pub row_count: usize,
    /// Heap memory held by the table's rows and indices.
    pub heap_bytes: usize,
}

impl Database {
    /// Creates a new, empty database instance with the default [Config].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            catalog: Catalog::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a new table in the database.
    ///
    /// # Errors
    /// Returns an error if a table with the same name already exists or if
    /// two columns share a name.
    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> Result<()> {
        self.catalog.create_table(name, columns)
    }

    /// Removes a table from the database by its name.
    ///
    /// # Errors
    /// Returns [Error::UnknownTable] if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.catalog.drop_table(name).map(|_| ())
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.catalog.get_table(name).ok()
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        self.catalog.list_tables()
    }

    /// Schema, live row count and memory footprint of a table.
    ///
    /// # Errors
    /// Returns [Error::UnknownTable] if the table does not exist.
    pub fn describe_table(&self, name: &str) -> Result<TableInfo> {
        let table = self.catalog.get_table(name)?;
        Ok(TableInfo {
            name: table.name.clone(),
            columns: table
                .schema
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.data_type.to_string()))
                .collect(),
            row_count: table.row_count(),
            heap_bytes: table.heap_bytes(),
        })
    }

    /// Executes one SQL statement.
    ///
    /// SELECT returns [ExecResult::Rows]; CREATE TABLE, INSERT, UPDATE and
    /// DELETE return [ExecResult::Affected]. A failing statement leaves every
    /// table unchanged.
    ///
    /// # Errors
    /// Returns an error if tokenization, parsing, or execution fails.
    ///
    /// # Example
    /// ```
    /// use minidb::{Database, ExecResult, Value};
    /// let mut db = Database::new();
    /// db.execute("CREATE TABLE users (id INT)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1), (20)").unwrap();
    ///
    /// let deleted = db.execute("DELETE FROM users WHERE id > 12").unwrap();
    /// assert_eq!(deleted, ExecResult::Affected(1));
    ///
    /// let result = db.query("SELECT * FROM users").unwrap();
    /// assert_eq!(result.rows[0][0], Value::Int(1));
    /// assert_eq!(result.count, 1);
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<ExecResult> {
        let statement = parse_sql(sql)?;
        debug!(sql, "parsed statement");
        Executor::new(&mut self.catalog, &self.config).execute(statement)
    }

    /// Executes statements in order, stopping at the first failure.
    ///
    /// # Errors
    /// The first error met; statements before it stay applied.
    pub fn execute_many(&mut self, statements: &[&str]) -> Result<Vec<ExecResult>> {
        statements.iter().map(|sql| self.execute(sql)).collect()
    }

    /// Executes a `SELECT` query and returns the resulting data set.
    ///
    /// # Example
    ///
    /// ```
    /// use minidb::{Database, Value};
    ///
    /// let mut db = Database::new();
    /// db.execute("CREATE TABLE products (name VARCHAR(20), price INT)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Laptop', 1200)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Mouse', 25)").unwrap();
    ///
    /// let result = db.query("SELECT name FROM products ORDER BY price").unwrap();
    ///
    /// assert_eq!(result.columns, vec!["name"]);
    /// assert_eq!(result.rows.len(), 2);
    /// assert_eq!(result.rows[0][0], Value::from("Mouse"));
    /// assert_eq!(result.rows[1][0], Value::from("Laptop"));
    /// ```
    ///
    /// # Errors
    /// Returns a parse error if the SQL is not a `SELECT` statement, or any
    /// error raised while running it.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        match parse_sql(sql)? {
            Statement::Select(select) => select_rows(&self.catalog, &self.config, &select),
            other => Err(Error::parse("SELECT", other.kind(), 0)),
        }
    }
}

/// A [Database] that can be shared between threads.
///
/// Each call holds one lock for the whole statement, so statements from
/// different threads never interleave.
#[derive(Debug, Clone, Default)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    pub fn execute(&self, sql: &str) -> Result<ExecResult> {
        self.inner.lock().execute(sql)
    }

    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        self.inner.lock().query(sql)
    }

    /// Locks the database for several operations in a row.
    pub fn lock(&self) -> MutexGuard<'_, Database> {
        self.inner.lock()
    }
}

impl From<Database> for SharedDatabase {
    fn from(db: Database) -> Self {
        Self::new(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;

    fn simple_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef {
                name: "id".to_string(),
                data_type: DataType::Int,
            },
            ColumnDef {
                name: "name".to_string(),
                data_type: DataType::Varchar(50),
            },
        ]
    }

    fn users() -> Database {
        let mut db = Database::new();
        db.execute_many(&[
            "CREATE TABLE users (id INT, name VARCHAR(50), age INT)",
            "INSERT INTO users VALUES (1, 'Alice', 30)",
            "INSERT INTO users VALUES (2, 'Bob', 17)",
            "INSERT INTO users VALUES (3, 'Charlie', 25)",
        ])
        .unwrap();
        db
    }

    fn ids(result: &QueryResult) -> Vec<i64> {
        result
            .rows
            .iter()
            .filter_map(|row| row[0].as_int())
            .collect()
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = Database::new();

        assert!(db.create_table("users", simple_columns()).is_ok());
        assert!(db.get_table("users").is_some());

        assert!(db.drop_table("users").is_ok());
        assert!(db.get_table("users").is_none());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = Database::new();

        db.create_table("users", simple_columns()).unwrap();
        let err = db.execute("CREATE TABLE users (id INT)");

        assert_eq!(err, Err(Error::DuplicateTable("users".into())));
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new();

        let err = db.drop_table("unknown");
        assert_eq!(err, Err(Error::UnknownTable("unknown".into())));
    }

    #[test]
    fn test_list_tables() {
        let mut db = Database::new();

        db.create_table("users", simple_columns()).unwrap();
        db.create_table("posts", simple_columns()).unwrap();

        assert_eq!(db.list_tables(), vec!["posts", "users"]);
    }

    #[test]
    fn test_execute_insert_and_query_star() {
        let mut db = Database::new();
        db.execute("CREATE TABLE users (id INT, name VARCHAR(10))")
            .unwrap();

        db.execute("INSERT INTO users VALUES (1, 'Alice')").unwrap();
        db.execute("INSERT INTO users VALUES (2, 'Bob')").unwrap();

        let result = db.query("SELECT * FROM users").unwrap();

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.count, 2);
        assert_eq!(result.rows[0], vec![Value::Int(1), Value::from("Alice")]);
        assert_eq!(result.rows[1], vec![Value::Int(2), Value::from("Bob")]);
    }

    #[test]
    fn test_insert_with_column_reordering() {
        let mut db = Database::new();
        db.execute("CREATE TABLE users (id INT, name VARCHAR(10))")
            .unwrap();

        db.execute("INSERT INTO users (name, id) VALUES ('Charlie', 3)")
            .unwrap();

        let result = db.query("SELECT name, id FROM users").unwrap();

        // projection order, not schema order
        assert_eq!(result.rows[0], vec![Value::from("Charlie"), Value::Int(3)]);
    }

    #[test]
    fn test_insert_partial_columns_rejected() {
        let mut db = Database::new();
        db.execute("CREATE TABLE users (id INT, name VARCHAR(10))")
            .unwrap();

        let err = db.execute("INSERT INTO users (id) VALUES (4)");

        assert_eq!(
            err,
            Err(Error::ColumnCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_query_with_where_simple() {
        let db = users();

        let result = db.query("SELECT id FROM users WHERE age >= 25").unwrap();
        assert_eq!(ids(&result), vec![1, 3]);

        let result = db.query("SELECT id FROM users WHERE name = 'Bob'").unwrap();
        assert_eq!(ids(&result), vec![2]);
    }

    #[test]
    fn test_query_with_where_and_or() {
        let db = users();

        let result = db
            .query("SELECT id FROM users WHERE age > 18 AND name != 'Alice'")
            .unwrap();
        assert_eq!(ids(&result), vec![3]);

        let result = db
            .query("SELECT id FROM users WHERE age < 18 OR id = 1")
            .unwrap();
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_query_with_limit() {
        let db = users();

        let result = db.query("SELECT * FROM users LIMIT 2").unwrap();
        assert_eq!(ids(&result), vec![1, 2]);
        assert_eq!(result.count, 2);

        let result = db.query("SELECT * FROM users LIMIT 0").unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_query_with_where_no_match() {
        let db = users();

        let result = db.query("SELECT * FROM users WHERE age > 99").unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.columns, vec!["id", "name", "age"]);
    }

    #[test]
    fn test_query_order_by_hidden_column() {
        let db = users();

        let result = db.query("SELECT name FROM users ORDER BY age").unwrap();
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("Bob")],
                vec![Value::from("Charlie")],
                vec![Value::from("Alice")]
            ]
        );
    }

    #[test]
    fn test_query_rejects_other_statements() {
        let db = users();

        let err = db.query("DELETE FROM users").unwrap_err();
        assert!(err.is_parse_error());
        assert_eq!(db.get_table("users").unwrap().row_count(), 3);
    }

    #[test]
    fn test_delete_specific_row() {
        let mut db = users();

        let result = db.execute("DELETE FROM users WHERE id = 2").unwrap();
        assert_eq!(result.affected(), Some(1));

        let result = db.query("SELECT id FROM users").unwrap();
        assert_eq!(ids(&result), vec![1, 3]);
    }

    #[test]
    fn test_delete_no_match() {
        let mut db = users();

        let result = db.execute("DELETE FROM users WHERE age > 99").unwrap();
        assert_eq!(result, ExecResult::Affected(0));
        assert_eq!(db.query("SELECT * FROM users").unwrap().count, 3);
    }

    #[test]
    fn test_delete_all_rows() {
        let mut db = users();

        assert_eq!(db.execute("DELETE FROM users").unwrap(), ExecResult::Affected(3));
        assert_eq!(db.query("SELECT * FROM users").unwrap().count, 0);
    }

    #[test]
    fn test_update_multiple_columns() {
        let mut db = users();

        let result = db
            .execute("UPDATE users SET name = 'Robert', age = 18 WHERE id = 2")
            .unwrap();
        assert_eq!(result, ExecResult::Affected(1));

        let result = db.query("SELECT * FROM users WHERE id = 2").unwrap();
        assert_eq!(
            result.rows[0],
            vec![Value::Int(2), Value::from("Robert"), Value::Int(18)]
        );
    }

    #[test]
    fn test_update_type_mismatch_error() {
        let mut db = users();

        let err = db.execute("UPDATE users SET age = 'old' WHERE id = 1");
        assert!(matches!(err, Err(Error::TypeMismatch { .. })));

        let result = db.query("SELECT age FROM users WHERE id = 1").unwrap();
        assert_eq!(result.rows[0][0], Value::Int(30));
    }

    #[test]
    fn test_update_no_rows_matched() {
        let mut db = users();

        let result = db.execute("UPDATE users SET age = 1 WHERE id = 42").unwrap();
        assert_eq!(result, ExecResult::Affected(0));
    }

    #[test]
    fn test_update_non_existent_column() {
        let mut db = users();

        let err = db.execute("UPDATE users SET age = 1, email = 'x'");
        assert_eq!(
            err,
            Err(Error::UnknownColumn {
                table: "users".into(),
                column: "email".into()
            })
        );
        // nothing was touched, not even the first assignment
        let result = db.query("SELECT age FROM users").unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Int(30)], vec![Value::Int(17)], vec![Value::Int(25)]]
        );
    }

    #[test]
    fn test_query_result_helpers() {
        let db = users();
        let result = db.query("SELECT name, age FROM users WHERE id = 3").unwrap();

        assert_eq!(result.get(0, "age"), Some(&Value::Int(25)));
        assert_eq!(result.get(0, "id"), None);
        assert_eq!(result.get(1, "age"), None);

        let records: Vec<_> = result.records().collect();
        assert_eq!(
            records,
            vec![vec![("name", &Value::from("Charlie")), ("age", &Value::Int(25))]]
        );
    }

    #[test]
    fn test_describe_table() {
        let mut db = users();
        let before = db.describe_table("users").unwrap();

        assert_eq!(before.name, "users");
        assert_eq!(
            before.columns,
            vec![
                ("id".to_string(), "INT".to_string()),
                ("name".to_string(), "VARCHAR(50)".to_string()),
                ("age".to_string(), "INT".to_string())
            ]
        );
        assert_eq!(before.row_count, 3);

        for i in 0..200 {
            db.execute(&format!("INSERT INTO users VALUES ({i}, 'user{i}', {i})"))
                .unwrap();
        }
        let after = db.describe_table("users").unwrap();
        assert_eq!(after.row_count, 203);
        assert!(after.heap_bytes > before.heap_bytes);

        assert!(matches!(
            db.describe_table("ghosts"),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn test_execute_many_stops_at_first_error() {
        let mut db = Database::new();

        let err = db.execute_many(&[
            "CREATE TABLE t (a INT)",
            "INSERT INTO t VALUES (1)",
            "INSERT INTO nope VALUES (2)",
            "INSERT INTO t VALUES (3)",
        ]);
        assert_eq!(err, Err(Error::UnknownTable("nope".into())));
        assert_eq!(db.query("SELECT * FROM t").unwrap().count, 1);
    }

    #[test]
    fn test_shared_database() {
        let shared = SharedDatabase::new(Database::new());
        shared.execute("CREATE TABLE t (a INT)").unwrap();

        let clone = shared.clone();
        clone.execute("INSERT INTO t VALUES (1)").unwrap();

        assert_eq!(shared.query("SELECT * FROM t").unwrap().count, 1);
        assert_eq!(shared.lock().list_tables(), vec!["t"]);
    }
}
