//! A minimal in-memory relational engine.
//!
//! SQL text goes through the [tokenizer], the [parser] and the [executor],
//! which reads and writes tables held in a [catalog]. Every column of every
//! table carries a sorted [index] used to answer WHERE conditions.
//!
//! ```
//! use minidb::Database;
//!
//! let mut db = Database::new();
//! db.execute("CREATE TABLE users (id INT, name VARCHAR(50), age INT)").unwrap();
//! db.execute("INSERT INTO users VALUES (1, 'Alice', 30), (2, 'Bob', 25)").unwrap();
//!
//! let result = db.query("SELECT * FROM users WHERE age > 25").unwrap();
//! assert_eq!(result.count, 1);
//! ```

pub mod ast;
pub mod catalog;
pub mod column;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod executor;
pub mod index;
pub mod parser;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use column::Column;
pub use config::Config;
pub use data_type::DataType;
pub use database::{Database, ExecResult, QueryResult, SharedDatabase, TableInfo};
pub use error::{Error, Result};
pub use table::{ColumnDef, Schema, Table};
pub use value::Value;
