use std::fmt;

use allocative::Allocative;

/// Represents the supported data types in the database schema.
/// These types define the structure of columns and the expected format of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Allocative)]
pub enum DataType {
    /// A 64-bit signed integer (`INT`).
    Int,
    /// A UTF-8 character string with a declared length bound (`VARCHAR(n)`).
    /// The bound is only checked when the database is configured to enforce it.
    Varchar(usize),
    /// A boolean value (`BOOLEAN`).
    Bool,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("INT"),
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::Bool => f.write_str("BOOLEAN"),
        }
    }
}
