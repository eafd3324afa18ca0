use std::{fmt, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{
    data_type::DataType,
    error::{Error, Result},
};

/// Represents a single scalar value stored in the database.
///
/// There is no NULL: every cell of every row holds exactly one of these.
/// Ordering is only meaningful between values of the same variant, which is
/// all the engine ever compares since columns are typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// A 64-bit signed integer value.
    Int(i64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning between
    /// rows, indices and results.
    Text(Arc<str>),
    /// A boolean value. `false` sorts before `true`.
    Bool(bool),
}

impl Value {
    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// SQL name of the value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "INT",
            Self::Text(_) => "VARCHAR",
            Self::Bool(_) => "BOOLEAN",
        }
    }

    /// Whether the value can be stored as is in a column of `data_type`.
    pub fn is_of(&self, data_type: DataType) -> bool {
        matches!(
            (self, data_type),
            (Self::Int(_), DataType::Int)
                | (Self::Text(_), DataType::Varchar(_))
                | (Self::Bool(_), DataType::Bool)
        )
    }

    /// Converts a literal into a value of the declared column type.
    ///
    /// - `INT` accepts integers and quoted text holding an integer.
    /// - `BOOLEAN` accepts booleans and quoted `'true'` / `'false'` (any case).
    /// - `VARCHAR` accepts quoted text only.
    ///
    /// # Errors
    /// Returns [Error::TypeMismatch] when no rule applies.
    pub fn coerce_to(self, data_type: DataType, column: &str) -> Result<Value> {
        let coerced = match (data_type, self) {
            (DataType::Int, v @ Value::Int(_)) => Some(v),
            (DataType::Int, Value::Text(s)) => s.parse::<i64>().ok().map(Value::Int),
            (DataType::Bool, v @ Value::Bool(_)) => Some(v),
            (DataType::Bool, Value::Text(s)) if s.eq_ignore_ascii_case("true") => {
                Some(Value::Bool(true))
            }
            (DataType::Bool, Value::Text(s)) if s.eq_ignore_ascii_case("false") => {
                Some(Value::Bool(false))
            }
            (DataType::Varchar(_), v @ Value::Text(_)) => Some(v),
            (_, other) => {
                return Err(Error::TypeMismatch {
                    column: column.to_string(),
                    expected: data_type.to_string(),
                    found: other.type_name().to_string(),
                });
            }
        };

        coerced.ok_or_else(|| Error::TypeMismatch {
            column: column.to_string(),
            expected: data_type.to_string(),
            found: "non-convertible VARCHAR".to_string(),
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(Arc::from(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
        }
    }
}

/// Values serialize as their bare scalar, without a variant tag.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}
