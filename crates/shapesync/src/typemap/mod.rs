//! Type mapping between logical property types and MySQL column types.
//!
//! The mapping is total in both directions: unknown declared types fall back
//! to `string` (and therefore a VARCHAR column), unknown column types read
//! back from a live database also come back as `string`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// VARCHAR size for key columns of string type.
pub const KEY_VARCHAR_SIZE: usize = 255;

/// VARCHAR size for non-key columns of string type.
pub const VALUE_VARCHAR_SIZE: usize = 1000;

/// Logical property type as declared by a data point shape (`"name:type"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Date,
    Integer,
    Float,
    Bool,
    Text,
    String,
}

impl LogicalType {
    /// Parse a declared type name. Never fails: anything unrecognised is `String`.
    pub fn parse(declared: &str) -> Self {
        match declared.trim().to_lowercase().as_str() {
            "date" => LogicalType::Date,
            "integer" | "int" => LogicalType::Integer,
            "float" | "decimal" | "double" => LogicalType::Float,
            "bool" => LogicalType::Bool,
            "text" => LogicalType::Text,
            _ => LogicalType::String,
        }
    }

    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Date => "date",
            LogicalType::Integer => "integer",
            LogicalType::Float => "float",
            LogicalType::Bool => "bool",
            LogicalType::Text => "text",
            LogicalType::String => "string",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MySQL column type used in rendered DDL and for value coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    DateTime,
    Int,
    Float,
    Bit,
    Text,
    Varchar(usize),
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::DateTime => f.write_str("DATETIME"),
            SqlType::Int => f.write_str("INT(10)"),
            SqlType::Float => f.write_str("FLOAT"),
            SqlType::Bit => f.write_str("BIT"),
            SqlType::Text => f.write_str("TEXT"),
            SqlType::Varchar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

/// Map a logical type to its MySQL column type.
pub fn to_sql_type(logical: LogicalType, is_key: bool) -> SqlType {
    match logical {
        LogicalType::Date => SqlType::DateTime,
        LogicalType::Integer => SqlType::Int,
        LogicalType::Float => SqlType::Float,
        LogicalType::Bool => SqlType::Bit,
        LogicalType::Text => SqlType::Text,
        LogicalType::String if is_key => SqlType::Varchar(KEY_VARCHAR_SIZE),
        LogicalType::String => SqlType::Varchar(VALUE_VARCHAR_SIZE),
    }
}

/// Map a column type read from a live database (`DESCRIBE` output) back to a
/// logical type.
pub fn from_sql_type(column_type: &str) -> LogicalType {
    let base = column_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match base.as_str() {
        "datetime" | "date" | "time" | "smalldatetime" => LogicalType::Date,
        "bigint" | "int" | "smallint" | "tinyint" => LogicalType::Integer,
        "decimal" | "float" | "money" | "smallmoney" => LogicalType::Float,
        "bit" => LogicalType::Bool,
        _ => LogicalType::String,
    }
}
