//! Value coercion into the literal form a MySQL column type expects.
//!
//! Coercion never fails. A value that cannot be converted is bound unchanged
//! and left for the server to accept or reject.

use chrono::{DateTime, Utc};

use crate::core::value::SqlValue;
use crate::typemap::SqlType;

/// MySQL DATETIME literal format.
pub const MYSQL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coerce a value for a column of the given SQL type.
///
/// - `DATETIME`: RFC3339 strings are rewritten as `YYYY-MM-DD HH:MM:SS` in UTC;
///   anything else passes through.
/// - `TEXT`: unchanged.
/// - `VARCHAR(n)`: strings longer than `n` characters are cut to `n`.
pub fn coerce(sql_type: &SqlType, value: SqlValue) -> SqlValue {
    match (sql_type, value) {
        (SqlType::DateTime, SqlValue::Text(s)) => match DateTime::parse_from_rfc3339(&s) {
            Ok(date) => SqlValue::Text(format_mysql_datetime(&date.with_timezone(&Utc))),
            Err(_) => SqlValue::Text(s),
        },
        (SqlType::Varchar(size), SqlValue::Text(s)) => SqlValue::Text(truncate_chars(s, *size)),
        (_, value) => value,
    }
}

/// Render a UTC timestamp as a MySQL DATETIME literal.
pub fn format_mysql_datetime(date: &DateTime<Utc>) -> String {
    date.format(MYSQL_TIME_FORMAT).to_string()
}

fn truncate_chars(s: String, size: usize) -> String {
    match s.char_indices().nth(size) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn test_datetime_rfc3339_is_rewritten_in_utc() {
        assert_eq!(
            coerce(&SqlType::DateTime, text("2017-10-11T08:30:00Z")),
            text("2017-10-11 08:30:00")
        );
        assert_eq!(
            coerce(&SqlType::DateTime, text("2017-10-11T08:30:00-05:00")),
            text("2017-10-11 13:30:00")
        );
    }

    #[test]
    fn test_datetime_malformed_passes_through() {
        assert_eq!(coerce(&SqlType::DateTime, text("2017-10-11")), text("2017-10-11"));
        assert_eq!(coerce(&SqlType::DateTime, text("yesterday")), text("yesterday"));
        assert_eq!(coerce(&SqlType::DateTime, SqlValue::Int(7)), SqlValue::Int(7));
    }

    #[test]
    fn test_text_unchanged() {
        let long = "x".repeat(5000);
        assert_eq!(coerce(&SqlType::Text, text(&long)), text(&long));
    }

    #[test]
    fn test_varchar_truncates_to_size() {
        let long = "12345678".repeat(32);
        let coerced = coerce(&SqlType::Varchar(255), text(&long));
        assert_eq!(coerced, text(&long[..255]));
    }

    #[test]
    fn test_varchar_short_value_unchanged() {
        assert_eq!(coerce(&SqlType::Varchar(10), text("short")), text("short"));
        assert_eq!(coerce(&SqlType::Varchar(5), text("exact")), text("exact"));
    }

    #[test]
    fn test_varchar_truncates_on_char_boundary() {
        assert_eq!(coerce(&SqlType::Varchar(3), text("héllo")), text("hél"));
    }

    #[test]
    fn test_non_string_values_pass_through() {
        assert_eq!(coerce(&SqlType::Varchar(1), SqlValue::Int(12345)), SqlValue::Int(12345));
        assert_eq!(coerce(&SqlType::Float, SqlValue::Float(42.2)), SqlValue::Float(42.2));
        assert_eq!(coerce(&SqlType::Int, SqlValue::Null), SqlValue::Null);
    }
}
