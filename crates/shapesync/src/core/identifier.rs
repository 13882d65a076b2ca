//! Identifier sanitizing and quoting for SQL injection prevention.
//!
//! # Security
//!
//! SQL identifiers (table names, column names, view names) cannot be passed as
//! parameters in prepared statements - only data values can be parameterized.
//! Entity and property names come straight from the record stream, so every
//! identifier that reaches statement text is first reduced to a safe character
//! set by [`sanitize`] and then wrapped in backticks by [`quote`].

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SyncError};

/// Maximum identifier length (MySQL allows 64 for tables, we stay lenient
/// and let the server reject what it cannot store).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Everything outside `[A-Za-z0-9_\-. ]`, backticks included.
static SQL_CLEANER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-. ]|`").expect("static regex is valid"));

/// Strip every character that is not safe inside a quoted MySQL identifier.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
///
/// # Examples
///
/// ```
/// use shapesync::core::identifier::sanitize;
///
/// assert_eq!(sanitize("`DROP Database"), "DROP Database");
/// assert_eq!(sanitize("x.y"), "x.y");
/// ```
pub fn sanitize(name: &str) -> String {
    SQL_CLEANER.replace_all(name, "").into_owned()
}

/// Sanitize and wrap in backticks.
pub fn quote(name: &str) -> String {
    format!("`{}`", sanitize(name))
}

/// Sanitize an identifier that must name a database object.
///
/// Rejects identifiers that are empty after sanitizing or exceed the maximum
/// length.
///
/// # Errors
///
/// Returns `SyncError::Config` with the original name in the message.
pub fn validate_identifier(name: &str) -> Result<String> {
    let clean = sanitize(name);

    if clean.trim().is_empty() {
        return Err(SyncError::Config(format!(
            "Identifier {:?} is empty after removing unsafe characters",
            name
        )));
    }

    if clean.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SyncError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            clean.len(),
            name
        )));
    }

    Ok(clean)
}
