//! Error types for the subscriber library.

use thiserror::Error;

use crate::core::value::SqlValue;

/// Main error type for shape synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing connection fields, unusable identifiers)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Target database driver error
    #[error("Target database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// Connection or pool error with context
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// DDL execution failed; the shape was not committed
    #[error("Migration failed: {message}\n  Statement: {statement}")]
    Migration { statement: String, message: String },

    /// Upsert execution failed; the committed shape is unaffected
    #[error("Upsert failed: {message}\n  Statement: {statement}\n  Parameters: {params:?}")]
    Upsert {
        statement: String,
        params: Vec<SqlValue>,
        message: String,
    },

    /// A record arrived for an unknown or drifted shape outside a start-of-batch record
    #[error("Data point shape for {0} was incompatible with the shape defined in the start-publish data point for this batch")]
    IncompatibleShape(String),

    /// Data points were received before a connection was established
    #[error("You must call init before sending data points")]
    NotInitialized,

    /// A store call exceeded the configured statement timeout
    #[error("Timed out after {seconds}s while {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Processing was cancelled (SIGINT, etc.)
    #[error("Processing cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Migration error carrying the offending statement
    pub fn migration(statement: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Migration {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Create an Upsert error carrying the statement and its bound parameters
    pub fn upsert(statement: impl Into<String>, params: Vec<SqlValue>, message: impl ToString) -> Self {
        SyncError::Upsert {
            statement: statement.into(),
            params,
            message: message.to_string(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) => 2,
            SyncError::Connection { .. } | SyncError::Database(_) | SyncError::Timeout { .. } => 3,
            SyncError::Migration { .. } => 4,
            SyncError::Upsert { .. } => 5,
            SyncError::IncompatibleShape(_) | SyncError::NotInitialized => 6,
            SyncError::Cancelled => 130,
            SyncError::Io(_) | SyncError::Json(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for shape synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
