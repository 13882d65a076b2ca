//! Configuration validation.

use super::Config;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Target validation; a connection URL replaces the discrete fields
    if config.target.data_source_name.is_none() {
        if config.target.host.is_empty() {
            return Err(SyncError::Config("target.host is required".into()));
        }
        if config.target.database.is_empty() {
            return Err(SyncError::Config("target.database is required".into()));
        }
        if config.target.user.is_empty() {
            return Err(SyncError::Config("target.user is required".into()));
        }
    } else if config
        .target
        .data_source_name
        .as_deref()
        .is_some_and(|dsn| !dsn.starts_with("mysql://"))
    {
        return Err(SyncError::Config(
            "target.data_source_name must be a mysql:// URL".into(),
        ));
    }

    if config.subscriber.max_connections == 0 {
        return Err(SyncError::Config(
            "subscriber.max_connections must be at least 1".into(),
        ));
    }
    if config.subscriber.statement_timeout_secs == 0 {
        return Err(SyncError::Config(
            "subscriber.statement_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}
