//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{Result, SyncError};

/// Settings keys that carry a connection URL.
const DSN_KEYS: [&str; 2] = ["DataSourceName", "data_source_name"];

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode the loose settings map sent with an init request.
    ///
    /// Accepts either a `DataSourceName` connection string or the discrete
    /// `target` fields (`host`, `port`, `database`, ...) at the top level.
    pub fn from_settings(settings: &JsonValue) -> Result<Self> {
        let map = settings
            .as_object()
            .ok_or_else(|| SyncError::Config("couldn't decode settings: expected an object".into()))?;

        let dsn = DSN_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty());

        let config = match dsn {
            Some(dsn) => Config {
                target: TargetConfig {
                    data_source_name: Some(normalize_dsn(dsn)),
                    ..Default::default()
                },
                subscriber: SubscriberConfig::default(),
            },
            None => {
                let target: TargetConfig = serde_json::from_value(settings.clone())
                    .map_err(|e| SyncError::Config(format!("couldn't decode settings: {}", e)))?;
                Config {
                    target,
                    subscriber: SubscriberConfig::default(),
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TargetConfig {
    /// Connection description safe for logs (no credentials).
    pub fn describe(&self) -> String {
        match &self.data_source_name {
            Some(dsn) => match dsn.rsplit_once('@') {
                Some((_, location)) => location.to_string(),
                None => dsn.clone(),
            },
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Rewrite a driver-style `user:pass@tcp(host:port)/db?opts` string into a
/// `mysql://` URL. URLs pass through unchanged.
fn normalize_dsn(dsn: &str) -> String {
    if dsn.contains("://") {
        return dsn.to_string();
    }

    let (credentials, rest) = match dsn.rsplit_once('@') {
        Some((creds, rest)) => (Some(creds), rest),
        None => (None, dsn),
    };

    let rest = match rest.find('(') {
        Some(open) => match rest[open..].find(')') {
            Some(close) => format!("{}{}", &rest[open + 1..open + close], &rest[open + close + 1..]),
            None => rest.to_string(),
        },
        None => rest.to_string(),
    };

    match credentials {
        Some(creds) => format!("mysql://{}@{}", creds, rest),
        None => format!("mysql://{}", rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml(
            r#"
target:
  host: localhost
  database: shapes
  user: root
  password: secret
"#,
        )
        .unwrap();

        assert_eq!(config.target.port, 3306);
        assert_eq!(config.target.ssl_mode, "prefer");
        assert!(config.subscriber.disable_unique_checks);
        assert!(config.subscriber.disable_foreign_key_checks);
        assert_eq!(config.subscriber.max_connections, 4);
        assert_eq!(config.subscriber.statement_timeout_secs, 30);
    }

    #[test]
    fn test_from_yaml_rejects_missing_host() {
        let err = Config::from_yaml("target:\n  database: shapes\n  user: root\n").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_from_settings_with_driver_dsn() {
        let config = Config::from_settings(&json!({
            "DataSourceName": "root:pw@tcp(db.local:3307)/shapes?parseTime=true"
        }))
        .unwrap();

        assert_eq!(
            config.target.data_source_name.as_deref(),
            Some("mysql://root:pw@db.local:3307/shapes?parseTime=true")
        );
        assert_eq!(config.target.describe(), "db.local:3307/shapes?parseTime=true");
    }

    #[test]
    fn test_from_settings_with_fields() {
        let config = Config::from_settings(&json!({
            "host": "db.local",
            "database": "shapes",
            "user": "root",
            "password": "pw"
        }))
        .unwrap();
        assert_eq!(config.target.host, "db.local");
        assert_eq!(config.target.port, 3306);
        assert!(config.target.data_source_name.is_none());
    }

    #[test]
    fn test_from_settings_without_connection_info() {
        assert!(Config::from_settings(&json!({})).is_err());
        assert!(Config::from_settings(&json!({"DataSourceName": ""})).is_err());
        assert!(Config::from_settings(&json!("nope")).is_err());
    }

    #[test]
    fn test_normalize_dsn() {
        assert_eq!(normalize_dsn("mysql://a@b/c"), "mysql://a@b/c");
        assert_eq!(normalize_dsn("u@tcp(h)/d"), "mysql://u@h/d");
        assert_eq!(normalize_dsn("h:3306/d"), "mysql://h:3306/d");
    }
}
