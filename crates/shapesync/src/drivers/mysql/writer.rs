//! MySQL/MariaDB target store implementation.
//!
//! Implements the `TargetStore` trait on top of a mysql_async connection pool.
//! Every call checks a connection out of the pool, so DDL and upserts for
//! different entities run on independent connections.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, Row, SslOpts};
use tracing::{debug, info, warn};

use crate::config::{SubscriberConfig, TargetConfig};
use crate::core::traits::TargetStore;
use crate::core::value::SqlValue;
use crate::error::{Result, SyncError};
use crate::shape::model::{is_metadata_column, Property, Shape};
use crate::typemap::from_sql_type;

/// MySQL target store implementation using mysql_async.
pub struct MysqlStore {
    pool: Pool,
    timeout: Duration,
}

impl MysqlStore {
    /// Create a new MySQL store from configuration and verify the connection.
    pub async fn new(target: &TargetConfig, settings: &SubscriberConfig) -> Result<Self> {
        let mut builder = match &target.data_source_name {
            Some(dsn) => {
                let opts = Opts::from_url(dsn).map_err(|e| {
                    SyncError::Config(format!("Invalid data_source_name: {}", e))
                })?;
                OptsBuilder::from_opts(opts)
            }
            None => {
                let builder = OptsBuilder::default()
                    .ip_or_hostname(&target.host)
                    .tcp_port(target.port)
                    .db_name(Some(&target.database))
                    .user(Some(&target.user))
                    .pass(Some(&target.password));
                match ssl_opts(&target.ssl_mode) {
                    Some(ssl) => builder.ssl_opts(ssl),
                    None => builder,
                }
            }
        };

        builder = builder.init(session_init(settings));

        let constraints = PoolConstraints::new(1, settings.max_connections).ok_or_else(|| {
            SyncError::Config(format!(
                "Invalid max_connections: {}",
                settings.max_connections
            ))
        })?;
        let pool_opts = PoolOpts::new().with_constraints(constraints);

        let opts: Opts = builder.pool_opts(pool_opts).into();
        let pool = Pool::new(opts);

        let store = Self {
            pool,
            timeout: Duration::from_secs(settings.statement_timeout_secs),
        };

        // Test connection
        store
            .timed("connecting to MySQL target", async {
                let mut conn = store.pool.get_conn().await?;
                conn.query_drop("SELECT 1").await?;
                Ok(())
            })
            .await
            .map_err(|e| SyncError::connection(e, "creating MySQL target pool"))?;

        info!("Connected to MySQL target: {}", target.describe());

        Ok(store)
    }

    async fn conn(&self) -> Result<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| SyncError::connection(e, "getting MySQL connection"))
    }

    /// Run a store call under the statement timeout.
    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    async fn describe_table(&self, conn: &mut Conn, table: &str) -> Result<Shape> {
        let sql = format!("DESCRIBE {}", crate::core::identifier::quote(table));
        let rows: Vec<Row> = conn.query(sql).await?;
        let columns = rows
            .into_iter()
            .map(|row| DescribedColumn {
                field: text_at(&row, 0),
                sql_type: text_at(&row, 1),
                key: text_at(&row, 3),
            })
            .collect::<Vec<_>>();
        Ok(shape_from_columns(table, &columns))
    }
}

/// Read a nullable text cell; NULL and unconvertible values read as "".
fn text_at(row: &Row, index: usize) -> String {
    row.get_opt::<Option<String>, _>(index)
        .and_then(|r| r.ok())
        .flatten()
        .unwrap_or_default()
}

/// Map the configured ssl_mode onto mysql_async TLS options.
fn ssl_opts(mode: &str) -> Option<SslOpts> {
    match mode.to_lowercase().as_str() {
        "disable" => {
            warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
            None
        }
        "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
        "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => Some(SslOpts::default()),
        _ => {
            warn!("Unknown ssl_mode '{}', defaulting to Preferred", mode);
            Some(SslOpts::default().with_danger_accept_invalid_certs(true))
        }
    }
}

/// Statements run on every new pooled connection.
fn session_init(settings: &SubscriberConfig) -> Vec<String> {
    // Use utf8mb4 for full Unicode support
    let mut init = vec!["SET NAMES utf8mb4".to_string()];
    if settings.disable_unique_checks {
        init.push("SET @@session.unique_checks = 0".to_string());
    }
    if settings.disable_foreign_key_checks {
        init.push("SET @@session.foreign_key_checks = 0".to_string());
    }
    init
}

/// One row of `DESCRIBE <table>`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DescribedColumn {
    field: String,
    sql_type: String,
    key: String,
}

/// Rebuild a committed shape from a table description.
fn shape_from_columns(table: &str, columns: &[DescribedColumn]) -> Shape {
    let mut keys = Vec::new();
    let mut properties = BTreeMap::new();

    for col in columns.iter().filter(|c| !is_metadata_column(&c.field)) {
        if col.key.eq_ignore_ascii_case("PRI") {
            keys.push(col.field.clone());
        }
        properties.insert(
            col.field.clone(),
            Property::new(col.field.clone(), from_sql_type(&col.sql_type)),
        );
    }

    Shape {
        entity_key: table.to_string(),
        keys,
        properties,
        friendly_names: BTreeMap::new(),
    }
}

#[async_trait]
impl TargetStore for MysqlStore {
    async fn server_version(&self) -> Result<String> {
        self.timed("reading server version", async {
            let mut conn = self.conn().await?;
            let version: Option<String> = conn.query_first("SELECT VERSION()").await?;
            Ok(version.unwrap_or_default())
        })
        .await
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("MySQL: executing\n{}", sql);
        self.timed("executing statement", async {
            let mut conn = self.conn().await?;
            conn.query_drop(sql).await?;
            Ok(())
        })
        .await
    }

    async fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let values: Vec<mysql_async::Value> = params.iter().map(sql_value_to_mysql).collect();
        self.timed("executing upsert", async {
            let mut conn = self.conn().await?;
            conn.exec_drop(sql, values).await?;
            Ok(conn.affected_rows())
        })
        .await
    }

    async fn load_shapes(&self) -> Result<Vec<Shape>> {
        self.timed("loading existing shapes", async {
            let mut conn = self.conn().await?;
            let tables: Vec<(String, String)> = conn.query("SHOW FULL TABLES").await?;

            let mut shapes = Vec::new();
            for (table, table_type) in tables {
                if !table_type.eq_ignore_ascii_case("BASE TABLE") {
                    continue;
                }
                let shape = self.describe_table(&mut conn, &table).await?;
                debug!(
                    "Loaded shape {} ({} properties, keys {:?})",
                    shape.entity_key,
                    shape.properties.len(),
                    shape.keys
                );
                shapes.push(shape);
            }
            Ok(shapes)
        })
        .await
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Bool(b) => mysql_async::Value::from(*b),
        SqlValue::Int(i) => mysql_async::Value::from(*i),
        SqlValue::UInt(u) => mysql_async::Value::from(*u),
        SqlValue::Float(f) => mysql_async::Value::from(*f),
        SqlValue::Text(s) => mysql_async::Value::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typemap::LogicalType;

    fn col(field: &str, sql_type: &str, key: &str) -> DescribedColumn {
        DescribedColumn {
            field: field.into(),
            sql_type: sql_type.into(),
            key: key.into(),
        }
    }

    #[test]
    fn test_shape_from_columns() {
        let shape = shape_from_columns(
            "Test.Products",
            &[
                col("ID", "int(10)", "PRI"),
                col("Name", "varchar(1000)", ""),
                col("NextDateAvailable", "datetime", ""),
                col("Price", "float", ""),
                col("Active", "bit(1)", ""),
                col("publisher", "varchar(1000)", ""),
                col("publishedAt", "datetime", ""),
                col("createdAt", "datetime", ""),
                col("shapeVersion", "varchar(50)", ""),
            ],
        );

        assert_eq!(shape.entity_key, "Test.Products");
        assert_eq!(shape.keys, vec!["ID"]);
        assert_eq!(shape.properties.len(), 5);
        assert_eq!(shape.properties["ID"].logical_type, LogicalType::Integer);
        assert_eq!(shape.properties["Name"].logical_type, LogicalType::String);
        assert_eq!(
            shape.properties["NextDateAvailable"].logical_type,
            LogicalType::Date
        );
        assert_eq!(shape.properties["Active"].logical_type, LogicalType::Bool);
        assert!(!shape.properties.contains_key("createdAt"));
    }

    #[test]
    fn test_composite_key_keeps_column_order() {
        let shape = shape_from_columns(
            "t",
            &[col("a", "int(10)", "PRI"), col("b", "varchar(255)", "PRI")],
        );
        assert_eq!(shape.keys, vec!["a", "b"]);
    }

    #[test]
    fn test_session_init() {
        let settings = SubscriberConfig::default();
        assert_eq!(
            session_init(&settings),
            vec![
                "SET NAMES utf8mb4",
                "SET @@session.unique_checks = 0",
                "SET @@session.foreign_key_checks = 0",
            ]
        );

        let settings = SubscriberConfig {
            disable_unique_checks: false,
            disable_foreign_key_checks: false,
            ..Default::default()
        };
        assert_eq!(session_init(&settings), vec!["SET NAMES utf8mb4"]);
    }

    #[test]
    fn test_ssl_opts() {
        assert!(ssl_opts("disable").is_none());
        assert!(ssl_opts("prefer").is_some());
        assert!(ssl_opts("VERIFY_IDENTITY").is_some());
    }

    #[test]
    fn test_sql_value_to_mysql() {
        assert_eq!(sql_value_to_mysql(&SqlValue::Null), mysql_async::Value::NULL);
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Int(-4)),
            mysql_async::Value::Int(-4)
        );
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Text("abc".into())),
            mysql_async::Value::Bytes(b"abc".to_vec())
        );
    }
}
