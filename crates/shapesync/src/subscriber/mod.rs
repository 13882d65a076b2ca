//! Subscriber lifecycle and record handling.
//!
//! A [`Subscriber`] owns the connection to the target store and the shape
//! registry. For every data point it migrates the target table when the
//! record introduces a new or drifted shape, then upserts the record.
//!
//! The flow for one record:
//!
//! 1. Look up a committed shape that covers what the record declares.
//! 2. If there is none, only a start-of-batch record may continue. It takes
//!    the entity's migration lock, looks again, and otherwise renders and
//!    executes the DDL for the delta and commits the new shape.
//! 3. Upsert records are bound against the committed render cache and
//!    executed.

mod dry_run;

pub use dry_run::{DryRunStore, RecordedStatement};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::core::traits::{Dialect, TargetStore};
use crate::drivers::mysql::{MysqlDialect, MysqlStore};
use crate::error::{Result, SyncError};
use crate::shape::datapoint::{Action, DataPoint};
use crate::shape::model::{KnownShape, Shape};
use crate::shape::registry::ShapeRegistry;

/// Outcome of a lifecycle call (init, dispose, test connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleResponse {
    pub success: bool,
    pub message: String,
}

impl LifecycleResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Shapes known to the subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverShapesResponse {
    pub shapes: Vec<Shape>,
}

/// What handling a data point did to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveResponse {
    pub entity_key: String,
    /// DDL statements executed for this record.
    pub migration_statements: usize,
    /// Rows reported by the upsert; `None` when the record was not upserted.
    pub rows_affected: Option<u64>,
}

struct Connection {
    store: Arc<dyn TargetStore>,
    info: String,
}

/// Keeps a MySQL/MariaDB schema in step with incoming data points.
pub struct Subscriber {
    connection: RwLock<Option<Connection>>,
    registry: ShapeRegistry,
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber {
    /// Create an uninitialized subscriber rendering MySQL statements.
    pub fn new() -> Self {
        Self::with_dialect(Arc::new(MysqlDialect::new()))
    }

    pub fn with_dialect(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            connection: RwLock::new(None),
            registry: ShapeRegistry::new(dialect),
        }
    }

    /// The shape registry.
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Connect to the configured target and load the shapes of its tables.
    ///
    /// Calling init on an initialized subscriber keeps the existing connection.
    pub async fn init(&self, config: &Config) -> Result<LifecycleResponse> {
        // Held across the connect so concurrent calls open a single pool.
        let mut connection = self.connection.write().await;
        if let Some(conn) = connection.as_ref() {
            return Ok(LifecycleResponse::ok(conn.info.clone()));
        }

        config.validate()?;
        let store = MysqlStore::new(&config.target, &config.subscriber).await?;
        self.connect(&mut connection, Arc::new(store)).await
    }

    /// Initialize against an already constructed store.
    ///
    /// If the subscriber is already initialized the given store is closed and
    /// the existing connection kept.
    pub async fn attach(&self, store: Arc<dyn TargetStore>) -> Result<LifecycleResponse> {
        let mut connection = self.connection.write().await;
        if let Some(conn) = connection.as_ref() {
            store.close().await;
            return Ok(LifecycleResponse::ok(conn.info.clone()));
        }
        self.connect(&mut connection, store).await
    }

    async fn connect(
        &self,
        connection: &mut Option<Connection>,
        store: Arc<dyn TargetStore>,
    ) -> Result<LifecycleResponse> {
        let version = match store.server_version().await {
            Ok(version) if !version.is_empty() => version,
            Ok(_) => {
                store.close().await;
                return Err(SyncError::connection(
                    "couldn't get data from database server",
                    "reading server version",
                ));
            }
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };

        let shapes = match store.load_shapes().await {
            Ok(shapes) => shapes,
            Err(e) => {
                store.close().await;
                return Err(e);
            }
        };
        self.registry.load(shapes);

        let info = format!("Connected to: {}", version);
        info!(
            "{} ({} store, {} existing shapes)",
            info,
            store.db_type(),
            self.registry.len()
        );

        *connection = Some(Connection {
            store,
            info: info.clone(),
        });
        Ok(LifecycleResponse::ok(info))
    }

    /// Close the connection. Safe to call when not initialized.
    pub async fn dispose(&self) -> LifecycleResponse {
        match self.connection.write().await.take() {
            None => LifecycleResponse::ok("Not initialized."),
            Some(conn) => {
                conn.store.close().await;
                info!("Closed connection to target");
                LifecycleResponse::ok("Closed connection.")
            }
        }
    }

    /// Check that a configuration can connect, without initializing.
    pub async fn test_connection(config: &Config) -> Result<LifecycleResponse> {
        config.validate()?;
        let store = MysqlStore::new(&config.target, &config.subscriber).await?;
        let version = store.server_version().await;
        store.close().await;
        Ok(LifecycleResponse::ok(format!("Connected to: {}", version?)))
    }

    /// All shapes the subscriber currently knows.
    pub async fn discover_shapes(&self) -> Result<DiscoverShapesResponse> {
        self.store().await?;
        Ok(DiscoverShapesResponse {
            shapes: self.registry.list_all_shapes(),
        })
    }

    /// Migrate the target for a data point if needed, then upsert it.
    pub async fn receive_data_point(&self, dp: &DataPoint) -> Result<ReceiveResponse> {
        let store = self.store().await?;
        let entity_key = dp.entity_key();
        debug!("Received data point for {} ({:?})", entity_key, dp.action);

        let mut migration_statements = 0;
        let known = match self.registry.lookup_compatible(dp) {
            Some(known) => known,
            None => {
                if dp.action != Action::StartPublish {
                    return Err(SyncError::IncompatibleShape(entity_key));
                }

                let lock = self.registry.migration_lock(&entity_key);
                let _guard = lock.lock().await;

                // Another record may have migrated while we waited.
                match self.registry.lookup_compatible(dp) {
                    Some(known) => known,
                    None => {
                        let (known, executed) = self.migrate(store.as_ref(), dp).await?;
                        migration_statements = executed;
                        known
                    }
                }
            }
        };

        let rows_affected = if dp.action == Action::Upsert {
            let params = known.bind(dp);
            let sql = &known.render.upsert_sql;
            match store.execute_with_params(sql, &params).await {
                Ok(rows) => Some(rows),
                Err(e) => return Err(SyncError::upsert(sql.clone(), params, e)),
            }
        } else {
            None
        };

        Ok(ReceiveResponse {
            entity_key,
            migration_statements,
            rows_affected,
        })
    }

    /// Render and execute the DDL for a data point, then commit its shape.
    ///
    /// The companion view is only created with a new shape. Display names
    /// declared later are merged into the committed shape but do not alter the
    /// view, and a record that only adds display names needs no migration.
    ///
    /// Must be called with the entity's migration lock held.
    async fn migrate(
        &self,
        store: &dyn TargetStore,
        dp: &DataPoint,
    ) -> Result<(Arc<KnownShape>, usize)> {
        let delta = self.registry.analyze(dp);
        let statements = self.registry.dialect().build_shape_change(&delta)?;

        for statement in &statements {
            debug!("Executing DDL for {}:\n{}", delta.entity_key, statement);
            store
                .execute(statement)
                .await
                .map_err(|e| SyncError::migration(statement.clone(), e))?;
        }

        let known = self.registry.apply_delta(&delta)?;
        info!(
            "{} shape {} ({} properties, keys {:?})",
            if delta.is_new { "Created" } else { "Migrated" },
            delta.entity_key,
            known.shape.properties.len(),
            known.shape.keys
        );
        Ok((known, statements.len()))
    }

    async fn store(&self) -> Result<Arc<dyn TargetStore>> {
        self.connection
            .read()
            .await
            .as_ref()
            .map(|conn| Arc::clone(&conn.store))
            .ok_or(SyncError::NotInitialized)
    }
}
