//! Core traits for the shape synchronization engine.
//!
//! - [`Dialect`]: SQL syntax strategy for DDL and upsert rendering
//! - [`TargetStore`]: executes rendered statements against the target database
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable statement rendering
//! - **Template Method**: `Dialect::build_shape_change` and
//!   `Dialect::build_render_cache` define the rendering skeleton on top of the
//!   per-statement builders

use async_trait::async_trait;

use crate::error::Result;
use crate::shape::model::{RenderCache, Shape, ShapeDelta};

use super::schema::{PrimaryKeyChange, TableModel};
use super::value::SqlValue;

/// SQL syntax strategy for a target database engine.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql").
    fn name(&self) -> &str;

    /// Sanitize and quote an identifier (table name, column name, etc.).
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    fn param_placeholder(&self, index: usize) -> String;

    /// Render the CREATE TABLE statement for a new shape.
    fn build_create_table(&self, model: &TableModel) -> String;

    /// Render the companion CREATE VIEW statement for a new shape.
    fn build_create_view(&self, model: &TableModel) -> String;

    /// Render the ALTER TABLE statement for an evolved shape.
    ///
    /// Returns `None` when there is nothing to alter.
    fn build_alter_table(&self, model: &TableModel, pk_change: PrimaryKeyChange) -> Option<String>;

    /// Render the upsert statement and its parameter plan.
    fn build_upsert(&self, model: &TableModel) -> RenderCache;

    /// Render every DDL statement needed to apply a delta, in execution order.
    fn build_shape_change(&self, delta: &ShapeDelta) -> Result<Vec<String>> {
        let model = TableModel::from_delta(delta)?;

        if delta.is_new {
            return Ok(vec![
                self.build_create_table(&model),
                self.build_create_view(&model),
            ]);
        }

        let pk_change = if !delta.has_key_changes {
            PrimaryKeyChange::Keep
        } else if delta
            .previous_shape
            .as_ref()
            .is_some_and(|prev| !prev.keys.is_empty())
        {
            PrimaryKeyChange::Replace
        } else {
            PrimaryKeyChange::Add
        };

        Ok(self.build_alter_table(&model, pk_change).into_iter().collect())
    }

    /// Render the upsert cache for a committed shape.
    fn build_render_cache(&self, shape: &Shape) -> Result<RenderCache> {
        let model = TableModel::from_shape(shape)?;
        Ok(self.build_upsert(&model))
    }
}

/// Execute statements against the target database.
///
/// Implementations must be `Send + Sync`: a single store is shared by every
/// concurrently handled data point.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Server version string, used to report a successful connection.
    async fn server_version(&self) -> Result<String>;

    /// Execute a statement without parameters (DDL).
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Execute a parameterized statement, returning the affected row count.
    async fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Read the shapes of the tables that already exist in the target.
    async fn load_shapes(&self) -> Result<Vec<Shape>>;

    /// Get the database type identifier (e.g., "mysql").
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}
