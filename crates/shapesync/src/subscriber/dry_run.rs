//! A store that records statements instead of executing them.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::core::traits::TargetStore;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::shape::model::Shape;

/// A statement captured by [`DryRunStore`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedStatement {
    pub sql: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<SqlValue>,
}

/// Offline target: every statement succeeds and is kept for inspection.
#[derive(Debug, Default)]
pub struct DryRunStore {
    existing: Vec<Shape>,
    statements: Mutex<Vec<RecordedStatement>>,
}

impl DryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend these tables already exist in the target.
    pub fn with_shapes(shapes: Vec<Shape>) -> Self {
        Self {
            existing: shapes,
            statements: Mutex::new(Vec::new()),
        }
    }

    /// Drain the statements recorded so far.
    pub fn take(&self) -> Vec<RecordedStatement> {
        std::mem::take(&mut *self.statements.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, sql: &str, params: &[SqlValue]) {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedStatement {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
    }
}

#[async_trait]
impl TargetStore for DryRunStore {
    async fn server_version(&self) -> Result<String> {
        Ok("dry-run".to_string())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.record(sql, &[]);
        Ok(())
    }

    async fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.record(sql, params);
        Ok(1)
    }

    async fn load_shapes(&self) -> Result<Vec<Shape>> {
        Ok(self.existing.clone())
    }

    fn db_type(&self) -> &str {
        "dry-run"
    }

    async fn close(&self) {}
}
