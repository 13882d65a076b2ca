//! Registry of committed shapes.
//!
//! Reads are lock-free with respect to migrations: a reader clones the
//! `Arc<KnownShape>` out of the map and never holds the map lock across an
//! await point. Migrations of one entity are serialized through a per-entity
//! async mutex while other entities proceed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::core::traits::Dialect;
use crate::error::Result;
use crate::shape::analyzer;
use crate::shape::datapoint::DataPoint;
use crate::shape::model::{KnownShape, Shape, ShapeDelta};

/// Thread-safe map from entity key to its last committed shape.
pub struct ShapeRegistry {
    dialect: Arc<dyn Dialect>,
    shapes: RwLock<HashMap<String, Arc<KnownShape>>>,
    migration_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ShapeRegistry {
    /// Create an empty registry rendering with the given dialect.
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            shapes: RwLock::new(HashMap::new()),
            migration_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The dialect used for rendering.
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Replace the registry contents with shapes read from the live schema.
    ///
    /// Shapes whose names cannot be rendered are skipped with a warning.
    pub fn load(&self, shapes: Vec<Shape>) {
        let mut loaded = HashMap::with_capacity(shapes.len());
        for shape in shapes {
            match self.dialect.build_render_cache(&shape) {
                Ok(render) => {
                    loaded.insert(
                        shape.entity_key.clone(),
                        Arc::new(KnownShape { shape, render }),
                    );
                }
                Err(e) => warn!("Skipping existing table {}: {}", shape.entity_key, e),
            }
        }
        debug!("Shape registry loaded with {} shapes", loaded.len());
        *self.shapes.write().unwrap_or_else(PoisonError::into_inner) = loaded;
    }

    /// Get the committed shape for an entity key.
    pub fn lookup(&self, entity_key: &str) -> Option<Arc<KnownShape>> {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_key)
            .cloned()
    }

    /// Get the committed shape for a data point's entity, if it already
    /// covers everything the data point declares.
    pub fn lookup_compatible(&self, dp: &DataPoint) -> Option<Arc<KnownShape>> {
        self.lookup(&dp.entity_key()).filter(|known| known.covers(dp))
    }

    /// Compute the delta between a data point's shape and the committed one.
    pub fn analyze(&self, dp: &DataPoint) -> ShapeDelta {
        let known = self.lookup(&dp.entity_key());
        analyzer::analyze(dp, known.as_ref().map(|k| &k.shape))
    }

    /// Commit the shape produced by a successfully applied delta.
    ///
    /// Must only be called after every DDL statement for the delta succeeded.
    pub fn apply_delta(&self, delta: &ShapeDelta) -> Result<Arc<KnownShape>> {
        let shape = delta.to_shape();
        let render = self.dialect.build_render_cache(&shape)?;
        let known = Arc::new(KnownShape { shape, render });

        self.shapes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(delta.entity_key.clone(), Arc::clone(&known));

        Ok(known)
    }

    /// All committed shapes, ordered by entity key.
    pub fn list_all_shapes(&self) -> Vec<Shape> {
        let mut shapes: Vec<Shape> = self
            .shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|k| k.shape.clone())
            .collect();
        shapes.sort_by(|a, b| a.entity_key.cmp(&b.entity_key));
        shapes
    }

    /// Number of committed shapes.
    pub fn len(&self) -> usize {
        self.shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The async mutex serializing migrations of one entity.
    pub fn migration_lock(&self, entity_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .migration_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(entity_key.to_string()).or_default())
    }
}
