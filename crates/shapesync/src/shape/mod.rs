//! Shapes: the implicit schemas carried by data points.
//!
//! - [`datapoint`]: inbound records and the shape they declare
//! - [`model`]: committed shapes, deltas and the cached upsert plan
//! - [`analyzer`]: delta computation between a record and the committed shape
//! - [`registry`]: concurrent map of committed shapes

pub mod analyzer;
pub mod datapoint;
pub mod model;
pub mod registry;

pub use analyzer::analyze;
pub use datapoint::{Action, DataPoint, DeclaredShape};
pub use model::{KnownShape, ParamSpec, Property, RenderCache, Shape, ShapeDelta};
pub use registry::ShapeRegistry;
