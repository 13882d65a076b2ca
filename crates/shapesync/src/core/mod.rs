//! Core abstractions for shape synchronization.
//!
//! - [`identifier`]: identifier sanitizing and quoting
//! - [`value`]: bound parameter values
//! - [`coerce`]: value coercion to column types
//! - [`schema`]: table models used for statement rendering
//! - [`traits`]: the `Dialect` and `TargetStore` seams
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable statement rendering
//! - **Template Method**: default trait methods define the rendering skeleton

pub mod coerce;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use schema::{ColumnModel, PrimaryKeyChange, TableModel, VirtualColumn};
pub use traits::{Dialect, TargetStore};
pub use value::SqlValue;
