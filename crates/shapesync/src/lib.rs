//! # shapesync
//!
//! Keeps a MySQL/MariaDB schema in sync with the shapes of incoming records.
//!
//! Every data point carries its own shape: typed properties and a key set.
//! The subscriber creates a table (and a display-named view) the first time an
//! entity is seen, widens it with `ALTER TABLE` when later records add
//! properties or keys, and writes each record with
//! `INSERT ... ON DUPLICATE KEY UPDATE`. Columns are never dropped or retyped.
//!
//! ## Example
//!
//! ```rust,no_run
//! use shapesync::{Config, DataPoint, Subscriber};
//!
//! #[tokio::main]
//! async fn main() -> shapesync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let subscriber = Subscriber::new();
//!     subscriber.init(&config).await?;
//!
//!     let dp = DataPoint::from_json(r#"{"entity": "items", "action": "START_PUBLISH",
//!         "shape": {"keyNames": ["id"], "properties": ["id:integer"]}}"#)?;
//!     subscriber.receive_data_point(&dp).await?;
//!     subscriber.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod shape;
pub mod subscriber;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, SubscriberConfig, TargetConfig};
pub use error::{Result, SyncError};
pub use shape::{Action, DataPoint, Shape, ShapeRegistry};
pub use subscriber::{DryRunStore, Subscriber};
