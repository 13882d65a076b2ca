//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB dialect and store
//!
//! Each driver module implements:
//! - `Dialect`: SQL rendering strategy for the database engine
//! - `TargetStore`: statement execution and schema discovery

pub mod mysql;

pub use mysql::{MysqlDialect, MysqlStore};
