//! Synthesis-time table and column models.
//!
//! A [`TableModel`] is built fresh from a [`ShapeDelta`] or a committed
//! [`Shape`] for every rendering call and never cached. Its columns are sorted
//! by physical name so that rendered statements do not depend on the order in
//! which properties were declared.

use std::collections::{BTreeMap, HashSet};

use crate::core::identifier::validate_identifier;
use crate::error::{Result, SyncError};
use crate::shape::model::{Shape, ShapeDelta, METADATA_COLUMNS};
use crate::typemap::{to_sql_type, LogicalType, SqlType};

/// A physical column of a managed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    /// Sanitized physical column name.
    pub name: String,
    /// Property name as declared by the publisher (data lookup key).
    pub property: String,
    pub sql_type: SqlType,
    pub is_key: bool,
}

/// A display-named column of the companion view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualColumn {
    /// Sanitized display name.
    pub name: String,
    /// Physical column it reads from.
    pub from_name: String,
}

/// How an ALTER statement treats the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyChange {
    /// Key set unchanged; no key clause.
    Keep,
    /// Drop the existing key and add the union key.
    Replace,
    /// The table had no key; only add one.
    Add,
}

fn is_metadata_column_name(column_name: &str) -> bool {
    METADATA_COLUMNS
        .iter()
        .any(|(col, _)| col.eq_ignore_ascii_case(column_name))
}

/// Table metadata used for statement rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    /// Sanitized table name.
    pub name: String,
    /// Sanitized companion view name.
    pub view_name: String,
    /// Columns sorted by physical name.
    pub columns: Vec<ColumnModel>,
    /// View columns, in physical column order.
    pub virtual_columns: Vec<VirtualColumn>,
    /// Sanitized key column names, in key order.
    pub keys: Vec<String>,
}

impl TableModel {
    /// Build the model for a shape change.
    pub fn from_delta(delta: &ShapeDelta) -> Result<Self> {
        Self::build(
            &delta.entity_key,
            &delta.view_name,
            &delta.full_property_set,
            &delta.new_keys,
            &delta.friendly_name_map,
        )
    }

    /// Build the model for a committed shape (upsert rendering).
    pub fn from_shape(shape: &Shape) -> Result<Self> {
        Self::build(
            &shape.entity_key,
            "",
            &shape.property_types(),
            &shape.keys,
            &BTreeMap::new(),
        )
    }

    fn build(
        entity_key: &str,
        view_name: &str,
        properties: &BTreeMap<String, LogicalType>,
        keys: &[String],
        friendly_names: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let name = validate_identifier(entity_key)?;
        let view_name = if view_name.is_empty() {
            String::new()
        } else {
            validate_identifier(view_name)?
        };

        // Column names are case-insensitive in MySQL.
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(properties.len());
        for (property, logical_type) in properties {
            let column_name = validate_identifier(property)?;
            if is_metadata_column_name(&column_name) {
                return Err(SyncError::Config(format!(
                    "Property {:?} of {} uses the reserved column name {:?}",
                    property, entity_key, column_name
                )));
            }
            if !seen.insert(column_name.to_lowercase()) {
                return Err(SyncError::Config(format!(
                    "Properties of {} collide on column name {:?} after removing unsafe characters",
                    entity_key, column_name
                )));
            }
            let is_key = keys.iter().any(|k| k == property);
            columns.push(ColumnModel {
                name: column_name,
                property: property.clone(),
                sql_type: to_sql_type(*logical_type, is_key),
                is_key,
            });
        }

        // Make sure we have the columns in a known order, for consistency
        columns.sort_by(|a, b| a.name.cmp(&b.name));

        let mut view_seen: HashSet<String> = METADATA_COLUMNS
            .iter()
            .map(|(col, _)| col.to_lowercase())
            .collect();
        let mut virtual_columns = Vec::new();
        for column in &columns {
            if let Some(display) = friendly_names.get(&column.property) {
                let name = validate_identifier(display)?;
                if !view_seen.insert(name.to_lowercase()) {
                    return Err(SyncError::Config(format!(
                        "View {} of {} would have duplicate column {:?}",
                        view_name, entity_key, name
                    )));
                }
                virtual_columns.push(VirtualColumn {
                    name,
                    from_name: column.name.clone(),
                });
            }
        }

        let keys = keys
            .iter()
            .map(|k| validate_identifier(k))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            view_name,
            columns,
            virtual_columns,
            keys,
        })
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Columns updated on duplicate key.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &ColumnModel> {
        self.columns.iter().filter(|c| !c.is_key)
    }
}
