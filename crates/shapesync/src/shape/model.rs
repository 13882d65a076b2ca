//! Shape, known-shape and delta types.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::coerce::coerce;
use crate::core::value::SqlValue;
use crate::shape::datapoint::{DataPoint, DeclaredShape};
use crate::typemap::{LogicalType, SqlType};

/// Metadata column: who published the record.
pub const PUBLISHER: &str = "publisher";
/// Metadata column: when the record was published.
pub const PUBLISHED_AT: &str = "publishedAt";
/// Metadata column: row creation time, filled by the server.
pub const CREATED_AT: &str = "createdAt";
/// Metadata column: publisher-side shape version.
pub const SHAPE_VERSION: &str = "shapeVersion";

/// Default for missing `publisher` / `shapeVersion` meta values.
pub const UNKNOWN: &str = "UNKNOWN";

/// The four system columns appended to every managed table, with their DDL.
pub const METADATA_COLUMNS: [(&str, &str); 4] = [
    (PUBLISHER, "VARCHAR(1000) DEFAULT NULL"),
    (PUBLISHED_AT, "DATETIME DEFAULT NULL"),
    (CREATED_AT, "DATETIME DEFAULT CURRENT_TIMESTAMP"),
    (SHAPE_VERSION, "VARCHAR(50) DEFAULT NULL"),
];

/// True for the names of the system columns.
pub fn is_metadata_column(name: &str) -> bool {
    METADATA_COLUMNS.iter().any(|(col, _)| *col == name)
}

/// A named, typed property of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
}

impl Property {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// The schema implicitly carried by the records of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub entity_key: String,
    pub keys: Vec<String>,
    pub properties: BTreeMap<String, Property>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub friendly_names: BTreeMap<String, String>,
}

impl Shape {
    /// Check if a property is part of the key.
    pub fn is_key(&self, name: &str) -> bool {
        self.keys.iter().any(|k| k == name)
    }

    /// Property name to logical type.
    pub fn property_types(&self) -> BTreeMap<String, LogicalType> {
        self.properties
            .iter()
            .map(|(name, p)| (name.clone(), p.logical_type))
            .collect()
    }

    /// Check that every key and property a data point declares is already part
    /// of this shape.
    pub fn covers(&self, declared: &DeclaredShape) -> bool {
        declared.key_names.iter().all(|k| self.is_key(k))
            && declared
                .parsed_properties()
                .iter()
                .all(|(name, _)| self.properties.contains_key(name))
    }
}

/// One positional parameter of the cached upsert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Key to read from `data` (data columns) or `meta` (metadata columns).
    pub property: String,
    /// Physical column name as rendered in the statement.
    pub column: String,
    /// Column type the value is coerced to.
    pub sql_type: SqlType,
    pub is_metadata: bool,
}

/// Rendered upsert statement plus its parameter extraction plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCache {
    pub upsert_sql: String,
    pub params: Vec<ParamSpec>,
}

impl RenderCache {
    /// Extract and coerce the positional parameters for a data point.
    pub fn bind(&self, dp: &DataPoint) -> Vec<SqlValue> {
        self.params
            .iter()
            .map(|spec| {
                let raw = if spec.is_metadata {
                    SqlValue::Text(metadata_value(dp, &spec.property))
                } else {
                    dp.data
                        .get(&spec.property)
                        .map(SqlValue::from)
                        .unwrap_or(SqlValue::Null)
                };
                coerce(&spec.sql_type, raw)
            })
            .collect()
    }
}

fn metadata_value(dp: &DataPoint, key: &str) -> String {
    if let Some(v) = dp.meta.get(key) {
        return v.clone();
    }
    if key == PUBLISHED_AT {
        Utc::now().to_rfc3339()
    } else {
        UNKNOWN.to_string()
    }
}

/// The last committed shape of an entity and its memoized upsert rendering.
#[derive(Debug, Clone)]
pub struct KnownShape {
    pub shape: Shape,
    pub render: RenderCache,
}

impl KnownShape {
    pub fn entity_key(&self) -> &str {
        &self.shape.entity_key
    }

    /// Check that this shape can serve the given data point without migration.
    pub fn covers(&self, dp: &DataPoint) -> bool {
        self.shape.covers(&dp.shape)
    }

    /// Render the upsert parameters for a data point.
    pub fn bind(&self, dp: &DataPoint) -> Vec<SqlValue> {
        self.render.bind(dp)
    }
}

/// Difference between an incoming shape and the known one.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDelta {
    pub entity_key: String,
    pub view_name: String,
    pub is_new: bool,
    pub previous_shape: Option<Shape>,
    /// Complete current property set, not only additions.
    pub full_property_set: BTreeMap<String, LogicalType>,
    /// Union of previous and declared keys.
    pub new_keys: Vec<String>,
    pub has_key_changes: bool,
    /// Physical property name to display name.
    pub friendly_name_map: BTreeMap<String, String>,
}

impl ShapeDelta {
    /// The shape this delta commits to.
    pub fn to_shape(&self) -> Shape {
        let mut friendly_names = self
            .previous_shape
            .as_ref()
            .map(|s| s.friendly_names.clone())
            .unwrap_or_default();
        friendly_names.extend(self.friendly_name_map.clone());

        Shape {
            entity_key: self.entity_key.clone(),
            keys: self.new_keys.clone(),
            properties: self
                .full_property_set
                .iter()
                .map(|(name, ty)| (name.clone(), Property::new(name.clone(), *ty)))
                .collect(),
            friendly_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan() -> RenderCache {
        RenderCache {
            upsert_sql: String::new(),
            params: vec![
                ParamSpec {
                    property: "id".into(),
                    column: "id".into(),
                    sql_type: SqlType::Int,
                    is_metadata: false,
                },
                ParamSpec {
                    property: "name".into(),
                    column: "name".into(),
                    sql_type: SqlType::Varchar(3),
                    is_metadata: false,
                },
                ParamSpec {
                    property: PUBLISHER.into(),
                    column: PUBLISHER.into(),
                    sql_type: SqlType::Varchar(1000),
                    is_metadata: true,
                },
                ParamSpec {
                    property: PUBLISHED_AT.into(),
                    column: PUBLISHED_AT.into(),
                    sql_type: SqlType::DateTime,
                    is_metadata: true,
                },
                ParamSpec {
                    property: SHAPE_VERSION.into(),
                    column: SHAPE_VERSION.into(),
                    sql_type: SqlType::Varchar(50),
                    is_metadata: true,
                },
            ],
        }
    }

    #[test]
    fn test_bind_defaults_metadata() {
        let mut dp = DataPoint::default();
        dp.data.insert("id".into(), json!(7));
        dp.data.insert("name".into(), json!("abcdef"));

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let params = plan().bind(&dp);
        assert_eq!(params.len(), 5);
        assert_eq!(params[0], SqlValue::Int(7));
        assert_eq!(params[1], SqlValue::Text("abc".into()));
        assert_eq!(params[2], SqlValue::Text(UNKNOWN.into()));
        match &params[3] {
            SqlValue::Text(published_at) => {
                assert!(published_at.starts_with(&today));
                assert_eq!(published_at.len(), 19);
            }
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(params[4], SqlValue::Text(UNKNOWN.into()));
    }

    #[test]
    fn test_bind_uses_meta_and_missing_data_is_null() {
        let mut dp = DataPoint::default();
        dp.meta.insert(PUBLISHER.into(), "erp".into());
        dp.meta.insert(PUBLISHED_AT.into(), "2018-01-02T03:04:05Z".into());
        dp.meta.insert(SHAPE_VERSION.into(), "v2".into());

        let params = plan().bind(&dp);
        assert_eq!(params[0], SqlValue::Null);
        assert_eq!(params[1], SqlValue::Null);
        assert_eq!(params[2], SqlValue::Text("erp".into()));
        assert_eq!(params[3], SqlValue::Text("2018-01-02 03:04:05".into()));
        assert_eq!(params[4], SqlValue::Text("v2".into()));
    }

    #[test]
    fn test_shape_covers() {
        let shape = Shape {
            entity_key: "t".into(),
            keys: vec!["id".into()],
            properties: [
                ("id".to_string(), Property::new("id", LogicalType::Integer)),
                ("name".to_string(), Property::new("name", LogicalType::String)),
            ]
            .into_iter()
            .collect(),
            friendly_names: BTreeMap::new(),
        };

        let mut declared = DeclaredShape {
            key_names: vec!["id".into()],
            properties: vec!["name:string".into()],
            ..Default::default()
        };
        assert!(shape.covers(&declared));

        declared.properties.push("price:float".into());
        assert!(!shape.covers(&declared));

        declared.properties.pop();
        declared.key_names.push("name".into());
        assert!(!shape.covers(&declared));
    }

    #[test]
    fn test_metadata_columns() {
        assert!(is_metadata_column("createdAt"));
        assert!(!is_metadata_column("created"));
    }
}
