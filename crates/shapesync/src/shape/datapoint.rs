//! Inbound data point records.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::typemap::LogicalType;

/// Meta key overriding the companion view name.
pub const META_SHAPE_NAME: &str = "shapeName";

/// What the publisher wants done with a data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// First record of a batch; establishes (or evolves) the shape.
    StartPublish,
    /// Insert-or-update the record.
    Upsert,
    /// Last record of a batch.
    EndPublish,
    /// Any other or missing action; accepted but never written.
    #[default]
    #[serde(other)]
    Other,
}

/// The shape a data point declares for itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredShape {
    /// Key property names, in declaration order.
    #[serde(default)]
    pub key_names: Vec<String>,

    /// Property declarations in `name:type` form.
    #[serde(default)]
    pub properties: Vec<String>,

    /// Display names for physical properties, used by the companion view.
    #[serde(default)]
    pub property_names: BTreeMap<String, String>,
}

impl DeclaredShape {
    /// Parse the `name:type` property declarations.
    ///
    /// A declaration without a type is a string property. The last `:` splits
    /// name from type so names may themselves contain colons.
    pub fn parsed_properties(&self) -> Vec<(String, LogicalType)> {
        self.properties
            .iter()
            .map(|decl| match decl.rsplit_once(':') {
                Some((name, ty)) => (name.to_string(), LogicalType::parse(ty)),
                None => (decl.clone(), LogicalType::String),
            })
            .collect()
    }
}

/// A single record from the publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub entity: String,

    #[serde(default)]
    pub action: Action,

    #[serde(default)]
    pub shape: DeclaredShape,

    #[serde(default)]
    pub data: HashMap<String, JsonValue>,

    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl DataPoint {
    /// Registry key for this record: `source.entity`, or whichever part is set.
    pub fn entity_key(&self) -> String {
        match (self.source.is_empty(), self.entity.is_empty()) {
            (false, false) => format!("{}.{}", self.source, self.entity),
            (false, true) => self.source.clone(),
            _ => self.entity.clone(),
        }
    }

    /// Name of the companion view: `meta.shapeName`, else `<entity>_VIEW`.
    pub fn view_name(&self) -> String {
        match self.meta.get(META_SHAPE_NAME) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let base = if self.entity.is_empty() { &self.source } else { &self.entity };
                format!("{}_VIEW", base)
            }
        }
    }

    /// Parse a data point from a JSON document.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_data_point() {
        let dp = DataPoint::from_json(
            r#"{
                "source": "Test",
                "entity": "Products",
                "action": "START_PUBLISH",
                "shape": {
                    "keyNames": ["ID"],
                    "properties": ["ID:integer", "Name:string"],
                    "propertyNames": {"Name": "Product Name"}
                },
                "data": {"ID": 1, "Name": "First"},
                "meta": {"publisher": "erp"}
            }"#,
        )
        .unwrap();

        assert_eq!(dp.action, Action::StartPublish);
        assert_eq!(dp.entity_key(), "Test.Products");
        assert_eq!(dp.shape.key_names, vec!["ID"]);
        assert_eq!(dp.shape.property_names["Name"], "Product Name");
        assert_eq!(dp.meta["publisher"], "erp");
    }

    #[test]
    fn test_unknown_action_and_defaults() {
        let dp = DataPoint::from_json(r#"{"entity": "x", "action": "DELETE"}"#).unwrap();
        assert_eq!(dp.action, Action::Other);
        assert!(dp.shape.properties.is_empty());

        let dp = DataPoint::from_json(r#"{"entity": "x"}"#).unwrap();
        assert_eq!(dp.action, Action::Other);
    }

    #[test]
    fn test_parsed_properties() {
        let shape = DeclaredShape {
            properties: vec![
                "id:integer".into(),
                "when:date".into(),
                "plain".into(),
                "ns:attr:bool".into(),
            ],
            ..Default::default()
        };
        assert_eq!(
            shape.parsed_properties(),
            vec![
                ("id".to_string(), LogicalType::Integer),
                ("when".to_string(), LogicalType::Date),
                ("plain".to_string(), LogicalType::String),
                ("ns:attr".to_string(), LogicalType::Bool),
            ]
        );
    }

    #[test]
    fn test_entity_key_and_view_name() {
        let mut dp = DataPoint {
            entity: "Products".into(),
            ..Default::default()
        };
        assert_eq!(dp.entity_key(), "Products");
        assert_eq!(dp.view_name(), "Products_VIEW");

        dp.meta.insert(META_SHAPE_NAME.into(), "Catalog".into());
        assert_eq!(dp.view_name(), "Catalog");
    }
}
