//! Shape delta computation.
//!
//! Schema evolution is expansion-only: properties and keys are added, never
//! removed or retyped. For a known entity the delta therefore always carries
//! the complete current property set so the resulting ALTER is a full,
//! idempotent resync rather than a minimal diff.

use tracing::warn;

use crate::shape::datapoint::DataPoint;
use crate::shape::model::{Shape, ShapeDelta};

/// Compare the shape a data point declares with the known shape of its entity.
pub fn analyze(dp: &DataPoint, known: Option<&Shape>) -> ShapeDelta {
    let entity_key = dp.entity_key();
    let declared = dp.shape.parsed_properties();

    match known {
        None => {
            let mut new_keys: Vec<String> = Vec::with_capacity(dp.shape.key_names.len());
            for key in &dp.shape.key_names {
                if !new_keys.contains(key) {
                    new_keys.push(key.clone());
                }
            }

            ShapeDelta {
                entity_key,
                view_name: dp.view_name(),
                is_new: true,
                previous_shape: None,
                full_property_set: declared.into_iter().collect(),
                new_keys,
                has_key_changes: false,
                friendly_name_map: dp.shape.property_names.clone(),
            }
        }
        Some(previous) => {
            let mut full_property_set = previous.property_types();
            for (name, logical_type) in declared {
                match full_property_set.get(&name) {
                    Some(existing) if *existing != logical_type => {
                        warn!(
                            "Property {}.{} declared as {} but committed as {}; keeping {}",
                            entity_key, name, logical_type, existing, existing
                        );
                    }
                    Some(_) => {}
                    None => {
                        full_property_set.insert(name, logical_type);
                    }
                }
            }

            let mut new_keys = previous.keys.clone();
            for key in &dp.shape.key_names {
                if !new_keys.contains(key) {
                    new_keys.push(key.clone());
                }
            }
            let has_key_changes = new_keys != previous.keys;

            ShapeDelta {
                entity_key,
                view_name: dp.view_name(),
                is_new: false,
                previous_shape: Some(previous.clone()),
                full_property_set,
                new_keys,
                has_key_changes,
                friendly_name_map: dp.shape.property_names.clone(),
            }
        }
    }
}
