//! Schema migration for raw group files.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::CURRENT_SCHEMA_VERSION;

/// Bring a raw groups document up to the current layout.
///
/// - `{groups: ..}` without a version is stamped "1.0".
/// - A document with neither `version` nor `groups` is the legacy layout,
///   where the whole object was the groups map; it is wrapped.
///
/// Later versions add steps keyed on the detected version string.
pub fn migrate_schema(data: Value) -> Value {
    let mut object = match data {
        Value::Object(object) => object,
        other => return other,
    };

    if !object.contains_key("version") {
        if object.contains_key("groups") {
            debug!("Stamping unversioned groups file as {}", CURRENT_SCHEMA_VERSION);
            object.insert(
                "version".to_string(),
                Value::String(CURRENT_SCHEMA_VERSION.to_string()),
            );
        } else {
            debug!(groups = object.len(), "Wrapping legacy groups map");
            let mut wrapped = Map::new();
            wrapped.insert(
                "version".to_string(),
                Value::String(CURRENT_SCHEMA_VERSION.to_string()),
            );
            wrapped.insert("groups".to_string(), Value::Object(object));
            object = wrapped;
        }
    }

    // "1.0" is current; nothing further to do.
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_schema_unchanged() {
        let data = json!({ "version": "1.0", "groups": { "a": { "name": "a" } } });
        assert_eq!(migrate_schema(data.clone()), data);
    }

    #[test]
    fn test_unversioned_gets_stamped() {
        let migrated = migrate_schema(json!({ "groups": {} }));
        assert_eq!(migrated, json!({ "version": "1.0", "groups": {} }));
    }

    #[test]
    fn test_legacy_map_is_wrapped() {
        let legacy = json!({ "Work": { "name": "Work", "calendar_ids": ["x"] } });
        let migrated = migrate_schema(legacy.clone());
        assert_eq!(migrated["version"], "1.0");
        assert_eq!(migrated["groups"], legacy);
    }

    #[test]
    fn test_empty_object_becomes_empty_schema() {
        assert_eq!(
            migrate_schema(json!({})),
            json!({ "version": "1.0", "groups": {} })
        );
    }

    #[test]
    fn test_version_without_groups_is_left_alone() {
        let data = json!({ "version": "1.0" });
        assert_eq!(migrate_schema(data.clone()), data);
    }
}
