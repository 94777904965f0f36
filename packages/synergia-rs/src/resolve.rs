//! Identifier → display-name resolution.
//!
//! Primary gateway records reference subjects, categories, classrooms and
//! attendance types only by opaque ids; the names live in auxiliary listing
//! resources. Maps are rebuilt per request because identifiers are
//! school-specific and sessions are never reused.

use std::collections::HashMap;

use serde_json::Value;

/// id → display name built from an auxiliary listing resource.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    names: HashMap<i64, String>,
}

impl IdentifierMap {
    /// Build from the array nested under the first matching envelope key.
    ///
    /// Display name preference per item: `Name`, then `Short`, then
    /// `Value`, then the id itself.
    pub fn from_listing(envelope: Option<&Value>, keys: &[&str]) -> Self {
        let mut names = HashMap::new();
        let items = keys
            .iter()
            .find_map(|key| envelope.and_then(|v| v.get(*key)).and_then(Value::as_array));

        if let Some(items) = items {
            for item in items {
                let Some(id) = item.get("Id").and_then(Value::as_i64) else {
                    continue;
                };
                let display = ["Name", "Short", "Value"]
                    .iter()
                    .find_map(|field| item.get(*field).and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string());
                names.insert(id, display);
            }
        }

        Self { names }
    }

    /// Resolve an id, falling back to `"#<id>"` so the referencing record
    /// survives a lookup miss instead of being dropped.
    pub fn resolve(&self, id: Option<i64>) -> String {
        match id {
            Some(id) => self
                .names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("#{id}")),
            None => "#?".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
