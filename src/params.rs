//! Scoped parameter context.
//!
//! A [`ParameterServer`] is built from the parameter payload stored with a
//! scenario. Lookups walk a key path through nested JSON objects; a missing
//! value falls back to the supplied default, which is written back so the
//! context ends up describing every parameter an episode actually used.

use serde_json::{Map, Value};
use tracing::debug;

/// Nested key/value parameter store backed by a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterServer {
    root: Value,
}

impl ParameterServer {
    /// Creates an empty parameter context.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Creates a context scoped to a copy of `params`.
    ///
    /// Anything that is not a JSON object is treated as an empty context.
    pub fn from_json(params: &Value) -> Self {
        match params {
            Value::Object(_) => Self {
                root: params.clone(),
            },
            _ => Self::new(),
        }
    }

    /// Returns the value stored at `path`, if any.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.root, |node, key| node.as_object()?.get(*key))
    }

    /// Reads a float at `path`, storing `default` if it is absent or not numeric.
    pub fn get_f64(&mut self, path: &[&str], description: &str, default: f64) -> f64 {
        if let Some(value) = self.get(path).and_then(Value::as_f64) {
            return value;
        }
        debug!(
            "Parameter {} ({}) not set, using default {}",
            path.join("."),
            description,
            default
        );
        self.set(path, Value::from(default));
        default
    }

    /// Writes `value` at `path`, creating intermediate objects as needed.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for key in parents {
            node = ensure_object(node)
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(node).insert((*last).to_string(), value);
    }

    /// Returns the underlying JSON payload.
    pub fn as_json(&self) -> &Value {
        &self.root
    }
}

impl Default for ParameterServer {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_nested_value() {
        let mut params = ParameterServer::from_json(&json!({
            "Simulation": {"StepTime": 0.05}
        }));
        let step = params.get_f64(&["Simulation", "StepTime"], "step time", 0.2);
        assert_eq!(step, 0.05);
    }

    #[test]
    fn test_default_is_written_back() {
        let mut params = ParameterServer::new();
        let step = params.get_f64(&["Simulation", "StepTime"], "step time", 0.2);
        assert_eq!(step, 0.2);
        assert_eq!(params.get(&["Simulation", "StepTime"]), Some(&json!(0.2)));
    }

    #[test]
    fn test_non_object_payload_is_empty_context() {
        let mut params = ParameterServer::from_json(&json!("not a map"));
        assert!(params.get(&["Simulation"]).is_none());
        assert_eq!(params.get_f64(&["Viewer", "Scale"], "viewer scale", 1.5), 1.5);
        assert_eq!(params.get(&["Viewer", "Scale"]), Some(&json!(1.5)));
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut params = ParameterServer::from_json(&json!({"Simulation": 3}));
        params.set(&["Simulation", "StepTime"], json!(0.1));
        assert_eq!(params.as_json(), &json!({"Simulation": {"StepTime": 0.1}}));
    }
}
