//! The merged configuration tree.
//!
//! A [`ConfigTree`] is a JSON object whose top-level keys are sections. Every
//! value handed out is an owned clone; `serde_json::Value` owns its whole
//! subtree, so a clone is a full deep copy at any depth.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Value);

impl Default for ConfigTree {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `value`; anything other than an object becomes an empty tree.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self(value),
            _ => Self::default(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Dot-separated lookup. Numeric segments index into arrays.
    ///
    /// The empty path is the whole tree. An empty segment (`a..b`) or any
    /// missing segment yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.0);
        }
        let mut node = &self.0;
        for segment in path.split('.') {
            if segment.is_empty() {
                return None;
            }
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Owned copy of the value at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.lookup(path).cloned()
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.0.as_object()?.get(name)
    }

    /// Top-level section names in key order.
    pub fn sections(&self) -> Vec<String> {
        self.0
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_section(&mut self, name: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(name.to_string(), value);
        }
    }

    pub fn remove_section(&mut self, name: &str) -> Option<Value> {
        self.0.as_object_mut()?.remove(name)
    }

    /// Deep-merge `overlay` on top of this tree.
    pub fn merge(&mut self, overlay: Value) {
        deep_merge(&mut self.0, overlay);
    }
}

/// Objects merge key by key; arrays and scalars in `overlay` replace `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn tree() -> ConfigTree {
        ConfigTree::from_value(json!({
            "cache": { "ttl": 300, "backends": ["memory", "redis"] },
            "server": { "port": 3000, "cors": { "origins": ["*"] } },
            "flag": false
        }))
    }

    #[rstest]
    #[case("cache.ttl", Some(json!(300)))]
    #[case("cache.backends.1", Some(json!("redis")))]
    #[case("server.cors.origins.0", Some(json!("*")))]
    #[case("flag", Some(json!(false)))]
    #[case("a.b.c.d", None)]
    #[case("cache.ttl.deeper", None)]
    #[case("cache.backends.7", None)]
    #[case("cache.backends.x", None)]
    #[case("cache..ttl", None)]
    #[case("cache.", None)]
    fn lookup(#[case] path: &str, #[case] expected: Option<Value>) {
        assert_eq!(tree().get(path), expected);
    }

    #[test]
    fn empty_path_is_the_root() {
        let t = tree();
        assert_eq!(t.lookup(""), Some(t.as_value()));
    }

    #[test]
    fn merge_overrides_scalars_and_recurses_objects() {
        let mut t = tree();
        t.merge(json!({ "cache": { "ttl": 60 }, "server": { "cors": { "credentials": true } } }));
        assert_eq!(t.get("cache.ttl"), Some(json!(60)));
        assert_eq!(t.get("cache.backends"), Some(json!(["memory", "redis"])));
        assert_eq!(t.get("server.port"), Some(json!(3000)));
        assert_eq!(t.get("server.cors.origins"), Some(json!(["*"])));
        assert_eq!(t.get("server.cors.credentials"), Some(json!(true)));
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        let mut t = tree();
        t.merge(json!({ "cache": { "backends": ["disk"] } }));
        assert_eq!(t.get("cache.backends"), Some(json!(["disk"])));
    }

    #[test]
    fn returned_values_are_detached() {
        let t = tree();
        let mut server = t.get("server").unwrap();
        server["cors"]["origins"][0] = json!("evil.example");
        assert_eq!(t.get("server.cors.origins.0"), Some(json!("*")));
    }

    #[test]
    fn non_object_root_becomes_empty() {
        assert_eq!(ConfigTree::from_value(json!([1, 2])).sections(), Vec::<String>::new());
    }
}
