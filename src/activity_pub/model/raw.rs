//! Read-only view over an untrusted JSON-LD node.

use std::sync::LazyLock;

use serde_json::{Map, Value};

static EMPTY: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

#[derive(Debug, Clone, Copy)]
pub(crate) struct RawObject<'a>(&'a Map<String, Value>);

impl<'a> RawObject<'a> {
    /// Anything but a JSON object is read as an empty node.
    pub(crate) fn from_value(value: &'a Value) -> RawObject<'a> {
        match value.as_object() {
            Some(map) => RawObject(map),
            None => RawObject(&*EMPTY),
        }
    }
    pub(crate) fn map(&self) -> &'a Map<String, Value> {
        self.0
    }
    pub(crate) fn id(&self) -> Option<&'a str> {
        self.get_str("id").or_else(|| self.get_str("@id"))
    }
    /// The first type tag, `type` taking precedence over `@type`.
    pub(crate) fn first_type(&self) -> Option<&'a str> {
        for prop in ["type", "@type"] {
            match self.0.get(prop) {
                Some(Value::String(ty)) => return Some(ty.as_str()),
                Some(Value::Array(types)) => return types.iter().find_map(Value::as_str),
                _ => {}
            }
        }
        None
    }
    pub(crate) fn get_str(&self, prop: &str) -> Option<&'a str> {
        self.0.get(prop).and_then(Value::as_str)
    }
    pub(crate) fn get_string(&self, prop: &str) -> Option<String> {
        self.get_str(prop).map(str::to_string)
    }
    pub(crate) fn get_bool(&self, prop: &str) -> Option<bool> {
        self.0.get(prop).and_then(Value::as_bool)
    }
    /// A single IRI or an array of them. Non-string entries are skipped.
    pub(crate) fn get_str_array(&self, prop: &str) -> Vec<String> {
        match self.0.get(prop) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(array)) => array
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => vec![],
        }
    }
    /// A nested node, only when the property holds a JSON object.
    pub(crate) fn get_node_object(&self, prop: &str) -> Option<RawObject<'a>> {
        self.0.get(prop).and_then(Value::as_object).map(RawObject)
    }
    pub(crate) fn get_node_iri(&self, prop: &str) -> Option<&'a str> {
        match self.0.get(prop)? {
            Value::String(iri) => Some(iri.as_str()),
            Value::Object(map) => map.get("id").and_then(Value::as_str),
            // A node reference might be an array, use the first IRI.
            Value::Array(array) => array.iter().find_map(Value::as_str),
            _ => None,
        }
    }
    pub(crate) fn get_endpoint(&self, prop: &str) -> Option<&'a str> {
        self.0.get("endpoints")?.get(prop)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::RawObject;

    #[test]
    fn type_array_uses_first_string() {
        let value = json!({ "type": [42, "Note", "Article"] });
        assert_eq!(RawObject::from_value(&value).first_type(), Some("Note"));
    }

    #[test]
    fn non_object_reads_as_empty() {
        let value = json!("https://example.com/notes/1");
        let raw = RawObject::from_value(&value);
        assert!(raw.map().is_empty());
        assert_eq!(raw.first_type(), None);
    }

    #[test]
    fn node_iri_from_string_object_or_array() {
        let value = json!({
            "a": "https://example.com/a",
            "b": { "id": "https://example.com/b", "type": "Person" },
            "c": [{ "type": "Link" }, "https://example.com/c"],
            "d": 12
        });
        let raw = RawObject::from_value(&value);
        assert_eq!(raw.get_node_iri("a"), Some("https://example.com/a"));
        assert_eq!(raw.get_node_iri("b"), Some("https://example.com/b"));
        assert_eq!(raw.get_node_iri("c"), Some("https://example.com/c"));
        assert_eq!(raw.get_node_iri("d"), None);
    }

    #[test]
    fn shared_inbox_endpoint() {
        let value = json!({ "endpoints": { "sharedInbox": "https://example.com/inbox" } });
        let raw = RawObject::from_value(&value);
        assert_eq!(
            raw.get_endpoint("sharedInbox"),
            Some("https://example.com/inbox")
        );
        assert_eq!(raw.get_endpoint("oauth"), None);
    }
}
