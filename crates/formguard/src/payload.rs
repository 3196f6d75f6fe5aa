//! Decoded request input: a map from field name to one or more values.
//!
//! The payload does not care whether values came from a request body or a
//! query string. Keys repeat for multi-valued inputs (`tags=a&tags=b`).

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Multi-valued string map handed to the binder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    values: HashMap<String, Vec<String>>,
}

/// JSON shape accepted for a single payload entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PayloadValue {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = HashMap::<String, PayloadValue>::deserialize(deserializer)?;
        let values = map
            .into_iter()
            .map(|(k, v)| match v {
                PayloadValue::One(s) => (k, vec![s]),
                PayloadValue::Many(list) => (k, list),
            })
            .collect();
        Ok(Self { values })
    }
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from key/value pairs. Repeated keys accumulate.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Self::new();
        for (k, v) in pairs {
            payload.append(k, v);
        }
        payload
    }

    /// Parse an `application/x-www-form-urlencoded` body or a query string.
    ///
    /// A leading `?` is ignored. `+` decodes to a space. Pairs that fail to
    /// percent-decode are kept verbatim rather than dropped.
    pub fn from_urlencoded(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let mut payload = Self::new();

        for pair in input.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            payload.append(decode_component(key), decode_component(value));
        }

        payload
    }

    /// Append a value under `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Replace all values under `key` with a single value.
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), vec![value.into()]);
        self
    }

    /// Remove a key, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// All values under `key`, empty when the key is absent.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Whether the key was submitted at all.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no keys were submitted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_decoding() {
        let payload = Payload::from_urlencoded(
            "?name=Ada+Lovelace&email=ada%40example.com&tags=a&tags=b&flag",
        );

        assert_eq!(payload.first("name"), Some("Ada Lovelace"));
        assert_eq!(payload.first("email"), Some("ada@example.com"));
        assert_eq!(payload.get_all("tags"), ["a", "b"]);
        assert_eq!(payload.first("flag"), Some(""));
        assert!(payload.get_all("missing").is_empty());
    }

    #[test]
    fn pairs_accumulate() {
        let payload = Payload::from_pairs([("a", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get_all("a"), ["1", "2"]);
    }

    #[test]
    fn insert_replaces() {
        let payload = Payload::from_pairs([("a", "1"), ("a", "2")]).insert("a", "9");
        assert_eq!(payload.get_all("a"), ["9"]);
    }

    #[test]
    fn deserializes_strings_and_arrays() {
        let payload: Payload =
            serde_json::from_str(r#"{"username": "alice", "roles": ["admin", "editor"]}"#).unwrap();

        assert_eq!(payload.first("username"), Some("alice"));
        assert_eq!(payload.get_all("roles"), ["admin", "editor"]);
    }
}
