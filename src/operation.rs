//! Request and response shapes passed through the link chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single request travelling through the chain.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use universal_query::operation::Operation;
///
/// let op = Operation::new(&"User", &"query User($id: ID!) { user(id: $id) { name } }")
///     .with_variables(json!({"id": "1"}));
///
/// assert_eq!(op.cache_key(), r#"User:{"id":"1"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name; also the cache key when there are no variables.
    pub name: String,
    /// Query document text.
    pub query: String,
    /// Variables; `null` or an empty object means "none".
    #[serde(default)]
    pub variables: Value,
    /// Outgoing headers set by links.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Per-request context shared between links; never sent over the wire.
    #[serde(skip)]
    pub context: BTreeMap<String, Value>,
}

impl Operation {
    #[must_use]
    pub fn new(name: &impl ToString, query: &impl ToString) -> Self {
        Self {
            name: name.to_string(),
            query: query.to_string(),
            variables: Value::Null,
            headers: BTreeMap::new(),
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: &impl ToString, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// Key under which this operation's result is cached.
    ///
    /// serde_json maps are ordered, so the variables part is canonical.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match &self.variables {
            Value::Null => self.name.clone(),
            Value::Object(map) if map.is_empty() => self.name.clone(),
            variables => format!("{}:{}", self.name, variables),
        }
    }
}

/// An error entry returned by the server alongside (or instead of) data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl ResponseError {
    #[must_use]
    pub fn new(message: &impl ToString) -> Self {
        Self {
            message: message.to_string(),
            path: Vec::new(),
        }
    }
}

/// The result of executing an [`Operation`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl Response {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// A response with errors and no data.
    #[must_use]
    pub const fn errors(errors: Vec<ResponseError>) -> Self {
        Self { data: None, errors }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_without_variables() {
        let op = Operation::new(&"Query1", &"{ a }");
        assert_eq!(op.cache_key(), "Query1");

        let op = op.with_variables(json!({}));
        assert_eq!(op.cache_key(), "Query1");
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = Operation::new(&"Q", &"{ a }").with_variables(json!({"b": 2, "a": 1}));
        let b = Operation::new(&"Q", &"{ a }").with_variables(json!({"a": 1, "b": 2}));
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), r#"Q:{"a":1,"b":2}"#);
    }

    #[test]
    fn test_context_is_not_serialized() {
        let op = Operation::new(&"Q", &"{ a }").with_context(&"csrfToken", json!("secret"));
        let encoded = serde_json::to_string(&op).expect("operation should serialize");
        assert!(!encoded.contains("secret"));
    }

    #[test]
    fn test_response_constructors() {
        let ok = Response::data(json!({"a": 1}));
        assert!(!ok.has_errors());

        let failed = Response::errors(vec![ResponseError::new(&"boom")]);
        assert!(failed.has_errors());
        assert!(failed.data.is_none());
    }
}
