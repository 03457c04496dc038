//! Page serialization channel.
//!
//! A key-scoped side channel carried alongside the rendered output. The
//! server pass writes each key at most once; the client pass takes each key
//! at most once.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use universal_query::serialization::SerializationChannel;
//!
//! // Server pass
//! let server = SerializationChannel::new();
//! server.write(&"apollo", &json!({"Query1": {"data": "X"}})).unwrap();
//! let payload = server.to_payload().unwrap();
//!
//! // Client pass
//! let client = SerializationChannel::from_payload(&payload);
//! assert_eq!(client.take("apollo"), Some(json!({"Query1": {"data": "X"}})));
//! assert_eq!(client.take("apollo"), None);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Error type for serialization channel writes.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Key `{0}` was already written during this render")]
    AlreadyWritten(String),

    #[error("Failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode serialization payload: {0}")]
    EncodePayload(#[source] serde_json::Error),
}

/// Shared, cloneable set of serialized slots.
#[derive(Debug, Clone, Default)]
pub struct SerializationChannel {
    slots: Arc<DashMap<String, Value>>,
}

impl SerializationChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a channel from a payload produced by [`Self::to_payload`].
    ///
    /// A malformed payload yields an empty channel, so every reader starts
    /// cold.
    #[must_use]
    pub fn from_payload(payload: &str) -> Self {
        match serde_json::from_str::<BTreeMap<String, Value>>(payload) {
            Ok(slots) => Self {
                slots: Arc::new(slots.into_iter().collect()),
            },
            Err(error) => {
                tracing::warn!(%error, "discarding malformed serialization payload");
                Self::new()
            }
        }
    }

    /// Encodes all written slots as one JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::EncodePayload`] if encoding fails.
    pub fn to_payload(&self) -> Result<String, SerializationError> {
        let slots: BTreeMap<String, Value> = self
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        serde_json::to_string(&slots).map_err(SerializationError::EncodePayload)
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::AlreadyWritten`] if `key` already holds
    /// a value, or [`SerializationError::Encode`] if `value` does not
    /// serialize.
    pub fn write<T: Serialize>(
        &self,
        key: &impl ToString,
        value: &T,
    ) -> Result<(), SerializationError> {
        let key = key.to_string();
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(source) => return Err(SerializationError::Encode { key, source }),
        };

        match self.slots.entry(key) {
            Entry::Occupied(entry) => Err(SerializationError::AlreadyWritten(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(key = %entry.key(), "serialized");
                entry.insert(encoded);
                Ok(())
            }
        }
    }

    /// Removes and returns the value stored under `key`.
    #[must_use]
    pub fn take(&self, key: &str) -> Option<Value> {
        self.slots.remove(key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
