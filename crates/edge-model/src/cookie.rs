use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque continuity token issued by the coordinator.
///
/// Forwarded verbatim on subsequent task and result requests; the runner never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookie(Value);

impl Cookie {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Wrap a response value, treating `null` and empty containers as "no cookie".
    pub fn from_response(value: Option<Value>) -> Option<Self> {
        match value? {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            Value::String(s) if s.is_empty() => None,
            other => Some(Self(other)),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
