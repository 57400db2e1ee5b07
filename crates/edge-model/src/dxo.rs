use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ModelError;

/// Key/value section of a [`Dxo`].
pub type DxoMap = Map<String, Value>;

/// Well-known DXO kinds.
///
/// The coordinator may send any tag; these are the ones the runner and the built-in components know how to name.
pub struct DataKind;

impl DataKind {
    pub const WEIGHTS: &'static str = "WEIGHTS";
    pub const WEIGHT_DIFF: &'static str = "WEIGHT_DIFF";
    pub const METRICS: &'static str = "METRICS";
    pub const COLLECTION: &'static str = "COLLECTION";
}

/// Data exchange object.
///
/// The only payload shape that crosses the protocol boundary and flows between filters and executors.
/// A DXO is well-formed when its `kind` is non-empty; `data` and `meta` are opaque to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dxo {
    pub kind: String,
    #[serde(default)]
    pub data: DxoMap,
    #[serde(default)]
    pub meta: DxoMap,
}

impl Dxo {
    /// Create an empty DXO of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: DxoMap::new(),
            meta: DxoMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Build a DXO from an untyped JSON payload.
    ///
    /// A `data` section that is not an object (e.g. a base64 model blob) is wrapped as `{"model": <value>}` so executors always see a map.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let Value::Object(mut obj) = value else {
            return Err(ModelError::MalformedDxo(format!(
                "expected an object, got {}",
                type_name(&value)
            )));
        };

        let kind = match obj.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(ModelError::MalformedDxo(format!(
                    "kind must be a string, got {}",
                    type_name(&other)
                )));
            }
            None => String::new(),
        };

        let data = match obj.remove("data") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => DxoMap::new(),
            Some(other) => {
                let mut map = DxoMap::new();
                map.insert("model".to_string(), other);
                map
            }
        };

        let meta = match obj.remove("meta") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => DxoMap::new(),
            Some(other) => {
                return Err(ModelError::MalformedDxo(format!(
                    "meta must be an object, got {}",
                    type_name(&other)
                )));
            }
        };

        let dxo = Self { kind, data, meta };
        dxo.validate()?;
        Ok(dxo)
    }

    /// Check the well-formedness invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.kind.trim().is_empty() {
            return Err(ModelError::MalformedDxo("kind is empty".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }

    /// Read an integer meta entry, accepting integral floats.
    pub fn meta_u32(&self, key: &str) -> Option<u32> {
        let value = self.meta.get(key)?;
        value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
