//! The statically-typed analogue of the duck-typed `_clean()` serializer: most payload
//! fields simply derive `Serialize` and go through `serde_json::to_value`, but a few
//! (queue snapshots, track lists) want to recursively embed other `Serializable`
//! values without forcing every caller through `serde_json::Value` first.

use std::collections::BTreeMap;

/// Implemented by types that know how to render themselves as JSON without going
/// through `serde::Serialize` (typically because they want to embed other
/// `Serializable` items, e.g. a queue snapshot embedding job summaries).
pub trait Serializable: Send + Sync {
    fn to_json(&self) -> serde_json::Value;
}

/// A small closed variant covering everything a payload ever needs to shape itself as:
/// a map, a sequence, a bare scalar, or a custom `Serializable` implementor.
pub enum PayloadValue {
    Map(BTreeMap<String, PayloadValue>),
    Seq(Vec<PayloadValue>),
    Scalar(serde_json::Value),
    Custom(Box<dyn Serializable>),
}

impl PayloadValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PayloadValue::Map(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
            PayloadValue::Seq(items) => {
                serde_json::Value::Array(items.iter().map(PayloadValue::to_json).collect())
            }
            PayloadValue::Scalar(value) => value.clone(),
            PayloadValue::Custom(inner) => inner.to_json(),
        }
    }
}

impl<T: serde::Serialize> From<&T> for PayloadValue {
    fn from(value: &T) -> Self {
        PayloadValue::Scalar(serde_json::to_value(value).unwrap_or(serde_json::Value::Null))
    }
}
