//! Payload Builder
//!
//! Handlers usually assemble the hydration payload key by key and then write
//! it through a [`HydrationWriter`](super::HydrationWriter) in one go.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::island::Props;

/// An accumulator for a hydration payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    values: Props,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set `key` to the JSON form of any serializable value.
    pub fn set_serialized<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let value = serde_json::to_value(value)?;
        Ok(self.set(key, value))
    }

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of keys set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key has been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encode the payload as a JSON object.
    pub fn marshal(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.values)
    }

    /// Hand the values over for [`Island::hydrate`](crate::island::Island::hydrate).
    pub fn into_props(self) -> Props {
        self.values
    }
}

impl From<Payload> for Props {
    fn from(payload: Payload) -> Self {
        payload.values
    }
}

impl From<Props> for Payload {
    fn from(values: Props) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct User {
        name: &'static str,
        admin: bool,
    }

    #[test]
    fn set_overwrites_and_chains() {
        let mut payload = Payload::new();
        payload.set("a", 1).set("b", "two").set("a", 3);

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("a"), Some(&json!(3)));
    }

    #[test]
    fn marshal_produces_an_object() {
        let mut payload = Payload::new();
        payload
            .set_serialized(
                "user",
                &User {
                    name: "Ada",
                    admin: true,
                },
            )
            .unwrap();

        let bytes = payload.marshal().unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, json!({"user": {"name": "Ada", "admin": true}}));
    }

    #[test]
    fn empty_payload_marshals_to_empty_object() {
        assert_eq!(Payload::new().marshal().unwrap(), b"{}");
        assert!(Payload::new().is_empty());
    }

    #[test]
    fn converts_to_props_for_direct_hydration() {
        let mut payload = Payload::new();
        payload.set("k", true);
        let props: Props = payload.into();
        assert_eq!(props.get("k"), Some(&json!(true)));
    }
}
