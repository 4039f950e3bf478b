//! JSON body deserialization - the default fallback of every chain.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{BodyAttempt, BodySerializer};
use crate::message::RawMessage;

/// Whether the declared content type allows the JSON fallback.
///
/// An absent content type is accepted: many transports simply do not set
/// one. A declared non-JSON type makes the fallback decline rather than
/// parse bytes it was told are something else.
fn accepts_content_type(content_type: Option<&str>) -> bool {
    let Some(declared) = content_type else {
        return true;
    };
    let essence = declared
        .split(';')
        .next()
        .unwrap_or(declared)
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence == "text/json" || essence.ends_with("+json")
}

/// Default fallback: parse the body as UTF-8 JSON into `M`.
pub(crate) fn deserialize_default<M>(raw: &RawMessage) -> BodyAttempt
where
    M: DeserializeOwned + Send + 'static,
{
    if !accepts_content_type(raw.content_type()) {
        return BodyAttempt::Skipped;
    }

    match serde_json::from_slice::<M>(raw.body()) {
        Ok(value) => BodyAttempt::deserialized(value),
        Err(e) => BodyAttempt::Failed(e.into()),
    }
}

/// Custom serializer that deserializes JSON into an explicit target type.
///
/// Behaves like the default fallback but ignores the declared content
/// type, for transports that mislabel JSON payloads.
pub struct JsonBodySerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonBodySerializer<T> {
    /// Create the serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Encode a value as the JSON the default fallback reads back.
    pub fn encode<V: serde::Serialize>(value: &V) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }
}

impl<T> Default for JsonBodySerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BodySerializer for JsonBodySerializer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn deserialize(&self, raw: &RawMessage) -> BodyAttempt {
        match serde_json::from_slice::<T>(raw.body()) {
            Ok(value) => BodyAttempt::deserialized(value),
            Err(e) => BodyAttempt::Failed(e.into()),
        }
    }
}
