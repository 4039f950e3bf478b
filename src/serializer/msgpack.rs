//! MessagePack body serializer using `rmp-serde`.
//!
//! Encoding uses `to_vec_named` so structs serialize as maps (with field
//! names) rather than positional arrays; that is the format produced by
//! the common MessagePack producers on other platforms.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{BodyAttempt, BodySerializer};
use crate::error::Result;
use crate::message::RawMessage;

/// Custom serializer for MessagePack-encoded message bodies.
///
/// Attach to a registration whose transport delivers MessagePack instead
/// of JSON. Hands nothing to the fallback: a body that is not valid
/// MessagePack for `T` fails the attempt.
///
/// # Example
///
/// ```
/// use routewire::serializer::MsgPackBodySerializer;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Order {
///     id: String,
/// }
///
/// let order = Order { id: "42".to_string() };
/// let bytes = MsgPackBodySerializer::<Order>::encode(&order).unwrap();
/// assert_eq!(bytes[0] & 0xF0, 0x80); // struct-as-map format
/// ```
pub struct MsgPackBodySerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> MsgPackBodySerializer<T> {
    /// Create the serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Encode a value as MessagePack with struct-as-map format.
    pub fn encode<V: serde::Serialize>(value: &V) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }
}

impl<T> Default for MsgPackBodySerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BodySerializer for MsgPackBodySerializer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn deserialize(&self, raw: &RawMessage) -> BodyAttempt {
        match rmp_serde::from_slice::<T>(raw.body()) {
            Ok(value) => BodyAttempt::deserialized(value),
            Err(e) => BodyAttempt::Failed(e.into()),
        }
    }
}
