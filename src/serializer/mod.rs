//! Serializer module - body deserialization for inbound messages.
//!
//! Each registered handler owns a small deserialization chain: an optional
//! custom [`BodySerializer`] tried first, then the default UTF-8 JSON
//! fallback. The chain communicates through [`BodyAttempt`], a tagged
//! result, rather than errors-as-control-flow: a failed attempt only means
//! "this handler does not match", never a crash.
//!
//! Shipped serializers:
//!
//! - [`JsonBodySerializer`] - explicit-type JSON (same format as the
//!   default fallback, usable where the declared content type lies)
//! - [`MsgPackBodySerializer`] - MessagePack using `rmp-serde`
//!   (struct-as-map encoding)

mod json;
mod msgpack;

use std::any::Any;

use serde::de::DeserializeOwned;

use crate::message::RawMessage;

pub use json::JsonBodySerializer;
pub use msgpack::MsgPackBodySerializer;

/// Result of one deserialization attempt.
///
/// The deserialized value is type-erased; the chain verifies it against
/// the handler's expected message type before accepting it.
pub enum BodyAttempt {
    /// The attempt produced a value.
    Deserialized(Box<dyn Any + Send>),
    /// The serializer declined this message; the chain continues.
    Skipped,
    /// The attempt failed; the candidate handler is excluded.
    Failed(anyhow::Error),
}

impl BodyAttempt {
    /// Wrap a typed value.
    pub fn deserialized<T: Send + 'static>(value: T) -> Self {
        BodyAttempt::Deserialized(Box::new(value))
    }

    /// Whether this attempt produced a value.
    pub fn is_deserialized(&self) -> bool {
        matches!(self, BodyAttempt::Deserialized(_))
    }
}

impl std::fmt::Debug for BodyAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyAttempt::Deserialized(_) => f.write_str("Deserialized(..)"),
            BodyAttempt::Skipped => f.write_str("Skipped"),
            BodyAttempt::Failed(e) => write!(f, "Failed({e})"),
        }
    }
}

/// A custom message body serializer attached to a handler registration.
///
/// Implementations deserialize the raw body into the handler's expected
/// message type. Returning [`BodyAttempt::Skipped`] hands the message to
/// the default JSON fallback; returning [`BodyAttempt::Failed`] excludes
/// the handler for this message without falling back.
///
/// Implementations must not mutate the message or keep state observable
/// across calls.
pub trait BodySerializer: Send + Sync {
    /// Attempt to deserialize the message body.
    fn deserialize(&self, raw: &RawMessage) -> BodyAttempt;
}

/// Run the deserialization chain for a handler expecting message type `M`.
///
/// The custom serializer, when present, is tried first. A value of the
/// wrong type counts as a failure: the serializer was explicitly attached
/// to this registration, so producing something else is a configuration
/// mistake on this candidate, not a reason to re-parse the bytes.
pub(crate) fn deserialize_chain<M>(
    raw: &RawMessage,
    custom: Option<&dyn BodySerializer>,
) -> BodyAttempt
where
    M: DeserializeOwned + Send + 'static,
{
    if let Some(serializer) = custom {
        match serializer.deserialize(raw) {
            BodyAttempt::Deserialized(value) if value.is::<M>() => {
                return BodyAttempt::Deserialized(value);
            }
            BodyAttempt::Deserialized(_) => {
                return BodyAttempt::Failed(anyhow::anyhow!(
                    "custom serializer produced a value of the wrong type, expected {}",
                    std::any::type_name::<M>()
                ));
            }
            BodyAttempt::Failed(cause) => return BodyAttempt::Failed(cause),
            BodyAttempt::Skipped => {}
        }
    }

    json::deserialize_default::<M>(raw)
}
