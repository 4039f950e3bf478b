//! Matcher - evaluates the registry against one inbound message.
//!
//! Matching is pure computation over already-available bytes: no I/O, no
//! mutation of the message or registry. Exclusions along the way are
//! expected (handlers for other message shapes legitimately coexist) and
//! are only traced, never surfaced as errors.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::TransportContext;
use crate::handler::{HandlerDescriptor, HandlerRegistry};
use crate::message::RawMessage;
use crate::serializer::BodyAttempt;

/// Result of matching one inbound message against the registry.
pub enum MatchResult {
    /// No descriptor's constraints were satisfied.
    NoMatch,
    /// Exactly one descriptor survived; its deserialized body is carried
    /// along so the dispatcher does not parse twice.
    UniqueMatch {
        descriptor: Arc<HandlerDescriptor>,
        body: Box<dyn Any + Send>,
    },
    /// More than one descriptor survived. Always a configuration defect:
    /// silently picking one would risk processing the message with the
    /// wrong handler semantics.
    AmbiguousMatch { conflicting: Vec<String> },
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::NoMatch => f.write_str("NoMatch"),
            MatchResult::UniqueMatch { descriptor, .. } => f
                .debug_struct("UniqueMatch")
                .field("descriptor", descriptor)
                .finish_non_exhaustive(),
            MatchResult::AmbiguousMatch { conflicting } => f
                .debug_struct("AmbiguousMatch")
                .field("conflicting", conflicting)
                .finish(),
        }
    }
}

/// Match one inbound message against the registry.
///
/// Every descriptor is evaluated - context tag first, then the
/// descriptor's deserialization chain, then body and context filters.
/// Registration order never breaks ties; all survivors are reported so
/// ambiguity is visible.
pub fn select(
    registry: &HandlerRegistry,
    message: &RawMessage,
    context: &dyn TransportContext,
) -> MatchResult {
    let mut survivors: Vec<(Arc<HandlerDescriptor>, Box<dyn Any + Send>)> = Vec::new();

    for descriptor in registry.descriptors() {
        if !context.satisfies(descriptor.context_tag()) {
            tracing::trace!(
                "handler '{}' excluded: context does not satisfy tag {}",
                descriptor.name(),
                descriptor.context_tag()
            );
            continue;
        }

        let body = match descriptor.try_deserialize(message) {
            BodyAttempt::Deserialized(body) => body,
            BodyAttempt::Skipped => {
                tracing::trace!(
                    "handler '{}' excluded: serializer chain declined the message",
                    descriptor.name()
                );
                continue;
            }
            BodyAttempt::Failed(cause) => {
                tracing::trace!(
                    "handler '{}' excluded: body did not deserialize as {}: {}",
                    descriptor.name(),
                    descriptor.message_type(),
                    cause
                );
                continue;
            }
        };

        if !descriptor.accepts_body(&*body) {
            tracing::trace!(
                "handler '{}' excluded: body filter rejected the message",
                descriptor.name()
            );
            continue;
        }

        if !descriptor.accepts_context(context) {
            tracing::trace!(
                "handler '{}' excluded: context filter rejected the message",
                descriptor.name()
            );
            continue;
        }

        survivors.push((Arc::clone(descriptor), body));
    }

    match survivors.len() {
        0 => MatchResult::NoMatch,
        1 => {
            let (descriptor, body) = survivors.swap_remove(0);
            MatchResult::UniqueMatch { descriptor, body }
        }
        _ => MatchResult::AmbiguousMatch {
            conflicting: survivors
                .iter()
                .map(|(descriptor, _)| descriptor.name().to_string())
                .collect(),
        },
    }
}
