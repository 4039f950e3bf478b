//! Dispatcher - single-match enforcement and handler invocation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::context::TransportContext;
use crate::correlation::CorrelationInfo;
use crate::dispatch::selector::{select, MatchResult};
use crate::handler::HandlerRegistry;
use crate::message::RawMessage;

/// Terminal outcome of dispatching one inbound message.
///
/// The dispatcher never acknowledges, dead-letters, or retries; the pump
/// maps outcome kinds to transport actions.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A unique handler matched and completed.
    Completed,
    /// No handler matched. Transport disposition (dead-letter, abandon)
    /// is the pump's decision.
    Unhandled,
    /// More than one handler matched - a configuration defect requiring
    /// the operator to narrow a filter or type. No handler was invoked.
    ConfigurationError { conflicting: Vec<String> },
    /// The matched handler was invoked and failed; the original cause is
    /// preserved so the pump can tell business failure from routing
    /// failure.
    HandlerFailed(anyhow::Error),
    /// Cancellation was observed before completion. No handler ran if the
    /// signal fired before matching completed.
    Cancelled,
}

impl DispatchOutcome {
    /// Whether a handler ran to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, DispatchOutcome::Completed)
    }
}

/// Dispatches raw inbound messages to registered handlers.
///
/// The dispatcher holds the shared read-only registry and performs one
/// `Matching -> Invoking` pass per message: select at most one handler,
/// invoke it exactly once, classify the outcome. Independent messages can
/// be dispatched concurrently through clones of the same dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher consults.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatch one inbound message.
    ///
    /// The cancellation token is honored before matching, between
    /// matching and invocation, and during invocation: a token fired
    /// mid-invocation abandons the handler future and yields
    /// [`DispatchOutcome::Cancelled`]. The token is also passed into the
    /// handler so cooperative handlers can stop at a clean point first.
    pub async fn dispatch(
        &self,
        message: &RawMessage,
        context: &dyn TransportContext,
        correlation: &CorrelationInfo,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        if cancel.is_cancelled() {
            tracing::debug!(
                "dispatch of message '{}' cancelled before matching",
                context.base().message_id()
            );
            return DispatchOutcome::Cancelled;
        }

        match select(&self.registry, message, context) {
            MatchResult::NoMatch => {
                tracing::debug!(
                    "no handler matched message '{}'",
                    context.base().message_id()
                );
                DispatchOutcome::Unhandled
            }
            MatchResult::AmbiguousMatch { conflicting } => {
                tracing::warn!(
                    "ambiguous match for message '{}': handlers {:?} all accept it; \
                     narrow a filter or message type",
                    context.base().message_id(),
                    conflicting
                );
                DispatchOutcome::ConfigurationError { conflicting }
            }
            MatchResult::UniqueMatch { descriptor, body } => {
                if cancel.is_cancelled() {
                    return DispatchOutcome::Cancelled;
                }

                tracing::debug!(
                    "dispatching message '{}' to handler '{}'",
                    context.base().message_id(),
                    descriptor.name()
                );

                let invocation = descriptor.invoke(body, context, correlation, cancel);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(
                            "handler '{}' cancelled mid-invocation for message '{}'",
                            descriptor.name(),
                            context.base().message_id()
                        );
                        DispatchOutcome::Cancelled
                    }
                    result = invocation => match result {
                        Ok(()) => DispatchOutcome::Completed,
                        Err(cause) => {
                            tracing::debug!(
                                "handler '{}' failed for message '{}': {}",
                                descriptor.name(),
                                context.base().message_id(),
                                cause
                            );
                            DispatchOutcome::HandlerFailed(cause)
                        }
                    },
                }
            }
        }
    }
}
