//! # routewire
//!
//! Transport-agnostic message-handler resolution and dispatch core.
//!
//! Given a raw inbound message (bytes plus transport metadata) and a set
//! of statically registered handlers, routewire deterministically selects
//! at most one handler, deserializes the body into that handler's
//! expected type, and invokes it exactly once with correlation context.
//! The pump that talks to the broker stays outside: it supplies the
//! message, context, correlation info, and cancellation token, and maps
//! the returned [`DispatchOutcome`] to transport actions.
//!
//! ## Architecture
//!
//! - **Registry** ([`HandlerRegistry`]): ordered descriptors built once
//!   at startup, read-only afterwards
//! - **Serializer chain** ([`serializer`]): per-handler custom serializer
//!   with a default UTF-8 JSON fallback
//! - **Matcher** ([`dispatch::select`]): context tags, deserialization,
//!   and filter predicates produce zero, one, or many candidates
//! - **Dispatcher** ([`Dispatcher`]): enforces the single-match
//!   invariant and classifies the outcome
//!
//! ## Example
//!
//! ```ignore
//! use routewire::{
//!     async_trait, CancellationToken, CorrelationInfo, Dispatcher,
//!     HandlerRegistry, MessageContext, MessageHandler, RawMessage,
//! };
//!
//! #[derive(serde::Deserialize)]
//! struct Order {
//!     id: String,
//! }
//!
//! struct OrderHandler;
//!
//! #[async_trait]
//! impl MessageHandler<Order> for OrderHandler {
//!     async fn process_message(
//!         &self,
//!         order: Order,
//!         _context: &MessageContext,
//!         correlation: &CorrelationInfo,
//!         _cancel: &CancellationToken,
//!     ) -> anyhow::Result<()> {
//!         println!("order {} in operation {}", order.id, correlation.operation_id());
//!         Ok(())
//!     }
//! }
//!
//! # async fn pump() -> anyhow::Result<()> {
//! let registry = std::sync::Arc::new(
//!     HandlerRegistry::builder()
//!         .with_handler("orders", OrderHandler)?
//!         .build(),
//! );
//! let dispatcher = Dispatcher::new(registry);
//!
//! let outcome = dispatcher
//!     .dispatch(
//!         &RawMessage::new(&br#"{"id":"42"}"#[..]),
//!         &MessageContext::new("message-1"),
//!         &CorrelationInfo::new("op-1", "txn-1"),
//!         &CancellationToken::new(),
//!     )
//!     .await;
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod dispatch;
pub mod handler;
pub mod serializer;

mod correlation;
mod error;
mod message;

pub use context::{ContextKind, ContextTag, MessageContext, TransportContext};
pub use correlation::CorrelationInfo;
pub use dispatch::{DispatchOutcome, Dispatcher, MatchResult};
pub use error::{Result, RouteError};
pub use handler::{
    HandlerDescriptor, HandlerOptions, HandlerRegistry, HandlerRegistryBuilder, MessageHandler,
};
pub use message::RawMessage;
pub use serializer::{BodyAttempt, BodySerializer, JsonBodySerializer, MsgPackBodySerializer};

// Re-export the externals that appear in handler signatures.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
