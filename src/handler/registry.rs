//! Handler registry - the ordered, append-only set of descriptors.
//!
//! The registry is built once at startup through the builder, then shared
//! read-only (typically behind an `Arc`) with every in-flight dispatch.
//! There is no write path after `build()`, so concurrent lookups need no
//! locking; reconfiguring handlers requires a process restart.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::context::{ContextKind, MessageContext};
use crate::error::{Result, RouteError};
use crate::handler::descriptor::{HandlerDescriptor, HandlerOptions, MessageHandler};

/// Ordered collection of registered handler descriptors.
///
/// Registration order is preserved and observable through
/// [`descriptors`](Self::descriptors), but it is *not* a resolution rule:
/// a message matching more than one descriptor is rejected as ambiguous
/// at dispatch time, never resolved first-registered-wins.
#[derive(Default)]
pub struct HandlerRegistry {
    descriptors: Vec<Arc<HandlerDescriptor>>,
}

impl HandlerRegistry {
    /// Start building a registry.
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// The registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[Arc<HandlerDescriptor>] {
        &self.descriptors
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    fn register(&mut self, descriptor: HandlerDescriptor) -> Result<()> {
        if descriptor.name().is_empty() {
            return Err(RouteError::InvalidRegistration(
                "handler name must not be empty".to_string(),
            ));
        }

        // Registering the identical descriptor twice (same identity and
        // types, nothing to tell the copies apart) is detectable right
        // here; reject it before dispatch ever runs. Distinct handlers
        // that happen to overlap are only decidable per message and
        // surface as an ambiguous match at dispatch time.
        if !descriptor.is_distinguishable()
            && self.descriptors.iter().any(|d| {
                !d.is_distinguishable()
                    && d.name() == descriptor.name()
                    && d.message_type() == descriptor.message_type()
                    && d.context_tag() == descriptor.context_tag()
            })
        {
            return Err(RouteError::DuplicateHandler(format!(
                "'{}' is already registered for {} in context {} with no distinguishing \
                 filter or serializer",
                descriptor.name(),
                descriptor.message_type(),
                descriptor.context_tag(),
            )));
        }

        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}

/// Builder for configuring a [`HandlerRegistry`].
///
/// Registration methods return `Result` because a structurally invalid
/// descriptor is fatal to startup: the process must not begin dispatching
/// with a malformed registry.
///
/// # Example
///
/// ```ignore
/// let registry = HandlerRegistry::builder()
///     .with_handler("orders", OrderHandler::default())?
///     .with_context_handler::<ShipmentNotice, QueueContext, _>(
///         "shipments",
///         ShipmentHandler::default(),
///     )?
///     .build();
/// ```
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registry: HandlerRegistry,
}

impl HandlerRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::default(),
        }
    }

    /// Register a handler declared against the base context.
    pub fn with_handler<M, H>(self, name: &str, handler: H) -> Result<Self>
    where
        M: DeserializeOwned + Send + 'static,
        H: MessageHandler<M, MessageContext> + 'static,
    {
        self.with_handler_opts(name, handler, HandlerOptions::new())
    }

    /// Register a handler declared against the base context, with filters
    /// and/or a custom serializer.
    pub fn with_handler_opts<M, H>(
        mut self,
        name: &str,
        handler: H,
        options: HandlerOptions<M, MessageContext>,
    ) -> Result<Self>
    where
        M: DeserializeOwned + Send + 'static,
        H: MessageHandler<M, MessageContext> + 'static,
    {
        self.registry
            .register(HandlerDescriptor::for_base_context(name, handler, options))?;
        Ok(self)
    }

    /// Register a handler declared against a concrete context shape.
    pub fn with_context_handler<M, C, H>(self, name: &str, handler: H) -> Result<Self>
    where
        M: DeserializeOwned + Send + 'static,
        C: ContextKind,
        H: MessageHandler<M, C> + 'static,
    {
        self.with_context_handler_opts(name, handler, HandlerOptions::new())
    }

    /// Register a handler declared against a concrete context shape, with
    /// filters and/or a custom serializer.
    pub fn with_context_handler_opts<M, C, H>(
        mut self,
        name: &str,
        handler: H,
        options: HandlerOptions<M, C>,
    ) -> Result<Self>
    where
        M: DeserializeOwned + Send + 'static,
        C: ContextKind,
        H: MessageHandler<M, C> + 'static,
    {
        self.registry
            .register(HandlerDescriptor::for_context(name, handler, options))?;
        Ok(self)
    }

    /// Finish building. The returned registry is read-only.
    pub fn build(self) -> HandlerRegistry {
        self.registry
    }
}
