//! Handler descriptors and the type-erasure wrappers behind them.
//!
//! Handlers are written against concrete message and context types; the
//! registry stores them uniformly. A [`HandlerDescriptor`] captures the
//! typed pieces of one registration behind erased closures: the
//! deserialization chain for the message type, the optional filters, and
//! the invoker that downcasts and calls the handler.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::context::{ContextKind, ContextTag, MessageContext, TransportContext};
use crate::correlation::CorrelationInfo;
use crate::message::RawMessage;
use crate::serializer::{deserialize_chain, BodyAttempt, BodySerializer};

/// Boxed future for erased handler invocation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The capability a message handler implements.
///
/// `M` is the deserialized message type, `C` the context shape the
/// handler needs (defaults to the transport-agnostic base). The handler
/// receives the correlation info created for this message by the pump and
/// a cancellation token it should observe during long-running work.
///
/// Returning an error does not trigger a retry inside this core; the
/// dispatcher surfaces it verbatim so the pump can apply its own policy.
#[async_trait]
pub trait MessageHandler<M, C = MessageContext>: Send + Sync
where
    M: Send + 'static,
    C: TransportContext,
{
    /// Process one deserialized message.
    async fn process_message(
        &self,
        message: M,
        context: &C,
        correlation: &CorrelationInfo,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, M, C> MessageHandler<M, C> for Arc<T>
where
    T: MessageHandler<M, C> + ?Sized,
    M: Send + 'static,
    C: TransportContext,
{
    async fn process_message(
        &self,
        message: M,
        context: &C,
        correlation: &CorrelationInfo,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        (**self)
            .process_message(message, context, correlation, cancel)
            .await
    }
}

/// Optional registration settings for one handler.
///
/// Absent filters are treated as "always true". A custom serializer is
/// tried before the default JSON fallback (see the serializer module for
/// the chain semantics).
pub struct HandlerOptions<M, C = MessageContext> {
    pub(crate) body_filter: Option<Box<dyn Fn(&M) -> bool + Send + Sync>>,
    pub(crate) context_filter: Option<Box<dyn Fn(&C) -> bool + Send + Sync>>,
    pub(crate) serializer: Option<Arc<dyn BodySerializer>>,
}

impl<M, C> HandlerOptions<M, C> {
    /// Create empty options (no filters, default serializer chain).
    pub fn new() -> Self {
        Self {
            body_filter: None,
            context_filter: None,
            serializer: None,
        }
    }

    /// Restrict the handler to messages whose deserialized body passes
    /// the predicate.
    pub fn body_filter(mut self, filter: impl Fn(&M) -> bool + Send + Sync + 'static) -> Self {
        self.body_filter = Some(Box::new(filter));
        self
    }

    /// Restrict the handler to contexts passing the predicate.
    pub fn context_filter(mut self, filter: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        self.context_filter = Some(Box::new(filter));
        self
    }

    /// Attach a custom body serializer, tried before the JSON fallback.
    pub fn serializer(mut self, serializer: impl BodySerializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }
}

impl<M, C> Default for HandlerOptions<M, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Erased invocation surface, one impl per registration flavor.
trait ErasedInvoke: Send + Sync {
    fn invoke<'a>(
        &'a self,
        body: Box<dyn Any + Send>,
        context: &'a dyn TransportContext,
        correlation: &'a CorrelationInfo,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Invoker for handlers declared against the base context.
///
/// Any context variant satisfies the base tag, so the invoker reads the
/// base fields instead of downcasting.
struct BaseInvoker<H, M> {
    handler: H,
    _marker: PhantomData<fn(M)>,
}

impl<H, M> ErasedInvoke for BaseInvoker<H, M>
where
    H: MessageHandler<M, MessageContext> + 'static,
    M: Send + 'static,
{
    fn invoke<'a>(
        &'a self,
        body: Box<dyn Any + Send>,
        context: &'a dyn TransportContext,
        correlation: &'a CorrelationInfo,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let message = body
                .downcast::<M>()
                .map_err(|_| anyhow::anyhow!("message body type mismatch during invocation"))?;
            self.handler
                .process_message(*message, context.base(), correlation, cancel)
                .await
        })
    }
}

/// Invoker for handlers declared against a concrete context shape.
struct ContextBoundInvoker<H, M, C> {
    handler: H,
    _marker: PhantomData<fn(M, C)>,
}

impl<H, M, C> ErasedInvoke for ContextBoundInvoker<H, M, C>
where
    H: MessageHandler<M, C> + 'static,
    M: Send + 'static,
    C: ContextKind,
{
    fn invoke<'a>(
        &'a self,
        body: Box<dyn Any + Send>,
        context: &'a dyn TransportContext,
        correlation: &'a CorrelationInfo,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let message = body
                .downcast::<M>()
                .map_err(|_| anyhow::anyhow!("message body type mismatch during invocation"))?;
            let context = context
                .project(C::TAG)
                .and_then(|any| any.downcast_ref::<C>())
                .ok_or_else(|| {
                    anyhow::anyhow!("context does not project to required shape {}", C::TAG)
                })?;
            self.handler
                .process_message(*message, context, correlation, cancel)
                .await
        })
    }
}

/// One registered handler: message type, context tag, filters, serializer
/// chain, and the erased invoker. Immutable once registered.
pub struct HandlerDescriptor {
    name: String,
    message_type: &'static str,
    context_tag: ContextTag,
    has_body_filter: bool,
    has_context_filter: bool,
    has_serializer: bool,
    deserialize: Box<dyn Fn(&RawMessage) -> BodyAttempt + Send + Sync>,
    body_filter: Option<Box<dyn Fn(&dyn Any) -> bool + Send + Sync>>,
    context_filter: Option<Box<dyn Fn(&dyn TransportContext) -> bool + Send + Sync>>,
    invoker: Box<dyn ErasedInvoke>,
}

impl HandlerDescriptor {
    /// Build a descriptor for a handler declared against the base context.
    pub(crate) fn for_base_context<M, H>(
        name: impl Into<String>,
        handler: H,
        options: HandlerOptions<M, MessageContext>,
    ) -> Self
    where
        M: DeserializeOwned + Send + 'static,
        H: MessageHandler<M, MessageContext> + 'static,
    {
        let HandlerOptions {
            body_filter,
            context_filter,
            serializer,
        } = options;

        Self {
            name: name.into(),
            message_type: std::any::type_name::<M>(),
            context_tag: MessageContext::TAG,
            has_body_filter: body_filter.is_some(),
            has_context_filter: context_filter.is_some(),
            has_serializer: serializer.is_some(),
            deserialize: erase_chain::<M>(serializer),
            body_filter: body_filter.map(erase_body_filter::<M>),
            context_filter: context_filter.map(|filter| {
                Box::new(move |ctx: &dyn TransportContext| filter(ctx.base()))
                    as Box<dyn Fn(&dyn TransportContext) -> bool + Send + Sync>
            }),
            invoker: Box::new(BaseInvoker {
                handler,
                _marker: PhantomData,
            }),
        }
    }

    /// Build a descriptor for a handler declared against a concrete
    /// context shape.
    pub(crate) fn for_context<M, C, H>(
        name: impl Into<String>,
        handler: H,
        options: HandlerOptions<M, C>,
    ) -> Self
    where
        M: DeserializeOwned + Send + 'static,
        C: ContextKind,
        H: MessageHandler<M, C> + 'static,
    {
        let HandlerOptions {
            body_filter,
            context_filter,
            serializer,
        } = options;

        Self {
            name: name.into(),
            message_type: std::any::type_name::<M>(),
            context_tag: C::TAG,
            has_body_filter: body_filter.is_some(),
            has_context_filter: context_filter.is_some(),
            has_serializer: serializer.is_some(),
            deserialize: erase_chain::<M>(serializer),
            body_filter: body_filter.map(erase_body_filter::<M>),
            context_filter: context_filter.map(|filter| {
                Box::new(move |ctx: &dyn TransportContext| {
                    ctx.project(C::TAG)
                        .and_then(|any| any.downcast_ref::<C>())
                        .is_some_and(|c| filter(c))
                }) as Box<dyn Fn(&dyn TransportContext) -> bool + Send + Sync>
            }),
            invoker: Box::new(ContextBoundInvoker::<H, M, C> {
                handler,
                _marker: PhantomData,
            }),
        }
    }

    /// Registration name, used in diagnostics and ambiguity reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the message type this handler processes.
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Context tag this handler requires.
    pub fn context_tag(&self) -> ContextTag {
        self.context_tag
    }

    /// Whether anything beyond type identity narrows this registration.
    /// Two indistinguishable descriptors for the same types can never be
    /// disambiguated at dispatch time, so registration rejects the pair.
    pub(crate) fn is_distinguishable(&self) -> bool {
        self.has_body_filter || self.has_context_filter || self.has_serializer
    }

    /// Run this descriptor's deserialization chain.
    pub(crate) fn try_deserialize(&self, message: &RawMessage) -> BodyAttempt {
        (self.deserialize)(message)
    }

    /// Apply the body filter to a deserialized body.
    pub(crate) fn accepts_body(&self, body: &dyn Any) -> bool {
        self.body_filter.as_ref().is_none_or(|filter| filter(body))
    }

    /// Apply the context filter.
    pub(crate) fn accepts_context(&self, context: &dyn TransportContext) -> bool {
        self.context_filter
            .as_ref()
            .is_none_or(|filter| filter(context))
    }

    /// Invoke the handler with an already deserialized body.
    pub(crate) fn invoke<'a>(
        &'a self,
        body: Box<dyn Any + Send>,
        context: &'a dyn TransportContext,
        correlation: &'a CorrelationInfo,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        self.invoker.invoke(body, context, correlation, cancel)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("message_type", &self.message_type)
            .field("context_tag", &self.context_tag)
            .finish_non_exhaustive()
    }
}

fn erase_body_filter<M: 'static>(
    filter: Box<dyn Fn(&M) -> bool + Send + Sync>,
) -> Box<dyn Fn(&dyn Any) -> bool + Send + Sync> {
    Box::new(move |any: &dyn Any| any.downcast_ref::<M>().is_some_and(|m| filter(m)))
}

fn erase_chain<M>(
    serializer: Option<Arc<dyn BodySerializer>>,
) -> Box<dyn Fn(&RawMessage) -> BodyAttempt + Send + Sync>
where
    M: DeserializeOwned + Send + 'static,
{
    Box::new(move |raw: &RawMessage| deserialize_chain::<M>(raw, serializer.as_deref()))
}
