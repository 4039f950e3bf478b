//! Integration tests for routewire.
//!
//! These tests exercise the full path: registry construction, matching,
//! body deserialization, filter evaluation, and handler invocation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use routewire::serializer::{JsonBodySerializer, MsgPackBodySerializer};
use routewire::{
    async_trait, CancellationToken, ContextKind, ContextTag, CorrelationInfo, DispatchOutcome,
    Dispatcher, HandlerOptions, HandlerRegistry, MessageContext, MessageHandler, RawMessage,
    TransportContext,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Order {
    id: String,
    amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ShipmentNotice {
    tracking: String,
}

/// Handler that records every invocation together with the correlation
/// info it observed.
#[derive(Default)]
struct RecordingHandler {
    invocations: Mutex<Vec<(Order, CorrelationInfo)>>,
}

impl RecordingHandler {
    fn invocations(&self) -> Vec<(Order, CorrelationInfo)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler<Order> for RecordingHandler {
    async fn process_message(
        &self,
        message: Order,
        _context: &MessageContext,
        correlation: &CorrelationInfo,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.invocations
            .lock()
            .unwrap()
            .push((message, correlation.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct FailingHandler;

#[async_trait]
impl MessageHandler<Order> for FailingHandler {
    async fn process_message(
        &self,
        _message: Order,
        _context: &MessageContext,
        _correlation: &CorrelationInfo,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        anyhow::bail!("order rejected by business rule")
    }
}

#[derive(Default)]
struct CountingShipmentHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl MessageHandler<ShipmentNotice> for CountingShipmentHandler {
    async fn process_message(
        &self,
        _message: ShipmentNotice,
        _context: &MessageContext,
        _correlation: &CorrelationInfo,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn json_message(order: &Order) -> RawMessage {
    RawMessage::new(JsonBodySerializer::<Order>::encode(order).unwrap())
        .with_content_type("application/json")
}

fn dispatch_inputs() -> (MessageContext, CorrelationInfo, CancellationToken) {
    (
        MessageContext::new("message-1"),
        CorrelationInfo::new("op-1", "txn-1"),
        CancellationToken::new(),
    )
}

/// Scenario A: one descriptor, no filters, valid JSON body. The handler
/// completes and receives the original pre-serialization value.
#[tokio::test]
async fn unique_match_completes_with_roundtripped_body() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let (context, correlation, cancel) = dispatch_inputs();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    assert!(outcome.is_completed());
    let invocations = handler.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, order);
}

/// Scenario B: two distinct descriptors both targeting `Order` with no
/// filters. Any order-shaped message is a configuration error listing
/// both identities, and neither handler runs.
#[tokio::test]
async fn overlapping_handlers_yield_configuration_error() {
    let first = Arc::new(RecordingHandler::default());
    let second = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders-a", Arc::clone(&first))
        .unwrap()
        .with_handler::<Order, _>("orders-b", Arc::clone(&second))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let (context, correlation, cancel) = dispatch_inputs();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    match outcome {
        DispatchOutcome::ConfigurationError { conflicting } => {
            assert_eq!(conflicting, vec!["orders-a", "orders-b"]);
        }
        other => panic!("expected ConfigurationError, got {other:?}"),
    }
    assert!(first.invocations().is_empty());
    assert!(second.invocations().is_empty());
}

/// Scenario C: a body filter narrows the handler away; the message is
/// unhandled, not an error.
#[tokio::test]
async fn body_filter_rejection_is_unhandled() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler_opts(
            "large-orders",
            Arc::clone(&handler),
            HandlerOptions::new().body_filter(|order: &Order| order.amount > 100),
        )
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 50,
    };
    let (context, correlation, cancel) = dispatch_inputs();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    assert!(matches!(outcome, DispatchOutcome::Unhandled));
    assert!(handler.invocations().is_empty());
}

/// Scenario D: a token cancelled before dispatch short-circuits without
/// invoking anything, regardless of registry contents.
#[tokio::test]
async fn pre_cancelled_dispatch_invokes_nothing() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let (context, correlation, cancel) = dispatch_inputs();
    cancel.cancel();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    assert!(matches!(outcome, DispatchOutcome::Cancelled));
    assert!(handler.invocations().is_empty());
}

/// A body no registered handler can deserialize is unhandled and no
/// handler executes.
#[tokio::test]
async fn undeserializable_body_is_unhandled() {
    let orders = Arc::new(RecordingHandler::default());
    let shipments = Arc::new(CountingShipmentHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&orders))
        .unwrap()
        .with_handler::<ShipmentNotice, _>("shipments", Arc::clone(&shipments))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let (context, correlation, cancel) = dispatch_inputs();
    let outcome = dispatcher
        .dispatch(
            &RawMessage::new(&br#"{"neither":"shape"}"#[..]),
            &context,
            &correlation,
            &cancel,
        )
        .await;

    assert!(matches!(outcome, DispatchOutcome::Unhandled));
    assert!(orders.invocations().is_empty());
    assert_eq!(shipments.calls.load(Ordering::SeqCst), 0);
}

/// Handler failures propagate verbatim, distinct from routing outcomes.
#[tokio::test]
async fn handler_failure_preserves_cause() {
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", FailingHandler)
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let (context, correlation, cancel) = dispatch_inputs();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    match outcome {
        DispatchOutcome::HandlerFailed(cause) => {
            assert!(cause.to_string().contains("order rejected by business rule"));
        }
        other => panic!("expected HandlerFailed, got {other:?}"),
    }
}

/// Within one dispatch, the handler observes exactly the correlation
/// instance passed in.
#[tokio::test]
async fn correlation_is_passed_through_unchanged() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let context = MessageContext::new("message-1");
    let correlation = CorrelationInfo::new("op-9", "txn-9")
        .with_operation_parent_id("op-8")
        .with_cycle_id("cycle-1");
    let cancel = CancellationToken::new();

    dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    let invocations = handler.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].1, correlation);
}

/// Re-dispatching the same immutable inputs against the same registry
/// yields the same outcome kind (pure handler).
#[tokio::test]
async fn dispatch_is_idempotent_for_pure_handlers() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let message = json_message(&order);
    let (context, correlation, cancel) = dispatch_inputs();

    let first = dispatcher
        .dispatch(&message, &context, &correlation, &cancel)
        .await;
    let second = dispatcher
        .dispatch(&message, &context, &correlation, &cancel)
        .await;

    assert!(first.is_completed());
    assert!(second.is_completed());
    assert_eq!(handler.invocations().len(), 2);
}

// --- context refinement ---

struct QueueContext {
    base: MessageContext,
    queue_name: String,
}

impl ContextKind for QueueContext {
    const TAG: ContextTag = ContextTag("integration.queue-context");
}

impl TransportContext for QueueContext {
    fn base(&self) -> &MessageContext {
        &self.base
    }

    fn satisfied_tags(&self) -> &'static [ContextTag] {
        &[QueueContext::TAG, MessageContext::TAG]
    }

    fn project(&self, tag: ContextTag) -> Option<&dyn std::any::Any> {
        if tag == QueueContext::TAG {
            Some(self)
        } else if tag == MessageContext::TAG {
            Some(self.base())
        } else {
            None
        }
    }
}

#[derive(Default)]
struct QueueOrderHandler {
    seen_queues: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageHandler<Order, QueueContext> for QueueOrderHandler {
    async fn process_message(
        &self,
        _message: Order,
        context: &QueueContext,
        _correlation: &CorrelationInfo,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.seen_queues
            .lock()
            .unwrap()
            .push(context.queue_name.clone());
        Ok(())
    }
}

/// A handler declared against the base context matches a refined context.
#[tokio::test]
async fn base_handler_matches_refined_context() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let context = QueueContext {
        base: MessageContext::new("message-1"),
        queue_name: "orders-queue".to_string(),
    };
    let correlation = CorrelationInfo::new("op-1", "txn-1");
    let cancel = CancellationToken::new();

    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;

    assert!(outcome.is_completed());
    assert_eq!(handler.invocations().len(), 1);
}

/// A handler declared against a refined context does not match the base
/// context, and receives the refined shape when it does match.
#[tokio::test]
async fn refined_handler_requires_refined_context() {
    let handler = Arc::new(QueueOrderHandler::default());
    let registry = HandlerRegistry::builder()
        .with_context_handler::<Order, QueueContext, _>("queue-orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let correlation = CorrelationInfo::new("op-1", "txn-1");
    let cancel = CancellationToken::new();

    // Base context does not satisfy the queue tag.
    let outcome = dispatcher
        .dispatch(
            &json_message(&order),
            &MessageContext::new("message-1"),
            &correlation,
            &cancel,
        )
        .await;
    assert!(matches!(outcome, DispatchOutcome::Unhandled));

    // A queue context matches and projects to the declared shape.
    let context = QueueContext {
        base: MessageContext::new("message-2"),
        queue_name: "orders-queue".to_string(),
    };
    let outcome = dispatcher
        .dispatch(&json_message(&order), &context, &correlation, &cancel)
        .await;
    assert!(outcome.is_completed());
    assert_eq!(
        *handler.seen_queues.lock().unwrap(),
        vec!["orders-queue".to_string()]
    );
}

/// A context filter over the refined shape narrows matching further.
#[tokio::test]
async fn refined_context_filter_narrows_matching() {
    let handler = Arc::new(QueueOrderHandler::default());
    let registry = HandlerRegistry::builder()
        .with_context_handler_opts(
            "priority-orders",
            Arc::clone(&handler),
            HandlerOptions::new().context_filter(|ctx: &QueueContext| ctx.queue_name == "priority"),
        )
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let correlation = CorrelationInfo::new("op-1", "txn-1");
    let cancel = CancellationToken::new();

    let bulk = QueueContext {
        base: MessageContext::new("message-1"),
        queue_name: "bulk".to_string(),
    };
    let outcome = dispatcher
        .dispatch(&json_message(&order), &bulk, &correlation, &cancel)
        .await;
    assert!(matches!(outcome, DispatchOutcome::Unhandled));

    let priority = QueueContext {
        base: MessageContext::new("message-2"),
        queue_name: "priority".to_string(),
    };
    let outcome = dispatcher
        .dispatch(&json_message(&order), &priority, &correlation, &cancel)
        .await;
    assert!(outcome.is_completed());
}

/// A custom MessagePack serializer routes a binary body to its handler
/// while the JSON default excludes the other candidates.
#[tokio::test]
async fn custom_serializer_routes_binary_body() {
    let orders = Arc::new(RecordingHandler::default());
    let shipments = Arc::new(CountingShipmentHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler_opts(
            "orders-msgpack",
            Arc::clone(&orders),
            HandlerOptions::new().serializer(MsgPackBodySerializer::<Order>::new()),
        )
        .unwrap()
        .with_handler::<ShipmentNotice, _>("shipments", Arc::clone(&shipments))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let order = Order {
        id: "42".to_string(),
        amount: 250,
    };
    let body = MsgPackBodySerializer::<Order>::encode(&order).unwrap();
    let message = RawMessage::new(body).with_content_type("application/msgpack");
    let (context, correlation, cancel) = dispatch_inputs();

    let outcome = dispatcher
        .dispatch(&message, &context, &correlation, &cancel)
        .await;

    assert!(outcome.is_completed());
    let invocations = orders.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, order);
    assert_eq!(shipments.calls.load(Ordering::SeqCst), 0);
}

/// Concurrent dispatches over the same shared registry do not interfere;
/// each observes its own correlation info.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatches_keep_correlation_isolated() {
    let handler = Arc::new(RecordingHandler::default());
    let registry = HandlerRegistry::builder()
        .with_handler::<Order, _>("orders", Arc::clone(&handler))
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let order = Order {
                id: format!("order-{i}"),
                amount: i,
            };
            let message = json_message(&order);
            let context = MessageContext::new(format!("message-{i}"));
            let correlation = CorrelationInfo::new(format!("op-{i}"), format!("txn-{i}"));
            let cancel = CancellationToken::new();

            let outcome = dispatcher
                .dispatch(&message, &context, &correlation, &cancel)
                .await;
            assert!(outcome.is_completed());
            (order, correlation)
        }));
    }

    let mut expected = Vec::new();
    for task in tasks {
        expected.push(task.await.unwrap());
    }

    let mut invocations = handler.invocations();
    invocations.sort_by(|a, b| a.0.id.cmp(&b.0.id));
    let mut expected_sorted = expected.clone();
    expected_sorted.sort_by(|a, b| a.0.id.cmp(&b.0.id));

    assert_eq!(invocations.len(), 16);
    for ((order, correlation), (expected_order, expected_correlation)) in
        invocations.iter().zip(expected_sorted.iter())
    {
        assert_eq!(order, expected_order);
        assert_eq!(correlation, expected_correlation);
    }
}
