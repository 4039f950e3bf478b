//! Handler module - the handler capability trait, descriptors, and the
//! registry they live in.
//!
//! Provides:
//! - [`MessageHandler`] - the capability a handler implements
//! - [`HandlerDescriptor`] - one registered (message type, context tag,
//!   filters, serializer, handler) tuple
//! - [`HandlerRegistry`] / [`HandlerRegistryBuilder`] - the ordered,
//!   append-only set of descriptors, built once at startup
//!
//! # Example
//!
//! ```ignore
//! use routewire::{HandlerOptions, HandlerRegistry};
//!
//! let registry = HandlerRegistry::builder()
//!     .with_handler("orders", OrderHandler::default())?
//!     .with_handler_opts(
//!         "large-orders",
//!         LargeOrderHandler::default(),
//!         HandlerOptions::new().body_filter(|order: &Order| order.amount > 100),
//!     )?
//!     .build();
//! ```

mod descriptor;
mod registry;

pub use descriptor::{BoxFuture, HandlerDescriptor, HandlerOptions, MessageHandler};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
