//! Message contexts and capability-tag matching.
//!
//! Handlers declare the context shape they need; transports deliver a
//! concrete context variant. Instead of inspecting a runtime type
//! hierarchy, every context declares the tags it satisfies and can
//! project a representation for each of them. A handler declared against
//! [`MessageContext`] therefore matches any refinement, while a handler
//! declared against a queue-specific context only matches contexts that
//! satisfy that tag.
//!
//! # Example
//!
//! ```ignore
//! use routewire::{ContextKind, ContextTag, MessageContext, TransportContext};
//!
//! struct QueueContext {
//!     base: MessageContext,
//!     queue_name: String,
//! }
//!
//! impl ContextKind for QueueContext {
//!     const TAG: ContextTag = ContextTag("my-transport.queue-context");
//! }
//!
//! impl TransportContext for QueueContext {
//!     fn base(&self) -> &MessageContext {
//!         &self.base
//!     }
//!
//!     fn satisfied_tags(&self) -> &'static [ContextTag] {
//!         &[QueueContext::TAG, MessageContext::TAG]
//!     }
//!
//!     fn project(&self, tag: ContextTag) -> Option<&dyn std::any::Any> {
//!         if tag == QueueContext::TAG {
//!             Some(self)
//!         } else if tag == MessageContext::TAG {
//!             Some(self.base())
//!         } else {
//!             None
//!         }
//!     }
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Identifier for a context shape.
///
/// Tags are compared by value, so two crates can interoperate as long as
/// they agree on the tag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextTag(pub &'static str);

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Compile-time tag for a concrete context type, used at registration.
pub trait ContextKind: TransportContext + Sized {
    /// The tag identifying this context shape.
    const TAG: ContextTag;
}

/// Capability surface every context variant implements.
///
/// Implementations must keep `satisfied_tags` and `project` consistent:
/// `project(tag)` returns `Some` exactly for the tags in
/// `satisfied_tags()`, and the returned value downcasts to the concrete
/// type registered under that tag.
pub trait TransportContext: Send + Sync + 'static {
    /// The transport-agnostic base fields.
    fn base(&self) -> &MessageContext;

    /// Tags this context satisfies, most specific first. Always ends with
    /// [`MessageContext::TAG`].
    fn satisfied_tags(&self) -> &'static [ContextTag];

    /// Representation of this context for one of its satisfied tags.
    fn project(&self, tag: ContextTag) -> Option<&dyn Any>;

    /// Whether this context satisfies the given tag.
    fn satisfies(&self, tag: ContextTag) -> bool {
        self.project(tag).is_some()
    }
}

/// The transport-agnostic base context delivered with every message.
#[derive(Debug, Clone)]
pub struct MessageContext {
    message_id: String,
    job_id: Option<String>,
    properties: HashMap<String, String>,
}

impl MessageContext {
    /// Create a context for a message with the given broker message id.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            job_id: None,
            properties: HashMap::new(),
        }
    }

    /// Set the id of the background job this message belongs to.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Attach an application property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The broker message id.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The background job id, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Application properties.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

impl ContextKind for MessageContext {
    const TAG: ContextTag = ContextTag("routewire.message-context");
}

impl TransportContext for MessageContext {
    fn base(&self) -> &MessageContext {
        self
    }

    fn satisfied_tags(&self) -> &'static [ContextTag] {
        &[MessageContext::TAG]
    }

    fn project(&self, tag: ContextTag) -> Option<&dyn Any> {
        (tag == MessageContext::TAG).then_some(self as &dyn Any)
    }
}
