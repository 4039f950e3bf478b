//! Raw inbound message as delivered by the pump.

use std::collections::HashMap;

use bytes::Bytes;

/// A raw inbound message: body bytes plus transport metadata.
///
/// The core never mutates a `RawMessage`. Deserialization reads the body
/// and produces a new typed value; transport metadata is an opaque string
/// map the core carries but does not interpret.
#[derive(Debug, Clone)]
pub struct RawMessage {
    body: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
}

impl RawMessage {
    /// Create a message from body bytes.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the declared content type (e.g. `application/json`).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach a transport metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The message body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The declared content type, if the transport supplied one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Transport metadata entries.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}
