//! Correlation identifiers carried with every inbound message.
//!
//! The pump creates one [`CorrelationInfo`] per message and passes it into
//! [`Dispatcher::dispatch`](crate::Dispatcher::dispatch). The dispatcher
//! hands the same instance to the selected handler; nothing in this crate
//! ever mutates or replaces it, so every read inside one message's
//! processing observes the same values.

use uuid::Uuid;

/// Per-message identifiers used to link distributed processing steps.
///
/// Immutable once constructed. Cloning is cheap and keeps the values;
/// equality compares all four identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationInfo {
    operation_id: String,
    transaction_id: String,
    operation_parent_id: Option<String>,
    cycle_id: String,
}

impl CorrelationInfo {
    /// Create correlation info for one inbound message.
    ///
    /// The cycle id identifies a single processing pass and is generated
    /// here; pumps that receive an upstream cycle id can override it with
    /// [`with_cycle_id`](Self::with_cycle_id).
    pub fn new(operation_id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            transaction_id: transaction_id.into(),
            operation_parent_id: None,
            cycle_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create correlation info with freshly generated operation and
    /// transaction ids, for messages that arrive without upstream
    /// correlation headers.
    pub fn generated() -> Self {
        Self::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string())
    }

    /// Set the parent operation id.
    pub fn with_operation_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.operation_parent_id = Some(parent_id.into());
        self
    }

    /// Override the generated cycle id.
    pub fn with_cycle_id(mut self, cycle_id: impl Into<String>) -> Self {
        self.cycle_id = cycle_id.into();
        self
    }

    /// Id of the logical operation this message belongs to.
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Id of the end-to-end transaction spanning multiple operations.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Id of the operation that caused this one, if any.
    pub fn operation_parent_id(&self) -> Option<&str> {
        self.operation_parent_id.as_deref()
    }

    /// Id of this single processing pass.
    pub fn cycle_id(&self) -> &str {
        &self.cycle_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_cycle_id() {
        let a = CorrelationInfo::new("op-1", "txn-1");
        let b = CorrelationInfo::new("op-1", "txn-1");

        assert_eq!(a.operation_id(), "op-1");
        assert_eq!(a.transaction_id(), "txn-1");
        assert!(a.operation_parent_id().is_none());
        assert_ne!(a.cycle_id(), b.cycle_id());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CorrelationInfo::generated();
        let b = CorrelationInfo::generated();

        assert_ne!(a.operation_id(), b.operation_id());
        assert_ne!(a.transaction_id(), b.transaction_id());
    }

    #[test]
    fn test_builder_overrides() {
        let info = CorrelationInfo::new("op-1", "txn-1")
            .with_operation_parent_id("op-0")
            .with_cycle_id("cycle-9");

        assert_eq!(info.operation_parent_id(), Some("op-0"));
        assert_eq!(info.cycle_id(), "cycle-9");
    }

    #[test]
    fn test_clone_preserves_identity() {
        let info = CorrelationInfo::new("op-1", "txn-1");
        let cloned = info.clone();

        assert_eq!(info, cloned);
    }
}
