//! Error types for routewire.

use thiserror::Error;

/// Main error type for registration and codec operations.
///
/// Handler failures are deliberately *not* part of this enum: the
/// dispatcher reports them as a [`DispatchOutcome`](crate::DispatchOutcome)
/// variant carrying the original cause, so callers can tell a routing
/// problem from a business-logic failure.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A descriptor structurally identical to an already registered one
    /// (same message type and context tag, neither carrying a filter or
    /// custom serializer) was registered.
    #[error("duplicate handler registration: {0}")]
    DuplicateHandler(String),

    /// A descriptor was rejected at registration time.
    #[error("invalid handler registration: {0}")]
    InvalidRegistration(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
}

/// Result type alias using RouteError.
pub type Result<T> = std::result::Result<T, RouteError>;
