//! Dispatch module - matching and handler invocation.
//!
//! Provides:
//! - [`select`] / [`MatchResult`] - the matcher, a synchronous pure pass
//!   over the registry for one inbound message
//! - [`Dispatcher`] / [`DispatchOutcome`] - single-match enforcement,
//!   exactly-once invocation, and outcome classification

mod dispatcher;
mod selector;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use selector::{select, MatchResult};
