//! Request identity.
//!
//! Several requests for the same slice may be in flight at once. Each start
//! action takes a fresh [`RequestId`] from the environment and the slice
//! remembers it; a response carrying any other id is stale and is dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one asynchronous request (a generation number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw generation number
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw generation number
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Source of request ids, injected through the environment.
pub trait RequestIdSource: Send + Sync {
    /// Allocate the next request id
    fn next_request_id(&self) -> RequestId;
}

/// Monotonic request ids starting at 1.
#[derive(Debug, Default)]
pub struct SequentialRequestIds {
    last: AtomicU64,
}

impl SequentialRequestIds {
    /// Create a source whose first id is `req-1`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }
}

impl RequestIdSource for SequentialRequestIds {
    fn next_request_id(&self) -> RequestId {
        RequestId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_start_at_one() {
        let ids = SequentialRequestIds::new();
        assert_eq!(ids.next_request_id(), RequestId::new(1));
        assert_eq!(ids.next_request_id(), RequestId::new(2));
        assert_eq!(RequestId::new(2).to_string(), "req-2");
    }
}
