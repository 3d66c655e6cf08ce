//! Chat request registry - tracks the in-flight ask request

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;

/// Identity of one submission attempt. Response handlers compare theirs
/// against the controller's current one and discard themselves on mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Allocate the next request id (process-wide monotonic)
    pub fn next() -> RequestId {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Global registry of in-flight ask requests (keyed by request id)
static IN_FLIGHT_REQUESTS: Lazy<DashMap<RequestId, CancellationToken>> = Lazy::new(DashMap::new);

/// Register a new request and hand back its cancellation token
pub fn register_request(id: RequestId) -> CancellationToken {
    let token = CancellationToken::new();
    IN_FLIGHT_REQUESTS.insert(id, token.clone());
    token
}

/// Remove a request from the registry once its response was handled
pub fn finish_request(id: RequestId) {
    IN_FLIGHT_REQUESTS.remove(&id);
}

/// Cancel and remove a request. Returns false if it already finished.
pub fn cancel_request(id: RequestId) -> bool {
    match IN_FLIGHT_REQUESTS.remove(&id) {
        Some((_, token)) => {
            token.cancel();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cancel_fires_the_token() {
        let id = RequestId::next();
        let token = register_request(id);

        assert!(!token.is_cancelled());
        assert!(cancel_request(id));
        assert!(token.is_cancelled());

        // Already removed
        assert!(!cancel_request(id));
    }

    #[test]
    fn test_finish_removes_without_cancelling() {
        let id = RequestId::next();
        let token = register_request(id);

        finish_request(id);
        assert!(!token.is_cancelled());
        assert!(!cancel_request(id));
    }
}
