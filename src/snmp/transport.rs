//! Transport layer abstraction.
//!
//! The transport owns sockets, message encoding, timeouts, retries, and v3
//! security processing. The session hands it a request [`Pdu`] and gets back
//! the decoded [`PduResponse`] for the matching request id.

use std::future::Future;

use crate::error::Result;
use crate::snmp::pdu::{Pdu, PduResponse};

/// Client-side transport abstraction.
///
/// # Clone Requirement
///
/// The `Clone` bound is required because walk streams own a clone of the
/// session (and thus the transport). This enables concurrent walks without
/// borrow conflicts. Implementations are expected to use `Arc` internally,
/// making clone cheap.
pub trait Transport: Send + Sync + Clone {
    /// Perform one request/response round trip.
    fn call(&self, request: Pdu) -> impl Future<Output = Result<PduResponse>> + Send;
}

#[cfg(any(test, feature = "testing"))]
mod mock {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::error::{Error, Result};
    use crate::snmp::pdu::{Pdu, PduResponse};

    use super::Transport;

    /// Scripted transport for tests.
    ///
    /// Responses are queued up front and consumed in order, one per `call`.
    /// Every request is recorded so tests can assert on the exact PDUs sent.
    #[derive(Clone)]
    pub struct MockTransport {
        inner: Arc<Mutex<MockInner>>,
    }

    struct MockInner {
        script: VecDeque<Result<PduResponse>>,
        requests: Vec<Pdu>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(MockInner {
                    script: VecDeque::new(),
                    requests: Vec::new(),
                })),
            }
        }

        /// Queue a successful response.
        pub fn queue_response(&self, response: PduResponse) {
            self.lock().script.push_back(Ok(response));
        }

        /// Queue an error outcome for the next call.
        pub fn queue_error(&self, error: Error) {
            self.lock().script.push_back(Err(error));
        }

        /// All requests sent so far, in order.
        pub fn requests(&self) -> Vec<Pdu> {
            self.lock().requests.clone()
        }

        pub fn request_count(&self) -> usize {
            self.lock().requests.len()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
            match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for MockTransport {
        async fn call(&self, request: Pdu) -> Result<PduResponse> {
            let mut inner = self.lock();
            inner.requests.push(request);
            // An exhausted script behaves like an unresponsive agent.
            inner.script.pop_front().unwrap_or(Err(Error::Timeout {
                elapsed: Duration::ZERO,
                retries: 0,
            }))
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub use mock::MockTransport;
