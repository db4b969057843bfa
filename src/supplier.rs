// Supplier identities, the abstract wire contract, and the typed shapes both
// live and mock suppliers speak.
//
// Both integrated suppliers expose the same protocol family: an OAuth2 token
// endpoint (credential exchange and refresh-token exchange) plus asynchronous
// job endpoints where initiate returns a job id and a single polling endpoint
// answers either "still pending" or the terminal payload.

use crate::error::SupplierCallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The external content providers this gateway integrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Supplier {
    Flights,
    Hotels,
}

impl fmt::Display for Supplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Supplier::Flights => write!(f, "flights"),
            Supplier::Hotels => write!(f, "hotels"),
        }
    }
}

/// Operation families sharing the initiate/poll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Search,
    Pricing,
    Booking,
}

impl Flow {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Flow::Search => "search",
            Flow::Pricing => "pricing",
            Flow::Booking => "booking",
        }
    }
}

/// Response of the OAuth2 token endpoint, for both credential exchange and
/// refresh-token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in_seconds: u64,
}

/// Response of an initiate call: the supplier-assigned job id (sId/bId) used
/// as the polling key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateReply {
    pub job_id: String,
}

/// One answer from the shared polling endpoint.
#[derive(Debug, Clone)]
pub enum PollReply {
    Pending,
    Complete(Value),
}

/// Abstract supplier wire contract. The live implementation is
/// [`crate::http::HttpSupplierApi`]; tests substitute a scripted mock.
#[async_trait]
pub trait SupplierApi: Send + Sync {
    /// Full credential exchange.
    async fn login(&self) -> Result<TokenGrant, SupplierCallError>;

    /// Refresh-token exchange.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, SupplierCallError>;

    /// Start an asynchronous job; returns the supplier-assigned id.
    async fn initiate(
        &self,
        flow: Flow,
        bearer: &str,
        criteria: &Value,
    ) -> Result<InitiateReply, SupplierCallError>;

    /// One status check against the polling endpoint.
    async fn poll(
        &self,
        flow: Flow,
        bearer: &str,
        job_id: &str,
    ) -> Result<PollReply, SupplierCallError>;
}

// Scripted supplier for tests, in the spirit of an embedded mock server:
// queue up per-endpoint outcomes, count every call.
#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TokenResult = Result<TokenGrant, SupplierCallError>;
    type InitiateResult = Result<InitiateReply, SupplierCallError>;
    type PollResult = Result<PollReply, SupplierCallError>;

    pub struct MockSupplier {
        pub login_calls: AtomicUsize,
        pub refresh_calls: AtomicUsize,
        pub initiate_calls: AtomicUsize,
        pub poll_calls: AtomicUsize,
        login_queue: Mutex<VecDeque<TokenResult>>,
        refresh_queue: Mutex<VecDeque<TokenResult>>,
        initiate_queue: Mutex<VecDeque<InitiateResult>>,
        poll_queue: Mutex<VecDeque<PollResult>>,
    }

    impl MockSupplier {
        pub fn new() -> Self {
            Self {
                login_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                initiate_calls: AtomicUsize::new(0),
                poll_calls: AtomicUsize::new(0),
                login_queue: Mutex::new(VecDeque::new()),
                refresh_queue: Mutex::new(VecDeque::new()),
                initiate_queue: Mutex::new(VecDeque::new()),
                poll_queue: Mutex::new(VecDeque::new()),
            }
        }

        pub fn grant(access: &str, refresh: Option<&str>, expires_in: u64) -> TokenGrant {
            TokenGrant {
                access_token: access.to_string(),
                refresh_token: refresh.map(str::to_string),
                expires_in_seconds: expires_in,
            }
        }

        pub fn queue_login(&self, result: TokenResult) {
            self.login_queue.lock().push_back(result);
        }

        pub fn queue_refresh(&self, result: TokenResult) {
            self.refresh_queue.lock().push_back(result);
        }

        pub fn queue_initiate(&self, result: InitiateResult) {
            self.initiate_queue.lock().push_back(result);
        }

        pub fn queue_poll(&self, result: PollResult) {
            self.poll_queue.lock().push_back(result);
        }

        pub fn total_calls(&self) -> usize {
            self.login_calls.load(Ordering::SeqCst)
                + self.refresh_calls.load(Ordering::SeqCst)
                + self.initiate_calls.load(Ordering::SeqCst)
                + self.poll_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SupplierApi for MockSupplier {
        async fn login(&self) -> TokenResult {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.login_queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::grant("access-default", Some("refresh-default"), 3600)))
        }

        async fn refresh(&self, _refresh_token: &str) -> TokenResult {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refresh_queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::grant("access-refreshed", Some("refresh-next"), 3600)))
        }

        async fn initiate(&self, _flow: Flow, _bearer: &str, _criteria: &Value) -> InitiateResult {
            self.initiate_calls.fetch_add(1, Ordering::SeqCst);
            self.initiate_queue.lock().pop_front().unwrap_or_else(|| {
                Ok(InitiateReply {
                    job_id: "job-1".to_string(),
                })
            })
        }

        async fn poll(&self, _flow: Flow, _bearer: &str, _job_id: &str) -> PollResult {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.poll_queue
                .lock()
                .pop_front()
                .unwrap_or(Ok(PollReply::Pending))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn queued_outcomes_are_consumed_in_order_then_defaults_apply() {
            let mock = MockSupplier::new();
            mock.queue_initiate(Ok(InitiateReply {
                job_id: "sId-queued".to_string(),
            }));

            let first = tokio_test::block_on(mock.initiate(
                Flow::Search,
                "bearer",
                &json!({}),
            ))
            .unwrap();
            let second = tokio_test::block_on(mock.initiate(
                Flow::Search,
                "bearer",
                &json!({}),
            ))
            .unwrap();

            assert_eq!(first.job_id, "sId-queued");
            assert_eq!(second.job_id, "job-1");
            assert_eq!(mock.initiate_calls.load(Ordering::SeqCst), 2);
            assert_eq!(mock.total_calls(), 2);
        }
    }
}
