// Error taxonomy for the gateway.
//
// Only authentication failure is a hard, caller-visible error: it means the
// configured credentials are wrong and an operator has to act. Rate limiting
// and outages are expected operating states and are absorbed into fallback
// data or a TimedOut session status before they reach the caller.

use thiserror::Error;

/// Caller-facing errors surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("supplier authentication failed for {supplier}: {reason}")]
    AuthenticationFailed { supplier: String, reason: String },

    #[error("supplier {supplier} unavailable: {reason}")]
    SupplierUnavailable { supplier: String, reason: String },
}

/// Wire-level failures from a single supplier call. Internal to the gateway;
/// the orchestrator decides which of these become fallback data, a timed-out
/// session, or a surfaced error.
#[derive(Error, Debug)]
pub enum SupplierCallError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("capacity exceeded")]
    RateLimited { retry_after: Option<String> },

    #[error("credentials rejected: {0}")]
    AuthRejected(String),

    #[error("unexpected response: {status} - {message}")]
    UnexpectedResponse { status: u16, message: String },
}
