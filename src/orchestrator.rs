// Async Search/Price/Book Orchestrator: drives the suppliers' initiate/poll
// protocol and decides which failures degrade to fallback data, which become
// a TimedOut session, and which surface as hard errors.
//
// The asymmetry between flows is deliberate. Search and pricing are
// read-heavy: availability beats correctness, so rate limiting and outages
// are absorbed into the static dataset. A booking silently replaced with
// synthetic data would be a correctness violation, so that flow fails loudly
// instead.

use crate::clock::Clock;
use crate::config::SupplierSettings;
use crate::error::{GatewayError, SupplierCallError};
use crate::fallback::fallback_result;
use crate::markup::{self, MarkupRuleSource};
use crate::rate_limit::RateLimitGuard;
use crate::supplier::{Flow, PollReply, Supplier, SupplierApi};
use crate::token::TokenManager;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Completed,
    TimedOut,
}

/// One asynchronous supplier job. The supplier owns the id; the gateway keeps
/// no record of the session beyond this value, which the caller holds between
/// polls. Abandoning it is the whole cancellation story.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub supplier: Supplier,
    pub flow: Flow,
    pub status: SessionStatus,
    pub criteria: Value,
    /// Set once the session completes; already passed through the markup
    /// engine.
    pub payload: Option<Value>,
    /// True when the payload came from the fallback dataset.
    pub from_fallback: bool,
    polls_used: u32,
}

impl Session {
    pub fn is_terminal(&self) -> bool {
        self.status != SessionStatus::Pending
    }

    pub fn polls_used(&self) -> u32 {
        self.polls_used
    }
}

pub struct Orchestrator {
    supplier: Supplier,
    settings: SupplierSettings,
    api: Arc<dyn SupplierApi>,
    tokens: TokenManager,
    guard: Arc<RateLimitGuard>,
    markup: Arc<dyn MarkupRuleSource>,
}

impl Orchestrator {
    pub fn new(
        supplier: Supplier,
        settings: SupplierSettings,
        api: Arc<dyn SupplierApi>,
        guard: Arc<RateLimitGuard>,
        markup: Arc<dyn MarkupRuleSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenManager::new(supplier, api.clone(), clock);
        Self {
            supplier,
            settings,
            api,
            tokens,
            guard,
            markup,
        }
    }

    pub fn supplier(&self) -> Supplier {
        self.supplier
    }

    /// How long callers should wait between two `poll` calls.
    pub fn poll_interval(&self) -> Duration {
        self.settings.poll_interval
    }

    pub async fn search(&self, criteria: Value) -> Result<Session, GatewayError> {
        self.initiate(Flow::Search, criteria).await
    }

    pub async fn price(&self, criteria: Value) -> Result<Session, GatewayError> {
        self.initiate(Flow::Pricing, criteria).await
    }

    pub async fn book(&self, criteria: Value) -> Result<Session, GatewayError> {
        self.initiate(Flow::Booking, criteria).await
    }

    /// Start an asynchronous job. Returns either a pending session carrying
    /// the supplier-assigned id, or an already-complete fallback session.
    pub async fn initiate(&self, flow: Flow, criteria: Value) -> Result<Session, GatewayError> {
        let degraded = !self.settings.is_configured() || self.guard.is_blocked(self.supplier);

        if degraded {
            if flow == Flow::Booking {
                // Never fabricate a booking confirmation.
                return Err(self.unavailable("supplier blocked or not configured"));
            }
            info!(supplier = %self.supplier, flow = flow.path_segment(), "serving fallback dataset");
            return Ok(self.fallback_session(flow, criteria));
        }

        // Authentication failures propagate from here: they are actionable
        // configuration problems, not an expected operating state.
        let bearer = self.tokens.get_token().await?;

        match self.api.initiate(flow, &bearer, &criteria).await {
            Ok(reply) => {
                debug!(supplier = %self.supplier, flow = flow.path_segment(), job_id = %reply.job_id, "job initiated");
                Ok(Session {
                    id: reply.job_id,
                    supplier: self.supplier,
                    flow,
                    status: SessionStatus::Pending,
                    criteria,
                    payload: None,
                    from_fallback: false,
                    polls_used: 0,
                })
            }
            Err(SupplierCallError::RateLimited { retry_after }) => {
                self.guard
                    .record_block(self.supplier, retry_after.as_deref());
                if flow == Flow::Booking {
                    return Err(self.unavailable("rate limited"));
                }
                warn!(supplier = %self.supplier, "initiate rate-limited, serving fallback dataset");
                Ok(self.fallback_session(flow, criteria))
            }
            Err(SupplierCallError::AuthRejected(reason)) => {
                // The supplier revoked the token mid-flight; drop it so the
                // next call re-authenticates.
                self.tokens.invalidate();
                if flow == Flow::Booking {
                    return Err(self.unavailable(&reason));
                }
                warn!(supplier = %self.supplier, %reason, "token rejected on initiate, serving fallback dataset");
                Ok(self.fallback_session(flow, criteria))
            }
            Err(err) => {
                if flow == Flow::Booking {
                    return Err(self.unavailable(&err.to_string()));
                }
                warn!(supplier = %self.supplier, error = %err, "initiate failed, serving fallback dataset");
                Ok(self.fallback_session(flow, criteria))
            }
        }
    }

    /// One status check. Pending answers consume one poll attempt; once the
    /// configured maximum is spent, the session is TimedOut and no further
    /// supplier call is made. Transient poll failures also consume an attempt
    /// and leave the session pending: the caller's next scheduled poll is the
    /// retry, so errors never loop tightly inside the gateway.
    pub async fn poll(&self, session: &mut Session) -> Result<SessionStatus, GatewayError> {
        if session.is_terminal() {
            return Ok(session.status);
        }

        let bearer = self.tokens.get_token().await?;
        session.polls_used += 1;

        match self.api.poll(session.flow, &bearer, &session.id).await {
            Ok(PollReply::Complete(payload)) => {
                debug!(supplier = %self.supplier, job_id = %session.id, polls = session.polls_used, "job complete");
                session.payload = Some(self.marked_up(&payload));
                session.status = SessionStatus::Completed;
            }
            Ok(PollReply::Pending) => {
                if session.polls_used >= self.settings.max_poll_count {
                    warn!(supplier = %self.supplier, job_id = %session.id, polls = session.polls_used, "poll budget exhausted");
                    session.status = SessionStatus::TimedOut;
                }
            }
            Err(SupplierCallError::RateLimited { retry_after }) => {
                // A supplier shedding load will not finish this job inside
                // our window; stop polling it immediately.
                self.guard
                    .record_block(self.supplier, retry_after.as_deref());
                warn!(supplier = %self.supplier, job_id = %session.id, "rate limited mid-poll");
                session.status = SessionStatus::TimedOut;
            }
            Err(err) => {
                warn!(supplier = %self.supplier, job_id = %session.id, error = %err, "poll attempt failed");
                if session.polls_used >= self.settings.max_poll_count {
                    session.status = SessionStatus::TimedOut;
                }
            }
        }

        Ok(session.status)
    }

    fn fallback_session(&self, flow: Flow, criteria: Value) -> Session {
        let payload = fallback_result(self.supplier, flow, &criteria);
        Session {
            id: format!("local-{}", rand::random::<u32>()),
            supplier: self.supplier,
            flow,
            status: SessionStatus::Completed,
            payload: Some(self.marked_up(&payload)),
            criteria,
            from_fallback: true,
            polls_used: 0,
        }
    }

    fn marked_up(&self, payload: &Value) -> Value {
        markup::apply(self.markup.active_rule().as_ref(), payload)
    }

    fn unavailable(&self, reason: &str) -> GatewayError {
        GatewayError::SupplierUnavailable {
            supplier: self.supplier.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Both supplier integrations wired to one process-wide rate-limit guard and
/// one clock. Created once at process start; all state lives in memory and
/// is never persisted.
pub struct Gateway {
    flights: Orchestrator,
    hotels: Orchestrator,
}

impl Gateway {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flight_settings: SupplierSettings,
        hotel_settings: SupplierSettings,
        flight_api: Arc<dyn SupplierApi>,
        hotel_api: Arc<dyn SupplierApi>,
        markup: Arc<dyn MarkupRuleSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = Arc::new(RateLimitGuard::new(clock.clone()));
        Self {
            flights: Orchestrator::new(
                Supplier::Flights,
                flight_settings,
                flight_api,
                guard.clone(),
                markup.clone(),
                clock.clone(),
            ),
            hotels: Orchestrator::new(
                Supplier::Hotels,
                hotel_settings,
                hotel_api,
                guard,
                markup,
                clock,
            ),
        }
    }

    pub fn orchestrator(&self, supplier: Supplier) -> &Orchestrator {
        match supplier {
            Supplier::Flights => &self.flights,
            Supplier::Hotels => &self.hotels,
        }
    }
}
