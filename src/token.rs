// Token Lifecycle Manager: one cached OAuth2 token per supplier, satisfied
// by cache hit, refresh, or full re-login, strictly in that order.
//
// The cache is replaced wholesale on every successful grant and discarded
// entirely when a refresh fails: a refresh token that failed once must never
// be retried. The fast path is a plain read; the refresh/login chain is
// serialized behind an async mutex so concurrent callers piggyback on a
// single credential exchange instead of stampeding the token endpoint.

use crate::clock::Clock;
use crate::error::GatewayError;
use crate::supplier::{Supplier, SupplierApi, TokenGrant};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Subtracted from the supplier-reported lifetime when the cache is written,
/// so a token is never handed out within a minute of its real expiry.
const SAFETY_MARGIN_SECS: u64 = 60;

/// The one live token for a supplier. Never persisted, never shared outside
/// this module, only ever replaced as a whole.
#[derive(Debug, Clone)]
struct SupplierToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

pub struct TokenManager {
    supplier: Supplier,
    api: Arc<dyn SupplierApi>,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<SupplierToken>>,
    // Guards the refresh/login chain only; the cache-hit path stays lock-free
    // apart from the RwLock read.
    auth_flight: tokio::sync::Mutex<()>,
}

impl TokenManager {
    pub fn new(supplier: Supplier, api: Arc<dyn SupplierApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            supplier,
            api,
            clock,
            cache: RwLock::new(None),
            auth_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns a bearer token that is valid for at least the safety margin.
    ///
    /// Errors only when cache, refresh, and login are all exhausted; that is
    /// an operator-actionable condition and is never masked here.
    pub async fn get_token(&self) -> Result<String, GatewayError> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let _flight = self.auth_flight.lock().await;

        // Another caller may have completed the exchange while we waited.
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let refresh_token = self
            .cache
            .read()
            .as_ref()
            .and_then(|t| t.refresh_token.clone());

        if let Some(refresh_token) = refresh_token {
            match self.api.refresh(&refresh_token).await {
                Ok(grant) => {
                    debug!(supplier = %self.supplier, "token refreshed");
                    return Ok(self.store(grant));
                }
                Err(err) => {
                    // Whatever went wrong, the refresh token is now suspect;
                    // drop the whole cache and fall through to a full login.
                    warn!(supplier = %self.supplier, error = %err, "token refresh failed, discarding cache");
                    *self.cache.write() = None;
                }
            }
        }

        match self.api.login().await {
            Ok(grant) => {
                debug!(supplier = %self.supplier, "logged in");
                Ok(self.store(grant))
            }
            Err(err) => Err(GatewayError::AuthenticationFailed {
                supplier: self.supplier.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Drop the cached token, e.g. after the supplier rejected it mid-flight.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Expiry of the currently cached token, if any.
    pub fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.cache.read().as_ref().map(|t| t.expires_at)
    }

    fn cached(&self) -> Option<String> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .filter(|t| self.clock.now() < t.expires_at)
            .map(|t| t.access_token.clone())
    }

    fn store(&self, grant: TokenGrant) -> String {
        let effective = grant.expires_in_seconds.saturating_sub(SAFETY_MARGIN_SECS);
        let token = SupplierToken {
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token,
            expires_at: self.clock.now() + Duration::seconds(effective as i64),
        };
        *self.cache.write() = Some(token);
        grant.access_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::manual::ManualClock;
    use crate::error::SupplierCallError;
    use crate::supplier::mock::MockSupplier;
    use futures::future::join_all;
    use std::sync::atomic::Ordering;

    fn manager() -> (Arc<MockSupplier>, Arc<ManualClock>, TokenManager) {
        let api = Arc::new(MockSupplier::new());
        let clock = ManualClock::at_epoch();
        let manager = TokenManager::new(Supplier::Flights, api.clone(), clock.clone());
        (api, clock, manager)
    }

    #[tokio::test]
    async fn cache_hit_makes_no_network_call() {
        let (api, _, manager) = manager();

        let first = manager.get_token().await.unwrap();
        let second = manager.get_token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn safety_margin_applied_at_write_time() {
        let (api, clock, manager) = manager();
        api.queue_login(Ok(MockSupplier::grant("a", None, 3600)));

        manager.get_token().await.unwrap();

        let expiry = manager.cached_expiry().unwrap();
        assert_eq!((expiry - clock.now()).num_seconds(), 3540);
    }

    #[tokio::test]
    async fn expired_cache_refreshes_instead_of_logging_in() {
        let (api, clock, manager) = manager();
        api.queue_login(Ok(MockSupplier::grant("first", Some("r1"), 120)));
        api.queue_refresh(Ok(MockSupplier::grant("second", Some("r2"), 3600)));

        assert_eq!(manager.get_token().await.unwrap(), "first");

        // 120s lifetime minus the margin leaves 60s of validity.
        clock.advance_secs(61);
        assert_eq!(manager.get_token().await.unwrap(), "second");
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_failure_falls_through_to_login() {
        let (api, clock, manager) = manager();
        api.queue_login(Ok(MockSupplier::grant("first", Some("r1"), 120)));
        api.queue_refresh(Err(SupplierCallError::Network("connection reset".into())));
        api.queue_login(Ok(MockSupplier::grant("relogin", Some("r2"), 3600)));

        manager.get_token().await.unwrap();
        clock.advance_secs(61);

        assert_eq!(manager.get_token().await.unwrap(), "relogin");
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_token_is_not_retried() {
        let (api, clock, manager) = manager();
        api.queue_login(Ok(MockSupplier::grant("first", Some("r1"), 120)));
        api.queue_refresh(Err(SupplierCallError::UnexpectedResponse {
            status: 400,
            message: "invalid_grant".into(),
        }));
        // No refresh token on the re-login grant.
        api.queue_login(Ok(MockSupplier::grant("relogin", None, 120)));
        api.queue_login(Ok(MockSupplier::grant("third", None, 3600)));

        manager.get_token().await.unwrap();
        clock.advance_secs(61);
        manager.get_token().await.unwrap();
        clock.advance_secs(61);
        manager.get_token().await.unwrap();

        // Exactly one refresh attempt ever; the broken token was discarded.
        assert_eq!(api.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn login_failure_surfaces_authentication_error() {
        let (api, _, manager) = manager();
        api.queue_login(Err(SupplierCallError::AuthRejected("bad client".into())));

        let err = manager.get_token().await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthenticationFailed { .. }));
    }

    #[tokio::test]
    async fn expiry_is_monotonic_across_renewals() {
        let (_, clock, manager) = manager();

        manager.get_token().await.unwrap();
        let first_expiry = manager.cached_expiry().unwrap();

        clock.advance_secs(3600);
        manager.get_token().await.unwrap();
        let second_expiry = manager.cached_expiry().unwrap();

        assert!(second_expiry > first_expiry);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_exchange() {
        let (api, _, manager) = manager();

        manager.get_token().await.unwrap();
        manager.invalidate();
        manager.get_token().await.unwrap();

        assert_eq!(api.login_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_trigger_a_single_login() {
        let (api, _, manager) = manager();
        let manager = Arc::new(manager);

        let calls = (0..8).map(|_| {
            let manager = manager.clone();
            async move { manager.get_token().await.unwrap() }
        });
        let tokens = join_all(calls).await;

        assert!(tokens.iter().all(|t| t == &tokens[0]));
        assert_eq!(api.login_calls.load(Ordering::SeqCst), 1);
    }
}
