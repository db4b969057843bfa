// Configuration surface for one supplier integration. Everything here is
// externally supplied; poll pacing and timeouts are tunable without touching
// the orchestrator's state machine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct SupplierSettings {
    pub base_url: String,
    /// Absent credentials put the supplier in fallback mode.
    pub credentials: Option<Credentials>,
    /// Operator switch: serve the static dataset even when credentials exist.
    pub force_fallback: bool,
    /// Suggested delay between two poll calls. The gateway reports it to
    /// callers; it does not sleep itself.
    pub poll_interval: Duration,
    /// Hard ceiling on status checks per session before TimedOut.
    pub max_poll_count: u32,
    /// Per network call, distinct from the overall polling-session window.
    pub call_timeout: Duration,
}

impl Default for SupplierSettings {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            credentials: None,
            force_fallback: false,
            poll_interval: Duration::from_secs(2),
            max_poll_count: 10,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl SupplierSettings {
    /// True when a live call could be attempted at all.
    pub fn is_configured(&self) -> bool {
        !self.force_fallback && self.credentials.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_credentials() {
        let settings = SupplierSettings::default();
        assert!(!settings.is_configured());
    }

    #[test]
    fn force_fallback_wins_over_credentials() {
        let settings = SupplierSettings {
            credentials: Some(Credentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            }),
            force_fallback: true,
            ..Default::default()
        };
        assert!(!settings.is_configured());
    }
}
