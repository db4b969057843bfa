// Supplier Integration Gateway: the layer between booking controllers and
// external travel-content suppliers with OAuth2-protected, poll-based APIs.

pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod markup;
pub mod orchestrator;
pub mod rate_limit;
pub mod supplier;
pub mod token;

// Re-export key types for convenience
pub use clock::{system_clock, Clock, SystemClock};
pub use config::{Credentials, SupplierSettings};
pub use error::{GatewayError, SupplierCallError};
pub use http::HttpSupplierApi;
pub use markup::{InMemoryMarkupStore, MarkupRule, MarkupRuleSource, MarkupType};
pub use orchestrator::{Gateway, Orchestrator, Session, SessionStatus};
pub use rate_limit::RateLimitGuard;
pub use supplier::{Flow, InitiateReply, PollReply, Supplier, SupplierApi, TokenGrant};
pub use token::TokenManager;
