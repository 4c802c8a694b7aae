//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod trace_id;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{pairing_link_rate_limit, RateLimiterState};
pub use security_headers::security_headers_middleware;
pub use trace_id::trace_id;
