use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use domain::services::{MockNotificationService, NotificationService};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, pairing_link_rate_limit, security_headers_middleware,
    trace_id, RateLimiterState,
};
use crate::routes::{
    alerts, app_limits, block_attempts, blocks, children, health, pairing, parents,
    schedule_rules, usage,
};
use crate::services::{PushError, PushFunctionNotificationService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub notifier: Arc<dyn NotificationService>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid JWT configuration: {0}")]
    Jwt(#[from] JwtError),

    #[error("Invalid push configuration: {0}")]
    Push(#[from] PushError),
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, StartupError> {
        let jwt = JwtConfig::with_leeway(
            &config.jwt.private_key,
            &config.jwt.public_key,
            config.jwt.access_token_expiry_secs,
            config.jwt.leeway_secs,
        )?;

        let notifier: Arc<dyn NotificationService> = if config.push.enabled {
            Arc::new(PushFunctionNotificationService::new(config.push.clone())?)
        } else {
            tracing::info!("Push disabled, notifications will only be logged");
            Arc::new(MockNotificationService::new())
        };

        let rate_limiter =
            RateLimiterState::new(config.security.pairing_link_rate_limit_per_minute)
                .map(Arc::new);

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            notifier,
            rate_limiter,
        })
    }

    /// Replaces the notification backend.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationService>) -> Self {
        self.notifier = notifier;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Parent routes authenticate with the ParentAuth extractor.
    let parent_routes = Router::new()
        .route("/api/v1/parents", post(parents::register_parent))
        .route("/api/v1/pairing-codes", post(pairing::create_pairing_code))
        .route("/api/v1/pairing-codes/:code", get(pairing::get_pairing_code))
        .route("/api/v1/children", get(children::list_children))
        .route(
            "/api/v1/children/:child_id",
            axum::routing::delete(children::revoke_child),
        )
        .route("/api/v1/children/:child_id/blocks", get(blocks::list_blocks))
        .route(
            "/api/v1/children/:child_id/blocks/:package_name",
            put(blocks::set_block),
        )
        .route(
            "/api/v1/children/:child_id/schedule-rules",
            get(schedule_rules::list_rules).post(schedule_rules::create_rule),
        )
        .route(
            "/api/v1/children/:child_id/schedule-rules/:rule_id",
            put(schedule_rules::update_rule).delete(schedule_rules::delete_rule),
        )
        .route(
            "/api/v1/children/:child_id/app-limits",
            get(app_limits::list_limits),
        )
        .route(
            "/api/v1/children/:child_id/app-limits/:package_name",
            put(app_limits::set_limit).delete(app_limits::delete_limit),
        )
        .route("/api/v1/children/:child_id/usage", get(usage::daily_report))
        .route(
            "/api/v1/children/:child_id/usage/history",
            get(usage::usage_history),
        )
        .route(
            "/api/v1/children/:child_id/block-attempts",
            get(block_attempts::list_attempts),
        );

    // Link is public but throttled per client IP.
    let link_routes = Router::new()
        .route("/api/v1/pairing-codes/link", post(pairing::link_device))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            pairing_link_rate_limit,
        ));

    // Child routes authenticate with the ChildAuth extractor.
    let child_routes = Router::new()
        .route(
            "/api/v1/child/apps/:package_name/status",
            get(blocks::child_app_status),
        )
        .route(
            "/api/v1/child/schedule-rules",
            get(schedule_rules::child_rules),
        )
        .route("/api/v1/child/usage", post(usage::upload_usage))
        .route(
            "/api/v1/child/block-attempts",
            post(block_attempts::record_attempt),
        )
        .route("/api/v1/child/alerts", post(alerts::tamper_alert));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(parent_routes)
        .merge(link_routes)
        .merge(child_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
