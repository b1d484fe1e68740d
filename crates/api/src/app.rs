use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{CheckInService, CouponCodeGenerator, RegistrationStore};
use persistence::repositories::RegistrationRepository;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::handle_middleware_error;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, trace_id, RateLimiterState,
};
use crate::routes::{check_in, coupons, health};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub check_in: CheckInService,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

/// Builds the application backed by PostgreSQL.
pub fn create_app(config: Config, pool: PgPool) -> Router {
    let store = Arc::new(RegistrationRepository::new(pool.clone()));
    create_app_with_store(config, pool, store)
}

/// Builds the application over any registration store.
///
/// The pool is only used by the health probes.
pub fn create_app_with_store(
    config: Config,
    pool: PgPool,
    store: Arc<dyn RegistrationStore>,
) -> Router {
    let config = Arc::new(config);

    let check_in = CheckInService::new(store, CouponCodeGenerator::new(&config.coupon.prefix))
        .with_max_generation_attempts(config.coupon.max_generation_attempts);

    let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
        Arc::new(RateLimiterState::new(
            config.security.rate_limit_per_minute,
            &config.security.terminal_ids,
        ))
    });

    let state = AppState {
        pool,
        config: config.clone(),
        check_in,
        rate_limiter,
    };

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

    // Self-check-in page and staff desk
    let check_in_routes = Router::new()
        .route(
            "/api/v1/events/:slug/registrations/lookup",
            post(check_in::lookup_registration),
        )
        .route(
            "/api/v1/events/:slug/registrations/:id/verify",
            get(check_in::verify_registration),
        )
        .route(
            "/api/v1/events/:slug/registrations/:id/check-in",
            post(check_in::complete_check_in),
        )
        .route(
            "/api/v1/events/:slug/check-in/stats",
            get(check_in::check_in_stats),
        );

    // Vendor terminals, rate limited per terminal
    let coupon_routes = Router::new()
        .route(
            "/api/v1/events/:slug/coupons/validate",
            post(coupons::validate_coupon),
        )
        .route(
            "/api/v1/events/:slug/registrations/:id/redeem",
            post(coupons::redeem_coupon),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let routes = Router::new()
        .merge(public_routes)
        .merge(check_in_routes)
        .merge(coupon_routes)
        .layer(CompressionLayer::new());

    // Global middleware (order matters: bottom layers run first)
    with_request_timeout(
        routes,
        Duration::from_secs(config.server.request_timeout_secs),
    )
    .layer(middleware::from_fn(metrics_middleware))
    .layer(TraceLayer::new_for_http())
    .layer(middleware::from_fn(trace_id))
    .layer(cors)
    .with_state(state)
}

/// Applies the request timeout; timed-out requests get a `timeout` envelope.
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .timeout(timeout),
    )
}
