//! Router construction for the agri-advisor server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{delete, get, post, put},
    Extension, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use agri_core::service::AdvisoryService;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<dyn AdvisoryService>, jwt_config: JwtConfig) -> Router {
    // Routes that require a bearer token.
    let protected = Router::new()
        // Farmer
        .route("/api/farmer/soil-test", post(handlers::farmer::submit_soil_test))
        .route("/api/farmer/my-tests", get(handlers::farmer::my_tests))
        .route(
            "/api/farmer/recommendation/:soil_test_id",
            get(handlers::farmer::recommendation),
        )
        .route("/api/farmer/weather", get(handlers::farmer::weather))
        .route("/api/farmer/irrigation", get(handlers::farmer::irrigation_plans))
        // Researcher
        .route(
            "/api/researcher/propose-rules",
            post(handlers::researcher::propose_rules),
        )
        .route(
            "/api/researcher/my-pending-rules",
            get(handlers::researcher::my_pending_rules),
        )
        .route(
            "/api/researcher/soil-insights",
            get(handlers::researcher::soil_insights),
        )
        .route("/api/researcher/trends", get(handlers::researcher::trends))
        .route("/api/researcher/soiltests", get(handlers::researcher::soil_tests))
        .route(
            "/api/researcher/soiltests/:id",
            put(handlers::researcher::correct_soil_test),
        )
        // Admin — moderation queues
        .route("/api/admin/pending-rules", get(handlers::admin::pending_rules))
        .route("/api/admin/review-rule/:id", put(handlers::admin::review_rule))
        .route(
            "/api/admin/pending-recommendations",
            get(handlers::admin::pending_recommendations),
        )
        .route(
            "/api/admin/approve-recommendation/:id",
            put(handlers::admin::review_recommendation),
        )
        // Admin — rules and recommendations
        .route(
            "/api/admin/rules",
            get(handlers::admin::list_rules).post(handlers::admin::set_rule),
        )
        .route(
            "/api/admin/recommendation/:soil_test_id",
            post(handlers::admin::create_recommendation),
        )
        // Admin — oversight
        .route("/api/admin/soiltests", get(handlers::admin::soil_tests))
        .route(
            "/api/admin/soiltests/:id",
            delete(handlers::admin::delete_soil_test),
        )
        .route(
            "/api/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/api/admin/users/:id",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route("/api/admin/stats", get(handlers::admin::stats))
        // Government official
        .route("/api/govt/reports", get(handlers::govt::reports))
        .route(
            "/api/govt/generate-report/:soil_test_id",
            post(handlers::govt::generate_report),
        )
        .layer(axum_mw::from_fn(jwt_auth));

    // Public routes (no auth).
    let public = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login));

    // Combine and add shared state.
    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(service))
        .layer(Extension(jwt_config))
}
