// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{leaderboard, progress},
    state::AppState,
    utils::jwt::optional_auth_middleware,
};

/// Assembles the main application router.
///
/// * Nests the series sub-router under /api/series.
/// * Applies global middleware (Trace, CORS).
/// * Rate-limits the write route by peer IP; requires serving with
///   `into_make_service_with_connect_info` so the extractor can see the
///   peer address.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(5)
        .burst_size(10)
        .finish()
        .unwrap();

    let governor_conf = Arc::new(governor_conf);

    let series_routes = Router::new()
        .route("/user-tests/{user_id}", get(progress::get_user_tests))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route(
            "/rank/{series_id}/user/{user_id}",
            get(leaderboard::get_user_rank),
        )
        // The only mutating route: optional auth inside, rate limit outside
        .merge(
            Router::new()
                .route("/complete-test", post(progress::complete_test))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                ))
                .layer(GovernorLayer::new(governor_conf)),
        );

    Router::new()
        .nest("/api/series", series_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
