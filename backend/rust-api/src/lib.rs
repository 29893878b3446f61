use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1", api_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/games", games_routes())
        .route("/leaderboard", get(handlers::leaderboard::leaderboard))
        .route("/questions", get(handlers::leaderboard::questions))
        .route("/chat", post(handlers::chat::ask))
        .route("/chat/{session_id}/history", get(handlers::chat::history))
        .route("/legal-advice", post(handlers::chat::legal_advice))
}

fn games_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::games::start_game))
        .route(
            "/{player_id}",
            get(handlers::games::get_game).delete(handlers::games::end_game),
        )
        .route("/{player_id}/answers", post(handlers::games::submit_answer))
        .route("/{player_id}/advance", post(handlers::games::advance))
        .route("/{player_id}/restart", post(handlers::games::restart))
        .route("/{player_id}/stream", get(handlers::sse::game_stream))
}
