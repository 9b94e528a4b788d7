use axum::{
    Router,
    routing::get,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, act_on_request, create_request, get_user_request, list_all_requests,
    list_user_requests,
};

/// Creates the API router with all loan request endpoints
///
/// Every endpoint except `/health` requires `Authorization: Bearer <JWT>`.
/// - POST /users/:user_id/requests - Create a loan request
/// - GET /users/:user_id/requests - List the user's requests
/// - GET /users/:user_id/requests/:request_id - Get request details
/// - PUT /users/:user_id/requests/:request_id - Apply an action to a request
/// - GET /requests - List all requests (Librarian/Administrator)
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route(
            "/users/:user_id/requests",
            get(list_user_requests).post(create_request),
        )
        .route(
            "/users/:user_id/requests/:request_id",
            get(get_user_request).put(act_on_request),
        )
        .route("/requests", get(list_all_requests))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
