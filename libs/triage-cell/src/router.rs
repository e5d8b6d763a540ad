use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::actor_middleware;

use crate::handlers;
use crate::services::TriageService;

pub fn triage_routes(service: Arc<TriageService>) -> Router {
    Router::new()
        // Intake
        .route("/requests", post(handlers::submit_request))
        .route("/requests/pending", get(handlers::list_pending_requests))
        .route("/requests/{request_id}", get(handlers::get_request))

        // Staff review
        .route("/requests/{request_id}/review", post(handlers::review_request))
        .route("/requests/{request_id}/availability", get(handlers::check_request_availability))
        .route("/requests/{request_id}/confirm", post(handlers::confirm_request))
        .route("/requests/{request_id}/reject", post(handlers::reject_request))
        .route("/requests/{request_id}/cancel", post(handlers::cancel_request))

        .layer(middleware::from_fn(actor_middleware))
        .with_state(service)
}
