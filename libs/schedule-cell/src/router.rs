use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::actor_middleware;

use crate::handlers::{self, ScheduleState};

pub fn schedule_routes(state: Arc<ScheduleState>) -> Router {
    Router::new()
        // Schedule entry management
        .route("/entries", post(handlers::create_entry))
        .route(
            "/entries/{entry_id}",
            get(handlers::get_entry)
                .put(handlers::update_entry)
                .delete(handlers::delete_entry),
        )
        .route("/entries/{entry_id}/history", get(handlers::get_entry_history))

        // Resolved schedules and availability
        .route("/employees/{employee_id}/entries", get(handlers::list_employee_entries))
        .route("/employees/{employee_id}/day", get(handlers::get_effective_day))
        .route("/employees/{employee_id}/calendar", get(handlers::get_effective_range))
        .route("/employees/{employee_id}/availability", get(handlers::check_availability))

        .layer(middleware::from_fn(actor_middleware))
        .with_state(state)
}
