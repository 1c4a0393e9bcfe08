use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::auth_middleware, middleware::metrics_middleware, registrants, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Routes that act on behalf of a user
    let user_routes = Router::new()
        // Tickets
        .route("/tickets", post(tickets::publish_ticket))
        .route(
            "/tickets/{id}",
            patch(tickets::update_ticket).delete(tickets::withdraw_ticket),
        )
        // Registrants
        .route("/registrants", get(registrants::list_my_registrations))
        .route(
            "/registrants/{ticket_id}",
            get(registrants::list_ticket_registrants).post(registrants::create_registration),
        )
        .route(
            "/registrants/{ticket_id}/generate",
            get(registrants::generate_gate_token),
        )
        .route(
            "/registrants/verify/{id}/{ticket_id}",
            patch(registrants::verify_registrant),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        .merge(user_routes)
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
