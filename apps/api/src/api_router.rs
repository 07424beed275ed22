use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use arcade_ledger_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(app_state: AppState, frontend_url: Option<&str>) -> Result<Router, AppError> {
    let operation_routes = Router::new()
        .route("/ops/punch", post(handlers::punch_handler))
        .route(
            "/ops/card-status/{card_id}",
            get(handlers::card_status_handler),
        );

    let manager_routes = Router::new()
        .route(
            "/manager/cards",
            get(handlers::list_cards_handler).post(handlers::register_card_handler),
        )
        .route(
            "/manager/cards/{card_id}/history",
            get(handlers::card_history_handler),
        )
        .route("/manager/recharge", put(handlers::recharge_handler))
        .route("/manager/refund", put(handlers::refund_handler))
        .route("/manager/machines", get(handlers::list_machines_handler))
        .route(
            "/manager/transactions",
            get(handlers::list_transactions_handler),
        )
        .route("/manager/logs", get(handlers::list_audit_log_handler));

    let protected_routes = operation_routes
        .merge(manager_routes)
        .route_layer(from_fn(middleware::require_caller));

    Ok(Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
