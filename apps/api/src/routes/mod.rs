pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::compensation::handle_compensation_pay_gap;
use crate::fairness::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Fairness analysis over caller-supplied observations
        .route(
            "/api/v1/fairness/significance",
            post(handlers::handle_significance),
        )
        .route(
            "/api/v1/fairness/group-stats",
            post(handlers::handle_group_stats),
        )
        .route("/api/v1/fairness/pay-gap", post(handlers::handle_pay_gap))
        .route(
            "/api/v1/fairness/distribution",
            post(handlers::handle_distribution),
        )
        .route("/api/v1/fairness/report", post(handlers::handle_report))
        // Fairness analysis over stored compensation records
        .route(
            "/api/v1/compensation/pay-gap",
            get(handle_compensation_pay_gap),
        )
        .with_state(state)
}
