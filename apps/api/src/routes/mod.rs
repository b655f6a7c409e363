pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::batch::handlers as batch;
use crate::ranking::handlers as ranking;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Batch ingestion
        .route(
            "/api/v1/batch-jobs",
            post(batch::handle_start).get(batch::handle_status),
        )
        .route("/api/v1/batch-jobs/:id/pause", post(batch::handle_pause))
        .route("/api/v1/batch-jobs/:id/resume", post(batch::handle_resume))
        .route("/api/v1/batch-jobs/:id/cancel", post(batch::handle_cancel))
        // Talent mining
        .route("/api/v1/talent/rank", post(ranking::handle_rank))
        .with_state(state)
}
