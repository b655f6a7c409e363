use crate::batch::controller::BatchController;
use crate::ranking::TalentRankingEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub batch: BatchController,
    pub ranking: TalentRankingEngine,
}
