pub mod engine;
pub mod handlers;
pub mod justification;
mod prompts;
pub mod similarity;

pub use engine::TalentRankingEngine;
