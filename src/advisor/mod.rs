//! Next-topic recommendations.
//!
//! A request reads the learner's mastery snapshot, builds a prompt, asks the
//! completion service for an answer and extracts a validated list of
//! recommendations from whatever text comes back. Failures after the prompt
//! is built degrade to a predetermined recommendation; see
//! [`RecommendationOutcome`].

mod extract;
mod service;
mod types;

pub use extract::{extract_recommendations, Extraction};
pub use service::RecommendationService;
pub use types::{
    RecommendationItem, RecommendationOutcome, RecommendationParams, RecommendationResult,
    RecommendationRun,
};
