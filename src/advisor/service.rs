use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::extract::{extract_recommendations, Extraction};
use super::types::{RecommendationOutcome, RecommendationParams, RecommendationRun};
use crate::error::{AppResult, ToolError};
use crate::langbase::CompletionClient;
use crate::prompts::build_recommendation_prompt;
use crate::storage::MasteryStore;

/// Produces next-topic recommendations from a learner's mastery snapshot.
///
/// Every request ends in exactly one [`RecommendationOutcome`]. Only a failed
/// mastery read is returned as an error; everything that goes wrong after the
/// prompt is built degrades to a predetermined recommendation.
#[derive(Clone)]
pub struct RecommendationService {
    storage: Arc<dyn MasteryStore>,
    completion: Arc<dyn CompletionClient>,
}

impl RecommendationService {
    /// Create a service over a mastery store and a completion client.
    pub fn new(storage: Arc<dyn MasteryStore>, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            storage,
            completion,
        }
    }

    /// Recommend what `params.user_id` should study next.
    pub async fn recommend(&self, params: RecommendationParams) -> AppResult<RecommendationRun> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();

        if params.user_id.trim().is_empty() {
            return Err(ToolError::Validation {
                field: "user_id".to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        let current_node_id = params
            .current_node_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());

        debug!(
            %request_id,
            user_id = %params.user_id,
            current_node_id = ?current_node_id,
            "Building recommendations"
        );

        let scores = match self.storage.list_mastery(&params.user_id).await {
            Ok(scores) => scores,
            Err(e) => {
                error!(
                    %request_id,
                    user_id = %params.user_id,
                    outcome = %RecommendationOutcome::PersistenceError,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Failed to read mastery snapshot"
                );
                return Err(e.into());
            }
        };

        let prompt = build_recommendation_prompt(&scores, current_node_id);
        let run = self.complete_and_extract(request_id, prompt).await;

        info!(
            %request_id,
            user_id = %params.user_id,
            node_id = ?current_node_id,
            outcome = %run.outcome,
            fallback = run.outcome.is_fallback(),
            topics_known = scores.len(),
            recommendations = run.result.recommendations.len(),
            latency_ms = start.elapsed().as_millis(),
            "Recommendations ready"
        );

        Ok(run)
    }

    async fn complete_and_extract(&self, request_id: Uuid, prompt: String) -> RecommendationRun {
        let completion = Arc::clone(&self.completion);
        let task = tokio::spawn(async move { completion.complete(&prompt).await });

        let outcome = match task.await {
            Ok(Ok(text)) => match extract_recommendations(&text) {
                Extraction::Parsed(items) => return RecommendationRun::success(items),
                Extraction::Unparseable => {
                    warn!(
                        %request_id,
                        completion_len = text.len(),
                        preview = %text.chars().take(200).collect::<String>(),
                        "Completion held no usable recommendations"
                    );
                    RecommendationOutcome::ParseFailureFallback
                }
            },
            Ok(Err(e)) if e.is_unavailable() => {
                warn!(%request_id, error = %e, "Completion service unavailable");
                RecommendationOutcome::ServiceUnavailableFallback
            }
            Ok(Err(e)) => {
                error!(%request_id, error = %e, "Completion call failed");
                RecommendationOutcome::GenericFallback
            }
            Err(e) => {
                error!(%request_id, error = %e, "Completion task aborted");
                RecommendationOutcome::GenericFallback
            }
        };

        RecommendationRun::fallback(outcome)
    }
}
