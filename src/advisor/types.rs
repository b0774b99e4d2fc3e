use serde::{Deserialize, Serialize};

/// A single next-topic recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    /// Human-readable topic name.
    pub topic: String,
    /// Why the learner should study it now.
    pub reason: String,
    /// Known topics this one builds on.
    #[serde(default)]
    pub connections: Vec<String>,
    /// Suggested mastery goal in percent (0-100).
    #[serde(default)]
    pub target_mastery: u8,
}

impl RecommendationItem {
    /// Create an item with no connections.
    pub fn new(topic: impl Into<String>, reason: impl Into<String>, target_mastery: u8) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
            connections: Vec::new(),
            target_mastery,
        }
    }

    /// Set the connected topics.
    pub fn with_connections(mut self, connections: Vec<String>) -> Self {
        self.connections = connections;
        self
    }
}

/// Wire shape returned for every recommendation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Recommendations in the order the model produced them.
    pub recommendations: Vec<RecommendationItem>,
}

/// Input for a recommendation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationParams {
    /// Learner to recommend for.
    pub user_id: String,
    /// Topic the learner is currently looking at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,
}

impl RecommendationParams {
    /// Create params for a user with no current node.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_node_id: None,
        }
    }

    /// Set the node the learner is viewing.
    pub fn with_current_node(mut self, node_id: impl Into<String>) -> Self {
        self.current_node_id = Some(node_id.into());
        self
    }
}

/// Terminal state of a recommendation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationOutcome {
    /// The model's answer was extracted and validated.
    Success,
    /// The completion service could not be reached or refused the call.
    ServiceUnavailableFallback,
    /// The model answered but nothing usable could be extracted.
    ParseFailureFallback,
    /// Something unexpected failed after the prompt was built.
    GenericFallback,
    /// Mastery could not be read. Surfaced as an error, carries no content.
    PersistenceError,
}

impl RecommendationOutcome {
    /// Stable tag used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationOutcome::Success => "success",
            RecommendationOutcome::ServiceUnavailableFallback => "service_unavailable_fallback",
            RecommendationOutcome::ParseFailureFallback => "parse_failure_fallback",
            RecommendationOutcome::GenericFallback => "generic_fallback",
            RecommendationOutcome::PersistenceError => "persistence_error",
        }
    }

    /// Whether this outcome substituted predetermined content.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            RecommendationOutcome::ServiceUnavailableFallback
                | RecommendationOutcome::ParseFailureFallback
                | RecommendationOutcome::GenericFallback
        )
    }

    /// The predetermined item for fallback outcomes.
    pub fn fallback_item(&self) -> Option<RecommendationItem> {
        match self {
            RecommendationOutcome::ServiceUnavailableFallback => Some(RecommendationItem::new(
                "Enable the AI advisor",
                "The AI advisor is not enabled or configured. Ask your administrator to enable \
                 the AI advisor's completion service to get personalized recommendations.",
                0,
            )),
            RecommendationOutcome::ParseFailureFallback => Some(RecommendationItem::new(
                "Explore foundational topics",
                "Build a strong base before advancing (the advisor's answer could not be read)",
                70,
            )),
            RecommendationOutcome::GenericFallback => Some(RecommendationItem::new(
                "Continue exploring",
                "Keep learning at your own pace",
                70,
            )),
            RecommendationOutcome::Success | RecommendationOutcome::PersistenceError => None,
        }
    }
}

impl std::fmt::Display for RecommendationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished recommendation request: what happened and what to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationRun {
    /// Which terminal state produced the result.
    pub outcome: RecommendationOutcome,
    /// The caller-visible result.
    pub result: RecommendationResult,
}

impl RecommendationRun {
    /// A successful run carrying the model's items.
    pub fn success(recommendations: Vec<RecommendationItem>) -> Self {
        Self {
            outcome: RecommendationOutcome::Success,
            result: RecommendationResult { recommendations },
        }
    }

    /// A run that substitutes the outcome's predetermined item.
    pub fn fallback(outcome: RecommendationOutcome) -> Self {
        Self {
            outcome,
            result: RecommendationResult {
                recommendations: outcome.fallback_item().into_iter().collect(),
            },
        }
    }
}
