use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::SharedState;
use crate::advisor::RecommendationParams;
use crate::error::{McpError, McpResult};
use crate::storage::{MasteryBand, MasteryFields, MasteryRecord, MasteryScore, MasteryStore};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "mastery_upsert" => handle_mastery_upsert(state, arguments).await,
        "mastery_get" => handle_mastery_get(state, arguments).await,
        "mastery_list" => handle_mastery_list(state, arguments).await,
        "recommendations_get" => handle_recommendations(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Mastery handlers
// ============================================================================

/// Arguments for `mastery_upsert`.
#[derive(Debug, Deserialize)]
pub struct MasteryUpsertParams {
    /// Learner identifier.
    pub user_id: String,
    /// Topic identifier.
    pub node_id: String,
    /// Values to store.
    #[serde(flatten)]
    pub fields: MasteryFields,
}

/// Result of `mastery_upsert`.
#[derive(Debug, Serialize)]
pub struct MasteryUpsertResponse {
    /// Always true when returned.
    pub success: bool,
    /// The record as stored.
    pub record: MasteryRecord,
}

/// Arguments for `mastery_get`.
#[derive(Debug, Deserialize)]
pub struct MasteryGetParams {
    /// Learner identifier.
    pub user_id: String,
    /// Topic identifier.
    pub node_id: String,
}

/// Result of `mastery_get`.
#[derive(Debug, Serialize)]
pub struct MasteryGetResponse {
    /// Learner identifier.
    pub user_id: String,
    /// Topic identifier.
    pub node_id: String,
    /// Stored record, or null when never recorded.
    pub record: Option<MasteryRecord>,
    /// Band of the stored score, or null when never recorded.
    pub band: Option<MasteryBand>,
}

/// Arguments for `mastery_list`.
#[derive(Debug, Deserialize)]
pub struct MasteryListParams {
    /// Learner identifier.
    pub user_id: String,
}

/// Result of `mastery_list`.
#[derive(Debug, Serialize)]
pub struct MasteryListResponse {
    /// Learner identifier.
    pub user_id: String,
    /// Scores ordered weakest first.
    pub scores: Vec<MasteryScore>,
}

async fn handle_mastery_upsert(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    const TOOL: &str = "mastery_upsert";

    let params: MasteryUpsertParams = parse_arguments(TOOL, arguments)?;
    require_non_empty(TOOL, "user_id", &params.user_id)?;
    require_non_empty(TOOL, "node_id", &params.node_id)?;
    params
        .fields
        .validate()
        .map_err(|e| McpError::InvalidParameters {
            tool_name: TOOL.to_string(),
            message: e.to_string(),
        })?;

    let record = state
        .storage
        .upsert(&params.user_id, &params.node_id, params.fields)
        .await
        .map_err(execution_failed)?;

    info!(
        user_id = %record.user_id,
        node_id = %record.node_id,
        mastery_score = record.fields.mastery_score,
        band = %record.band(),
        "Mastery recorded"
    );

    serde_json::to_value(MasteryUpsertResponse {
        success: true,
        record,
    })
    .map_err(McpError::Json)
}

async fn handle_mastery_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    const TOOL: &str = "mastery_get";

    let params: MasteryGetParams = parse_arguments(TOOL, arguments)?;
    require_non_empty(TOOL, "user_id", &params.user_id)?;
    require_non_empty(TOOL, "node_id", &params.node_id)?;

    let record = state
        .storage
        .get_mastery(&params.user_id, &params.node_id)
        .await
        .map_err(execution_failed)?;

    debug!(
        user_id = %params.user_id,
        node_id = %params.node_id,
        found = record.is_some(),
        "Mastery lookup"
    );

    let band = record.as_ref().map(MasteryRecord::band);
    serde_json::to_value(MasteryGetResponse {
        user_id: params.user_id,
        node_id: params.node_id,
        record,
        band,
    })
    .map_err(McpError::Json)
}

async fn handle_mastery_list(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    const TOOL: &str = "mastery_list";

    let params: MasteryListParams = parse_arguments(TOOL, arguments)?;
    require_non_empty(TOOL, "user_id", &params.user_id)?;

    let scores = state
        .storage
        .list_mastery(&params.user_id)
        .await
        .map_err(execution_failed)?;

    serde_json::to_value(MasteryListResponse {
        user_id: params.user_id,
        scores,
    })
    .map_err(McpError::Json)
}

// ============================================================================
// Recommendation handler
// ============================================================================

/// Fallback outcomes are successful calls; only a failed mastery read is an error.
async fn handle_recommendations(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "recommendations_get",
        arguments,
        |params: RecommendationParams| async move {
            state
                .advisor
                .recommend(params)
                .await
                .map(|run| run.result)
        },
    )
    .await
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

fn require_non_empty(tool_name: &str, field: &str, value: &str) -> McpResult<()> {
    if value.trim().is_empty() {
        return Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: format!("{} cannot be empty", field),
        });
    }
    Ok(())
}

fn execution_failed(e: impl std::fmt::Display) -> McpError {
    McpError::ExecutionFailed {
        message: e.to_string(),
    }
}

/// Parse typed arguments, run `operation` and serialize its result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params).await.map_err(execution_failed)?;

    serde_json::to_value(result).map_err(McpError::Json)
}
