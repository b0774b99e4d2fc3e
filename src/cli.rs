//! One-shot CLI commands.
//!
//! These run against the same state as the MCP server, which makes them handy
//! for checking a database or the advisor pipe without an MCP client.

use clap::Subcommand;

use crate::advisor::RecommendationParams;
use crate::server::AppState;
use crate::storage::{MasteryBand, MasteryStore};

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,

    /// Print next-topic recommendations for a learner as JSON
    Recommend {
        /// Learner identifier
        #[arg(long)]
        user_id: String,

        /// Topic the learner is currently viewing
        #[arg(long)]
        current_node_id: Option<String>,
    },

    /// Print a learner's scores, weakest first
    Scores {
        /// Learner identifier
        #[arg(long)]
        user_id: String,
    },
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a one-shot command. `Serve` is not a one-shot command.
pub async fn execute_command(command: Commands, state: &AppState) -> CliResult {
    match command {
        Commands::Serve => CliResult::error("serve runs the MCP server and is not a one-shot command"),
        Commands::Recommend {
            user_id,
            current_node_id,
        } => execute_recommend(state, user_id, current_node_id).await,
        Commands::Scores { user_id } => execute_scores(state, &user_id).await,
    }
}

async fn execute_recommend(
    state: &AppState,
    user_id: String,
    current_node_id: Option<String>,
) -> CliResult {
    let params = RecommendationParams {
        user_id,
        current_node_id,
    };

    let run = match state.advisor.recommend(params).await {
        Ok(run) => run,
        Err(e) => return CliResult::error(format!("Failed to get recommendations: {}", e)),
    };

    match serde_json::to_string_pretty(&run.result) {
        Ok(json) => CliResult::success(json),
        Err(e) => CliResult::error(format!("Failed to serialize recommendations: {}", e)),
    }
}

async fn execute_scores(state: &AppState, user_id: &str) -> CliResult {
    let scores = match state.storage.list_mastery(user_id).await {
        Ok(scores) => scores,
        Err(e) => return CliResult::error(format!("Failed to read scores: {}", e)),
    };

    if scores.is_empty() {
        return CliResult::success(format!("No mastery recorded for {}", user_id));
    }

    let mut output = format!("Mastery for {} ({} topics)\n", user_id, scores.len());
    for score in &scores {
        output.push_str(&format!(
            "  {:>5.1}%  {:<8}  {}\n",
            score.mastery_score,
            MasteryBand::from_score(score.mastery_score).to_string(),
            score.node_id
        ));
    }

    CliResult::success(output.trim_end())
}
