//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::advisor::RecommendationService;
use crate::config::Config;
use crate::langbase::LangbaseClient;
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite mastery store.
    pub storage: SqliteStorage,
    /// Langbase API client.
    pub langbase: LangbaseClient,
    /// Recommendation service wired to `storage` and `langbase`.
    pub advisor: RecommendationService,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage, langbase: LangbaseClient) -> Self {
        tracing::info!(
            advisor_pipe = %config.pipes.advisor,
            advisor_enabled = langbase.is_configured(),
            "AppState initializing"
        );

        let advisor =
            RecommendationService::new(Arc::new(storage.clone()), Arc::new(langbase.clone()));

        Self {
            config,
            storage,
            langbase,
            advisor,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DatabaseConfig, LangbaseConfig, LogFormat, LoggingConfig, PipeConfig, RequestConfig,
    };
    use crate::storage::{MasteryFields, MasteryStore};
    use std::path::PathBuf;

    fn create_test_config() -> Config {
        Config {
            langbase: LangbaseConfig {
                api_key: None,
                base_url: "https://api.langbase.com".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            request: RequestConfig::default(),
            pipes: PipeConfig::default(),
        }
    }

    async fn create_test_state() -> AppState {
        let config = create_test_config();
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let langbase =
            LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone()).unwrap();
        AppState::new(config, storage, langbase)
    }

    #[tokio::test]
    async fn test_app_state_new() {
        let state = create_test_state().await;
        assert!(state.config.langbase.api_key.is_none());
        assert!(!state.langbase.is_configured());
        assert_eq!(state.config.pipes.advisor, "learning-advisor-v1");
    }

    #[tokio::test]
    async fn test_shared_state_type() {
        let shared: SharedState = Arc::new(create_test_state().await);

        let shared2 = Arc::clone(&shared);
        assert_eq!(Arc::strong_count(&shared), 2);
        drop(shared2);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[tokio::test]
    async fn test_advisor_shares_state_storage() {
        let state = create_test_state().await;

        state
            .storage
            .upsert("u1", "algebra", MasteryFields::new(40.0))
            .await
            .unwrap();

        // The advisor reads through its own handle to the same pool.
        let run = state
            .advisor
            .recommend(crate::advisor::RecommendationParams::new("u1"))
            .await
            .unwrap();
        assert_eq!(
            run.outcome,
            crate::advisor::RecommendationOutcome::ServiceUnavailableFallback
        );
    }
}
