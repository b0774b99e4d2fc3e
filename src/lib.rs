//! # Mastery Advisor
//!
//! A Model Context Protocol (MCP) server that records per-topic mastery for
//! learners of a knowledge-graph learning app and recommends what each
//! learner should study next, delegating the recommendation itself to a
//! Langbase Pipe.
//!
//! ## Features
//!
//! - **Mastery store**: one record per `(user_id, node_id)` with atomic upserts
//! - **Score listing**: every topic score for a learner, weakest first
//! - **Recommendations**: prompt construction, tolerant extraction of the
//!   model's JSON and a fixed fallback for every failure after the read
//!
//! ## Architecture
//!
//! ```text
//! MCP Client → MCP Server (Rust) → Langbase Pipes (HTTP)
//!                    ↓
//!              SQLite (mastery)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mastery_advisor::{Config, AppState, McpServer};
//! use mastery_advisor::langbase::LangbaseClient;
//! use mastery_advisor::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let langbase = LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone())?;
//!     let state = Arc::new(AppState::new(config, storage, langbase));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Recommendation service, extraction and fallbacks.
pub mod advisor;
/// One-shot command-line commands.
pub mod cli;
/// Configuration management for the server.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Prompts for the advisor pipe.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;
/// SQLite storage layer for mastery records.
pub mod storage;

pub use advisor::{RecommendationOutcome, RecommendationResult, RecommendationService};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
