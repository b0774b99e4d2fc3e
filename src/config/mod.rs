use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
}

/// Langbase API configuration.
///
/// A missing API key leaves the advisor disabled rather than failing startup.
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

/// Langbase pipe configuration for the learning advisor
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub advisor: String,
    pub model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/mastery.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        // Completion calls must always be bounded.
        if request.timeout_ms == 0 {
            return Err(AppError::Config {
                message: "REQUEST_TIMEOUT_MS must be greater than zero".to_string(),
            });
        }

        let pipes = PipeConfig {
            advisor: env::var("PIPE_ADVISOR")
                .unwrap_or_else(|_| "learning-advisor-v1".to_string()),
            model: env::var("ADVISOR_MODEL")
                .unwrap_or_else(|_| "mistral:mistral-large-latest".to_string()),
        };

        Ok(Config {
            langbase,
            database,
            logging,
            request,
            pipes,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            advisor: "learning-advisor-v1".to_string(),
            model: "mistral:mistral-large-latest".to_string(),
        }
    }
}
