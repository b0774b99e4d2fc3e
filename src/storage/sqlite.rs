use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{MasteryFields, MasteryRecord, MasteryScore, MasteryStore};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const UPSERT_MASTERY: &str = r#"
    INSERT INTO mastery_scores (
        user_id, node_id, mastery_score, revisit_count, total_time_spent,
        subtopics_explored, content_read_pct, last_visited, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(user_id, node_id) DO UPDATE SET
        mastery_score = excluded.mastery_score,
        revisit_count = excluded.revisit_count,
        total_time_spent = excluded.total_time_spent,
        subtopics_explored = excluded.subtopics_explored,
        content_read_pct = excluded.content_read_pct,
        last_visited = excluded.last_visited,
        updated_at = excluded.updated_at
    RETURNING user_id, node_id, mastery_score, revisit_count, total_time_spent,
              subtopics_explored, content_read_pct, last_visited, updated_at
"#;

/// SQLite-backed mastery store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory store (single connection, lives as long as the pool)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // Every new connection to :memory: is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// The underlying pool, closed on shutdown.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MasteryStore for SqliteStorage {
    async fn upsert(
        &self,
        user_id: &str,
        node_id: &str,
        fields: MasteryFields,
    ) -> StorageResult<MasteryRecord> {
        let now = Utc::now().to_rfc3339();

        let row: MasteryRow = sqlx::query_as(UPSERT_MASTERY)
            .bind(user_id)
            .bind(node_id)
            .bind(fields.mastery_score)
            .bind(i64::from(fields.revisit_count))
            .bind(i64::from(fields.total_time_spent))
            .bind(i64::from(fields.subtopics_explored))
            .bind(fields.content_read_pct)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        debug!(
            user_id = %user_id,
            node_id = %node_id,
            mastery_score = fields.mastery_score,
            "Mastery upserted"
        );

        row.try_into()
    }

    async fn get_mastery(
        &self,
        user_id: &str,
        node_id: &str,
    ) -> StorageResult<Option<MasteryRecord>> {
        let row: Option<MasteryRow> = sqlx::query_as(
            r#"
            SELECT user_id, node_id, mastery_score, revisit_count, total_time_spent,
                   subtopics_explored, content_read_pct, last_visited, updated_at
            FROM mastery_scores
            WHERE user_id = ? AND node_id = ?
            "#,
        )
        .bind(user_id)
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MasteryRecord::try_from).transpose()
    }

    async fn list_mastery(&self, user_id: &str) -> StorageResult<Vec<MasteryScore>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            r#"
            SELECT node_id, mastery_score
            FROM mastery_scores
            WHERE user_id = ?
            ORDER BY mastery_score ASC, node_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct MasteryRow {
    user_id: String,
    node_id: String,
    mastery_score: f64,
    revisit_count: i64,
    total_time_spent: i64,
    subtopics_explored: i64,
    content_read_pct: f64,
    last_visited: Option<String>,
    updated_at: String,
}

impl TryFrom<MasteryRow> for MasteryRecord {
    type Error = StorageError;

    fn try_from(row: MasteryRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| StorageError::CorruptRecord {
            user_id: row.user_id.clone(),
            node_id: row.node_id.clone(),
            message,
        };
        let count = |name: &str, value: i64| {
            u32::try_from(value).map_err(|_| corrupt(format!("{} out of range: {}", name, value)))
        };
        let timestamp = |name: &str, value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("{} is not RFC 3339: {}", name, e)))
        };

        let fields = MasteryFields {
            mastery_score: row.mastery_score,
            revisit_count: count("revisit_count", row.revisit_count)?,
            total_time_spent: count("total_time_spent", row.total_time_spent)?,
            subtopics_explored: count("subtopics_explored", row.subtopics_explored)?,
            content_read_pct: row.content_read_pct,
        };
        let last_visited = row
            .last_visited
            .as_deref()
            .map(|v| timestamp("last_visited", v))
            .transpose()?;
        let updated_at = timestamp("updated_at", &row.updated_at)?;

        Ok(Self {
            user_id: row.user_id,
            node_id: row.node_id,
            fields,
            last_visited,
            updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    node_id: String,
    mastery_score: f64,
}

impl From<ScoreRow> for MasteryScore {
    fn from(row: ScoreRow) -> Self {
        Self {
            node_id: row.node_id,
            mastery_score: row.mastery_score,
        }
    }
}
