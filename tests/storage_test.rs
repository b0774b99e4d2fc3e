//! Integration tests for SQLite storage layer
//!
//! Tests mastery persistence using in-memory and file-backed SQLite databases.

use std::sync::Arc;

use mastery_advisor::config::DatabaseConfig;
use mastery_advisor::storage::{MasteryFields, MasteryScore, MasteryStore, SqliteStorage};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn full_fields(score: f64) -> MasteryFields {
    MasteryFields::new(score)
        .with_revisits(4)
        .with_time_spent(1800)
        .with_subtopics(6)
        .with_content_read(55.5)
}

#[cfg(test)]
mod upsert_tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let storage = create_test_storage().await;

        let record = storage
            .upsert("u1", "algebra", full_fields(42.0))
            .await
            .unwrap();

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.node_id, "algebra");
        assert_eq!(record.fields, full_fields(42.0));
        assert!(record.last_visited.is_some());
    }

    #[tokio::test]
    async fn test_upsert_returns_what_get_reads() {
        let storage = create_test_storage().await;

        let written = storage
            .upsert("u1", "algebra", full_fields(42.0))
            .await
            .unwrap();
        let read = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();

        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let storage = create_test_storage().await;

        storage
            .upsert("u1", "algebra", full_fields(42.0))
            .await
            .unwrap();
        storage
            .upsert("u1", "algebra", full_fields(42.0))
            .await
            .unwrap();

        let record = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();
        assert_eq!(record.fields, full_fields(42.0));

        let scores = storage.list_mastery("u1").await.unwrap();
        assert_eq!(scores.len(), 1);
    }

    #[tokio::test]
    async fn test_last_write_wins_for_every_field() {
        let storage = create_test_storage().await;

        let first = storage
            .upsert("u1", "algebra", full_fields(42.0))
            .await
            .unwrap();
        let second = storage
            .upsert("u1", "algebra", MasteryFields::new(90.0))
            .await
            .unwrap();

        let record = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();
        assert_eq!(record.fields, MasteryFields::new(90.0));
        assert_eq!(record.fields.revisit_count, 0);
        assert_eq!(record.fields.content_read_pct, 0.0);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_boundary_scores_round_trip() {
        let storage = create_test_storage().await;

        storage
            .upsert("u1", "zero", MasteryFields::new(0.0))
            .await
            .unwrap();
        storage
            .upsert("u1", "full", MasteryFields::new(100.0))
            .await
            .unwrap();

        let zero = storage.get_mastery("u1", "zero").await.unwrap().unwrap();
        let full = storage.get_mastery("u1", "full").await.unwrap().unwrap();
        assert_eq!(zero.fields.mastery_score, 0.0);
        assert_eq!(full.fields.mastery_score, 100.0);
    }
}

#[cfg(test)]
mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_record() {
        let storage = create_test_storage().await;
        assert!(storage.get_mastery("u1", "algebra").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_unknown_user_is_empty() {
        let storage = create_test_storage().await;
        assert!(storage.list_mastery("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let storage = create_test_storage().await;

        storage
            .upsert("u1", "algebra", MasteryFields::new(10.0))
            .await
            .unwrap();
        storage
            .upsert("u2", "algebra", MasteryFields::new(80.0))
            .await
            .unwrap();
        storage
            .upsert("u1", "calculus", MasteryFields::new(50.0))
            .await
            .unwrap();

        let u1 = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();
        let u2 = storage.get_mastery("u2", "algebra").await.unwrap().unwrap();
        assert_eq!(u1.fields.mastery_score, 10.0);
        assert_eq!(u2.fields.mastery_score, 80.0);

        assert_eq!(
            storage.list_mastery("u2").await.unwrap(),
            vec![MasteryScore::new("algebra", 80.0)]
        );
        assert!(storage.get_mastery("u2", "calculus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ascending_regardless_of_write_order() {
        let storage = create_test_storage().await;

        for (node, score) in [("c", 65.0), ("a", 20.0), ("d", 99.0), ("b", 20.0), ("e", 0.0)] {
            storage
                .upsert("u1", node, MasteryFields::new(score))
                .await
                .unwrap();
        }

        let scores = storage.list_mastery("u1").await.unwrap();
        assert_eq!(
            scores,
            vec![
                MasteryScore::new("e", 0.0),
                MasteryScore::new("a", 20.0),
                MasteryScore::new("b", 20.0),
                MasteryScore::new("c", 65.0),
                MasteryScore::new("d", 99.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_reflects_overwrite() {
        let storage = create_test_storage().await;

        storage
            .upsert("u1", "a", MasteryFields::new(10.0))
            .await
            .unwrap();
        storage
            .upsert("u1", "b", MasteryFields::new(50.0))
            .await
            .unwrap();
        storage
            .upsert("u1", "a", MasteryFields::new(90.0))
            .await
            .unwrap();

        let nodes: Vec<String> = storage
            .list_mastery("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.node_id)
            .collect();
        assert_eq!(nodes, vec!["b".to_string(), "a".to_string()]);
    }
}

#[cfg(test)]
mod file_backed_tests {
    use super::*;

    async fn create_file_storage(dir: &tempfile::TempDir) -> SqliteStorage {
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("mastery.db"),
            max_connections: 5,
        };
        SqliteStorage::new(&config)
            .await
            .expect("Failed to create file storage")
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let storage = create_file_storage(&dir).await;
            storage
                .upsert("u1", "algebra", full_fields(33.0))
                .await
                .unwrap();
            storage.pool().close().await;
        }

        let storage = create_file_storage(&dir).await;
        let record = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();
        assert_eq!(record.fields, full_fields(33.0));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_same_key_never_mix_fields() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(create_file_storage(&dir).await);

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let fields = MasteryFields::new(f64::from(i * 5))
                    .with_revisits(i)
                    .with_time_spent(i * 10)
                    .with_subtopics(i)
                    .with_content_read(f64::from(i * 5));
                storage.upsert("u1", "algebra", fields).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = storage.get_mastery("u1", "algebra").await.unwrap().unwrap();
        let i = record.fields.revisit_count;
        assert!(i < 20);
        assert_eq!(record.fields.mastery_score, f64::from(i * 5));
        assert_eq!(record.fields.total_time_spent, i * 10);
        assert_eq!(record.fields.subtopics_explored, i);
        assert_eq!(record.fields.content_read_pct, f64::from(i * 5));
        assert_eq!(storage.list_mastery("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_distinct_keys_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(create_file_storage(&dir).await);

        let mut handles = Vec::new();
        for i in 0..10u32 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .upsert("u1", &format!("node-{}", i), MasteryFields::new(f64::from(i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(storage.list_mastery("u1").await.unwrap().len(), 10);
    }
}
