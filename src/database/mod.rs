pub mod repository;
pub mod spheres;

pub use repository::SphereRepository;
pub use spheres::SqliteSphereStore;

use crate::config::PersistenceConfig;
use crate::errors::PersistenceError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::Path;

pub struct DatabaseManager {
    pub pool: Pool<Sqlite>,
}

impl DatabaseManager {
    pub async fn new(db_path: &Path) -> Result<Self, PersistenceError> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| PersistenceError::Internal(e.to_string()))?;
            }
        }

        log::info!("Connecting to database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await?;

        Self::with_pool(pool).await
    }

    /// Open the database file named in `config`.
    pub async fn from_config(config: &PersistenceConfig) -> Result<Self, PersistenceError> {
        Self::new(&config.database_path).await
    }

    /// A private in-memory database. One connection, since each SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, PersistenceError> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&pool).await.map_err(|e| {
                    PersistenceError::Database(format!(
                        "Failed to execute schema statement '{}': {}",
                        stmt, e
                    ))
                })?;
            }
        }

        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::track;
    use crate::tree::TreeNode;

    #[tokio::test]
    async fn test_file_database_from_config_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = PersistenceConfig {
            database_path: dir.path().join("nested").join("spheres.db"),
            ..PersistenceConfig::default()
        };

        let sphere = {
            let db = DatabaseManager::from_config(&config).await.unwrap();
            let store = SqliteSphereStore::new(db.pool.clone());
            let sphere = store
                .create_sphere("u1", &TreeNode::leaf(track("A")))
                .await
                .unwrap();
            db.pool.close().await;
            sphere
        };
        assert!(config.database_path.exists());

        let db = DatabaseManager::from_config(&config).await.unwrap();
        let store = SqliteSphereStore::new(db.pool);
        let reopened = store.fetch_sphere("u1", &sphere.id).await.unwrap().unwrap();
        assert_eq!(reopened.root_node.value.name, "A");
    }
}
