//! SQLite-backed sphere documents.
//!
//! Each sphere is one row; the tree is stored in `root_node` as a flat JSON
//! list of node records, so deep trees load as easily as shallow ones.

use super::repository::SphereRepository;
use crate::errors::PersistenceError;
use crate::models::{Sphere, SphereUpdate, DEFAULT_SPHERE_TITLE};
use crate::tree::TreeNode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SphereRow {
    id: String,
    title: String,
    description: String,
    playlist_id: Option<String>,
    playlist_url: Option<String>,
    created_at: i64, // epoch millis
    last_edited_at: i64,
    root_node: String,
}

impl TryFrom<SphereRow> for Sphere {
    type Error = PersistenceError;

    fn try_from(row: SphereRow) -> Result<Self, Self::Error> {
        let root_node: TreeNode = serde_json::from_str(&row.root_node).map_err(|e| {
            PersistenceError::Serialization(format!(
                "Failed to deserialize root node of sphere {}: {}",
                row.id, e
            ))
        })?;

        Ok(Sphere {
            id: row.id,
            title: row.title,
            description: row.description,
            playlist_id: row.playlist_id,
            playlist_url: row.playlist_url,
            created_at: DateTime::from_timestamp_millis(row.created_at).unwrap_or_else(Utc::now),
            last_edited_at: DateTime::from_timestamp_millis(row.last_edited_at)
                .unwrap_or_else(Utc::now),
            root_node,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqliteSphereStore {
    pool: Pool<Sqlite>,
}

impl SqliteSphereStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

const SELECT_SPHERE: &str = r#"
    SELECT id, title, description, playlist_id, playlist_url,
           created_at, last_edited_at, root_node
    FROM spheres
"#;

#[async_trait]
impl SphereRepository for SqliteSphereStore {
    async fn fetch_sphere(
        &self,
        user_id: &str,
        sphere_id: &str,
    ) -> Result<Option<Sphere>, PersistenceError> {
        let row = sqlx::query_as::<_, SphereRow>(&format!(
            "{} WHERE user_id = ? AND id = ?",
            SELECT_SPHERE
        ))
        .bind(user_id)
        .bind(sphere_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Sphere::try_from).transpose()
    }

    async fn fetch_spheres(&self, user_id: &str) -> Result<Vec<Sphere>, PersistenceError> {
        let rows = sqlx::query_as::<_, SphereRow>(&format!(
            "{} WHERE user_id = ? ORDER BY last_edited_at DESC",
            SELECT_SPHERE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Sphere::try_from).collect()
    }

    async fn fetch_spheres_count(&self, user_id: &str) -> Result<u64, PersistenceError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM spheres WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn create_sphere(
        &self,
        user_id: &str,
        root_node: &TreeNode,
    ) -> Result<Sphere, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let description = Sphere::default_description(&root_node.value);
        let root_json = serde_json::to_string(root_node)?;

        sqlx::query(
            r#"
            INSERT INTO spheres (id, user_id, title, description, created_at, last_edited_at, root_node)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(DEFAULT_SPHERE_TITLE)
        .bind(&description)
        .bind(now.timestamp_millis())
        .bind(now.timestamp_millis())
        .bind(&root_json)
        .execute(&self.pool)
        .await?;

        log::info!("Created sphere {} for user {}", id, user_id);

        self.fetch_sphere(user_id, &id)
            .await?
            .ok_or_else(|| PersistenceError::Internal(format!("Sphere {} vanished after insert", id)))
    }

    async fn update_sphere(
        &self,
        user_id: &str,
        sphere_id: &str,
        update: &SphereUpdate,
    ) -> Result<(), PersistenceError> {
        let root_json = update
            .root_node
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // last_edited_at never goes backwards, even if the clock does.
        let result = sqlx::query(
            r#"
            UPDATE spheres SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                playlist_id = COALESCE(?, playlist_id),
                playlist_url = COALESCE(?, playlist_url),
                root_node = COALESCE(?, root_node),
                last_edited_at = MAX(last_edited_at + 1, ?)
            WHERE user_id = ? AND id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.playlist_id)
        .bind(&update.playlist_url)
        .bind(&root_json)
        .bind(Utc::now().timestamp_millis())
        .bind(user_id)
        .bind(sphere_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(sphere_id.to_string()));
        }

        log::debug!("Updated sphere {} ({:?} fields)", sphere_id, update_fields(update));
        Ok(())
    }
}

fn update_fields(update: &SphereUpdate) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if update.title.is_some() {
        fields.push("title");
    }
    if update.description.is_some() {
        fields.push("description");
    }
    if update.playlist_id.is_some() {
        fields.push("playlistId");
    }
    if update.playlist_url.is_some() {
        fields.push("playlistUrl");
    }
    if update.root_node.is_some() {
        fields.push("rootNode");
    }
    fields
}
