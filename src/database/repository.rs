use crate::errors::PersistenceError;
use crate::models::{Sphere, SphereUpdate};
use crate::tree::TreeNode;
use async_trait::async_trait;

/// Per-user collection of sphere documents.
///
/// Timestamps are assigned by the store and are authoritative; every
/// update stamps `last_edited_at`.
#[async_trait]
pub trait SphereRepository: Send + Sync {
    async fn fetch_sphere(
        &self,
        user_id: &str,
        sphere_id: &str,
    ) -> Result<Option<Sphere>, PersistenceError>;

    /// Most recently edited first.
    async fn fetch_spheres(&self, user_id: &str) -> Result<Vec<Sphere>, PersistenceError>;

    async fn fetch_spheres_count(&self, user_id: &str) -> Result<u64, PersistenceError>;

    /// Store a new sphere around `root_node`. The store picks the id,
    /// timestamps, and default title/description.
    async fn create_sphere(
        &self,
        user_id: &str,
        root_node: &TreeNode,
    ) -> Result<Sphere, PersistenceError>;

    /// Merge the set fields of `update` into the document.
    async fn update_sphere(
        &self,
        user_id: &str,
        sphere_id: &str,
        update: &SphereUpdate,
    ) -> Result<(), PersistenceError>;
}
