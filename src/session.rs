//! A user's exploration session.
//!
//! Wires the tree store, recommendation engine, playlist manager and
//! synchronizer together for one signed-in user. Everything is passed in
//! explicitly; nothing is looked up from global state.

use crate::config::SphereConfig;
use crate::database::SphereRepository;
use crate::errors::{PersistenceError, PlaylistError};
use crate::models::{Sphere, SphereUpdate, Track};
use crate::playlist::{MaterializedPlaylist, PlaylistManager};
use crate::providers::{PlaylistProvider, RecommendationProvider};
use crate::recommendations::{Expansion, RecommendationEngine, RecommendationError, ReloadOutcome};
use crate::spotify::{SpotifyClient, SpotifyError};
use crate::sync::{EditableField, SphereSynchronizer};
use crate::tree::{DeleteOutcome, NodeId, TreeNode, TreeStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The signed-in user. The token is opaque here; whatever ran the auth
/// flow produced it.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: String,
    pub access_token: String,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

pub struct SphereSession {
    user: UserSession,
    store: Arc<TreeStore>,
    engine: RecommendationEngine,
    playlists: PlaylistManager,
    repository: Arc<dyn SphereRepository>,
    sync: SphereSynchronizer,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SphereSession {
    pub fn new(
        user: UserSession,
        recommendations: Arc<dyn RecommendationProvider>,
        playlists: Arc<dyn PlaylistProvider>,
        repository: Arc<dyn SphereRepository>,
        config: &SphereConfig,
    ) -> Self {
        let sync = SphereSynchronizer::new(
            repository.clone(),
            user.user_id.clone(),
            Duration::from_millis(config.persistence.debounce_ms),
        );

        Self {
            engine: RecommendationEngine::new(recommendations, config.recommendations.clone()),
            playlists: PlaylistManager::new(playlists),
            store: Arc::new(TreeStore::new()),
            repository,
            sync,
            user,
            watcher: Mutex::new(None),
        }
    }

    /// A session backed by the Spotify Web API for recommendations and playlists.
    pub fn with_spotify(
        user: UserSession,
        repository: Arc<dyn SphereRepository>,
        config: &SphereConfig,
    ) -> Result<Self, SpotifyError> {
        let client = Arc::new(SpotifyClient::new(&config.spotify, user.access_token.clone())?);
        Ok(Self::new(user, client.clone(), client, repository, config))
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    pub fn store(&self) -> &Arc<TreeStore> {
        &self.store
    }

    pub fn sphere(&self) -> Option<Sphere> {
        self.store.sphere()
    }

    // ---- spheres ----

    pub async fn search_tracks(&self, query: &str) -> Result<Vec<Track>, RecommendationError> {
        self.engine.search_tracks(query).await
    }

    /// Start a new sphere rooted at `seed` and make it the active tree.
    pub async fn create_sphere(&self, seed: Track) -> Result<Sphere, PersistenceError> {
        let root = TreeNode::leaf(seed);
        let sphere = self
            .repository
            .create_sphere(&self.user.user_id, &root)
            .await?;
        self.activate(sphere.clone())?;
        Ok(sphere)
    }

    /// Load a stored sphere and make it the active tree. `None` if it does not exist.
    pub async fn open_sphere(&self, sphere_id: &str) -> Result<Option<Sphere>, PersistenceError> {
        let Some(sphere) = self
            .repository
            .fetch_sphere(&self.user.user_id, sphere_id)
            .await?
        else {
            log::warn!("Sphere {} not found for user {}", sphere_id, self.user.user_id);
            return Ok(None);
        };
        self.activate(sphere.clone())?;
        Ok(Some(sphere))
    }

    pub async fn list_spheres(&self) -> Result<Vec<Sphere>, PersistenceError> {
        self.repository.fetch_spheres(&self.user.user_id).await
    }

    pub async fn count_spheres(&self) -> Result<u64, PersistenceError> {
        self.repository.fetch_spheres_count(&self.user.user_id).await
    }

    fn activate(&self, sphere: Sphere) -> Result<(), PersistenceError> {
        if let Some(previous) = self.watcher.lock().take() {
            previous.abort();
        }
        self.sync.cancel_pending();

        let id = sphere.id.clone();
        self.store.initialize_tree(sphere)?;
        *self.watcher.lock() = Some(self.sync.watch_tree(&self.store));

        log::info!("Sphere {} is now active", id);
        Ok(())
    }

    /// Stop syncing and drop the active tree.
    pub fn close(&self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        self.sync.cancel_pending();
        self.store.clear();
    }

    // ---- tree actions ----

    /// Expand `node` by as many tracks as its position calls for.
    pub async fn expand(&self, node: &NodeId) -> Result<Expansion, RecommendationError> {
        let tree = self
            .store
            .root()
            .ok_or_else(|| RecommendationError::NodeNotFound(node.to_string()))?;
        let limit = RecommendationEngine::expand_limit(&tree, node);
        self.expand_with_limit(node, limit).await
    }

    pub async fn expand_with_limit(
        &self,
        node: &NodeId,
        limit: usize,
    ) -> Result<Expansion, RecommendationError> {
        self.engine.get_recommendations(&self.store, node, limit).await
    }

    pub async fn reload(&self, node: &NodeId) -> Result<ReloadOutcome, RecommendationError> {
        self.engine.reload(&self.store, node).await
    }

    pub fn select(&self, node: &NodeId) -> bool {
        self.store.select_node(node)
    }

    pub fn deselect(&self, node: &NodeId) -> bool {
        self.store.deselect_node(node)
    }

    pub fn delete(&self, node: &NodeId) -> DeleteOutcome {
        self.store.delete_node(node)
    }

    // ---- metadata ----

    pub fn edit_title(&self, title: impl Into<String>) {
        self.edit_field(EditableField::Title, title.into());
    }

    pub fn edit_description(&self, description: impl Into<String>) {
        self.edit_field(EditableField::Description, description.into());
    }

    fn edit_field(&self, field: EditableField, value: String) {
        let Some(sphere_id) = self.store.sphere_id() else {
            log::debug!("Ignoring {:?} edit, no sphere loaded", field);
            return;
        };
        let update = match field {
            EditableField::Title => SphereUpdate::title(value.clone()),
            EditableField::Description => SphereUpdate::description(value.clone()),
        };
        self.store.update_sphere_metadata(&update);
        self.sync.debounce_field(&sphere_id, field, value);
    }

    // ---- playlists ----

    /// Create a playlist from the current selection and link it to the sphere.
    pub async fn create_playlist(&self) -> Result<MaterializedPlaylist, PlaylistError> {
        let sphere = self.store.sphere().ok_or(PlaylistError::NoSphere)?;
        let tracks = self.store.get_track_list();

        let playlist = self
            .playlists
            .create_playlist(&self.user.user_id, &sphere, &tracks)
            .await?;

        let link = SphereUpdate::playlist(playlist.id.clone(), playlist.external_url.clone());
        self.store.update_sphere_metadata(&link);
        if self.sync.push(&sphere.id, &link).await.is_err() {
            log::debug!("Playlist {} linked locally only, store write failed", playlist.id);
        }

        Ok(playlist)
    }

    /// Overwrite the linked playlist with the current selection.
    pub async fn update_playlist(&self) -> Result<MaterializedPlaylist, PlaylistError> {
        let sphere = self.store.sphere().ok_or(PlaylistError::NoSphere)?;
        let tracks = self.store.get_track_list();
        self.playlists.update_playlist(&sphere, &tracks).await
    }
}

impl Drop for SphereSession {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseManager, SqliteSphereStore};
    use crate::models::fixtures::track;
    use crate::providers::stubs::{PlaylistCall, RecordingPlaylists, ScriptedRecommendations};

    struct Harness {
        session: SphereSession,
        recommendations: Arc<ScriptedRecommendations>,
        playlists: Arc<RecordingPlaylists>,
        repository: Arc<SqliteSphereStore>,
    }

    async fn harness() -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();
        let db = DatabaseManager::in_memory().await.unwrap();
        let repository = Arc::new(SqliteSphereStore::new(db.pool));
        let recommendations = Arc::new(ScriptedRecommendations::default());
        let playlists = Arc::new(RecordingPlaylists::default());
        let session = SphereSession::new(
            UserSession::new("u1", "token"),
            recommendations.clone(),
            playlists.clone(),
            repository.clone(),
            &SphereConfig::default(),
        );
        Harness {
            session,
            recommendations,
            playlists,
            repository,
        }
    }

    /// Poll the stored sphere until `done` holds or we give up.
    async fn stored_until<F>(h: &Harness, id: &str, done: F) -> Sphere
    where
        F: Fn(&Sphere) -> bool,
    {
        for _ in 0..200 {
            let stored = h.repository.fetch_sphere("u1", id).await.unwrap().unwrap();
            if done(&stored) {
                return stored;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sphere {} never reached the expected state", id);
    }

    #[tokio::test]
    async fn test_create_expand_persists_tree() {
        let h = harness().await;
        h.recommendations
            .push_batch(vec![track("A"), track("B"), track("C"), track("D")]);

        let sphere = h.session.create_sphere(track("T0")).await.unwrap();
        let root = sphere.root_node.id.clone();
        let expansion = h.session.expand(&root).await.unwrap();
        assert_eq!(expansion.added.len(), 4, "root expands by four");

        let stored = stored_until(&h, &sphere.id, |s| s.root_node.children.len() == 4).await;
        assert!(stored.root_node.selected);
        assert_eq!(h.session.count_spheres().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reopen_resumes_tree() {
        let h = harness().await;
        h.recommendations.push_batch(vec![track("A")]);
        let sphere = h.session.create_sphere(track("T0")).await.unwrap();
        h.session
            .expand_with_limit(&sphere.root_node.id, 1)
            .await
            .unwrap();
        stored_until(&h, &sphere.id, |s| s.root_node.children.len() == 1).await;

        h.session.close();
        assert!(h.session.store().root().is_none());

        let reopened = h.session.open_sphere(&sphere.id).await.unwrap().unwrap();
        assert_eq!(reopened.root_node.children[0].value.name, "A");
        assert_eq!(h.session.store().get_tracks().len(), 2);
        assert!(h.session.open_sphere("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_title_edit_is_local_then_persisted() {
        let h = harness().await;
        let sphere = h.session.create_sphere(track("T0")).await.unwrap();

        h.session.edit_title("Late");
        h.session.edit_title("Late Night");
        assert_eq!(h.session.sphere().unwrap().title, "Late Night");

        let stored = stored_until(&h, &sphere.id, |s| s.title == "Late Night").await;
        assert_eq!(stored.description, sphere.description);
    }

    #[tokio::test]
    async fn test_playlist_round_trip_links_sphere() {
        let h = harness().await;
        let sphere = h.session.create_sphere(track("T0")).await.unwrap();
        let root = sphere.root_node.id.clone();

        assert!(matches!(
            h.session.update_playlist().await,
            Err(PlaylistError::MissingPlaylist(_))
        ));

        let added = h
            .session
            .store()
            .add_children_to_node(&root, vec![track("A"), track("B")])
            .unwrap();
        h.session.select(&added[1]);

        let playlist = h.session.create_playlist().await.unwrap();
        assert_eq!(playlist.track_count, 2);
        {
            let calls = h.playlists.calls.lock();
            assert_eq!(
                calls[1],
                PlaylistCall::Add {
                    playlist: "pl-1".to_string(),
                    uris: vec!["spotify:track:T0".to_string(), "spotify:track:B".to_string()],
                }
            );
        }

        let linked = h.session.sphere().unwrap();
        assert_eq!(linked.playlist_id.as_deref(), Some("pl-1"));
        stored_until(&h, &sphere.id, |s| s.playlist_id.as_deref() == Some("pl-1")).await;

        h.session.deselect(&added[1]);
        let updated = h.session.update_playlist().await.unwrap();
        assert_eq!(updated.track_count, 1);
    }

    #[tokio::test]
    async fn test_delete_root_keeps_descendants() {
        let h = harness().await;
        let sphere = h.session.create_sphere(track("R")).await.unwrap();
        let root = sphere.root_node.id.clone();
        let kids = h
            .session
            .store()
            .add_children_to_node(&root, vec![track("A"), track("B")])
            .unwrap();
        h.session
            .store()
            .add_children_to_node(&kids[0], vec![track("C")]);

        let outcome = h.session.delete(&root);
        let DeleteOutcome::RootPromoted(new_root) = outcome else {
            panic!("expected promotion, got {:?}", outcome);
        };

        let tree = h.session.store().root().unwrap();
        let names: Vec<String> = tree
            .children(&new_root)
            .iter()
            .map(|n| n.value.name.clone())
            .collect();
        assert_eq!(names, vec!["C", "B"]);
        assert!(tree.is_consistent());
    }

    #[tokio::test]
    async fn test_expand_without_tree() {
        let h = harness().await;
        let result = h.session.expand(&NodeId::from("x")).await;
        assert!(matches!(result, Err(RecommendationError::NodeNotFound(_))));
        assert!(matches!(
            h.session.create_playlist().await,
            Err(PlaylistError::NoSphere)
        ));
    }
}
