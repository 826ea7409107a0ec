//! Persistence synchronizer.
//!
//! Mirrors committed tree snapshots and metadata edits into the sphere
//! document store. Writes are best effort: a failure is logged and the
//! next successful write supersedes it. Local state is never rolled back.

use crate::database::SphereRepository;
use crate::errors::PersistenceError;
use crate::models::SphereUpdate;
use crate::tree::TreeStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sphere fields edited keystroke by keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    Title,
    Description,
}

impl EditableField {
    fn to_update(self, value: String) -> SphereUpdate {
        match self {
            EditableField::Title => SphereUpdate::title(value),
            EditableField::Description => SphereUpdate::description(value),
        }
    }
}

pub struct SphereSynchronizer {
    repository: Arc<dyn SphereRepository>,
    user_id: String,
    debounce: Duration,
    pending: Mutex<HashMap<EditableField, JoinHandle<()>>>,
}

impl SphereSynchronizer {
    pub fn new(repository: Arc<dyn SphereRepository>, user_id: impl Into<String>, debounce: Duration) -> Self {
        Self {
            repository,
            user_id: user_id.into(),
            debounce,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Write the tree after every commit the store makes from now on, as
    /// long as a sphere is attached. Ends when the store is dropped.
    pub fn watch_tree(&self, store: &Arc<TreeStore>) -> JoinHandle<()> {
        let mut snapshots = store.subscribe();
        let store = Arc::downgrade(store);
        let repository = self.repository.clone();
        let user_id = self.user_id.clone();

        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                // Sphere id and tree come from one locked read, never two.
                let Some((sphere_id, root)) = store.upgrade().and_then(|s| s.root_document()) else {
                    continue;
                };

                let update = SphereUpdate::root_node(root);
                if let Err(e) = repository.update_sphere(&user_id, &sphere_id, &update).await {
                    log::warn!("Failed to persist tree of sphere {}: {}", sphere_id, e);
                }
            }
            log::debug!("Tree watcher for user {} stopped", user_id);
        })
    }

    /// Write `update` now.
    pub async fn push(&self, sphere_id: &str, update: &SphereUpdate) -> Result<(), PersistenceError> {
        self.repository
            .update_sphere(&self.user_id, sphere_id, update)
            .await
            .inspect_err(|e| log::warn!("Failed to update sphere {}: {}", sphere_id, e))
    }

    /// Schedule a write of `value` to `field` once edits to that field have
    /// been quiet for the debounce period. A newer edit cancels the older one.
    pub fn debounce_field(&self, sphere_id: &str, field: EditableField, value: String) {
        let repository = self.repository.clone();
        let user_id = self.user_id.clone();
        let sphere_id = sphere_id.to_string();
        let delay = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let update = field.to_update(value);
            if let Err(e) = repository.update_sphere(&user_id, &sphere_id, &update).await {
                log::warn!("Failed to persist {:?} of sphere {}: {}", field, sphere_id, e);
            }
        });

        if let Some(previous) = self.pending.lock().insert(field, handle) {
            previous.abort();
        }
    }

    /// Fields with a write still scheduled.
    pub fn pending_fields(&self) -> usize {
        self.pending.lock().values().filter(|h| !h.is_finished()).count()
    }

    /// Drop every scheduled field write.
    pub fn cancel_pending(&self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }
}

impl Drop for SphereSynchronizer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
