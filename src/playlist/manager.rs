use super::models::{track_uris, MaterializedPlaylist};
use crate::errors::PlaylistError;
use crate::models::{Sphere, Track};
use crate::providers::{NewPlaylist, PlaylistProvider};
use std::sync::Arc;

/// Turns a sphere's selected tracks into a playlist on the external service.
pub struct PlaylistManager {
    provider: Arc<dyn PlaylistProvider>,
}

impl PlaylistManager {
    pub fn new(provider: Arc<dyn PlaylistProvider>) -> Self {
        Self { provider }
    }

    /// Create a playlist named after the sphere and fill it with `tracks`.
    pub async fn create_playlist(
        &self,
        owner_id: &str,
        sphere: &Sphere,
        tracks: &[Track],
    ) -> Result<MaterializedPlaylist, PlaylistError> {
        let details = NewPlaylist::from(sphere);
        let playlist = self.provider.create_playlist(owner_id, &details).await?;

        let uris = track_uris(tracks);
        if !uris.is_empty() {
            self.provider
                .add_tracks_to_playlist(&playlist.id, &uris)
                .await?;
        }

        log::info!(
            "Created playlist {} for sphere {} with {} tracks",
            playlist.id,
            sphere.id,
            uris.len()
        );

        Ok(MaterializedPlaylist {
            id: playlist.id,
            external_url: playlist.external_url,
            track_count: uris.len(),
        })
    }

    /// Replace the whole track list of the sphere's linked playlist.
    pub async fn update_playlist(
        &self,
        sphere: &Sphere,
        tracks: &[Track],
    ) -> Result<MaterializedPlaylist, PlaylistError> {
        let playlist_id = sphere
            .playlist_id
            .as_deref()
            .ok_or_else(|| PlaylistError::MissingPlaylist(sphere.id.clone()))?;

        let uris = track_uris(tracks);
        self.provider
            .replace_tracks_in_playlist(playlist_id, &uris)
            .await?;

        log::info!(
            "Replaced tracks of playlist {} with {} tracks",
            playlist_id,
            uris.len()
        );

        Ok(MaterializedPlaylist {
            id: playlist_id.to_string(),
            external_url: sphere.playlist_url.clone(),
            track_count: uris.len(),
        })
    }
}
