use super::types::{NewPlaylist, PlaylistRef, RecommendationQuery};
use crate::models::Track;
use anyhow::Result;
use async_trait::async_trait;

/// Source of recommended tracks.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    /// Unique identifier (e.g., "spotify")
    fn id(&self) -> &str;

    /// Tracks related to the query's seed tracks. May return fewer than
    /// `query.limit`, duplicates, or tracks without previews; filtering is
    /// the caller's job.
    async fn get_recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>>;

    /// Free-text track search, used to pick a sphere's first track.
    async fn search_tracks(&self, _query: &str, _limit: usize) -> Result<Vec<Track>> {
        Err(anyhow::anyhow!("Not implemented"))
    }
}

/// External playlist service.
#[async_trait]
pub trait PlaylistProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn create_playlist(&self, owner_id: &str, details: &NewPlaylist) -> Result<PlaylistRef>;

    /// Append `uris` in order.
    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<()>;

    /// Replace the whole track list with `uris`.
    async fn replace_tracks_in_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<()>;
}
