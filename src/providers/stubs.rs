//! Scripted provider doubles shared by the unit tests.

use super::traits::{PlaylistProvider, RecommendationProvider};
use super::types::{NewPlaylist, PlaylistRef, RecommendationQuery};
use crate::models::Track;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Answers each call with the next scripted batch; an exhausted script
/// yields empty batches. `None` in the script makes that call fail.
#[derive(Default)]
pub struct ScriptedRecommendations {
    batches: Mutex<VecDeque<Option<Vec<Track>>>>,
    pub queries: Mutex<Vec<RecommendationQuery>>,
    pub search_results: Mutex<Vec<Track>>,
    pub searches: Mutex<Vec<(String, usize)>>,
}

impl ScriptedRecommendations {
    pub fn new(batches: Vec<Vec<Track>>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().map(Some).collect()),
            ..Default::default()
        }
    }

    pub fn push_failure(&self) {
        self.batches.lock().push_back(None);
    }

    pub fn push_batch(&self, batch: Vec<Track>) {
        self.batches.lock().push_back(Some(batch));
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl RecommendationProvider for ScriptedRecommendations {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn get_recommendations(&self, query: &RecommendationQuery) -> Result<Vec<Track>> {
        self.queries.lock().push(query.clone());
        match self.batches.lock().pop_front() {
            Some(Some(batch)) => Ok(batch),
            Some(None) => Err(anyhow::anyhow!("scripted provider failure")),
            None => Ok(Vec::new()),
        }
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        self.searches.lock().push((query.to_string(), limit));
        Ok(self.search_results.lock().iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistCall {
    Create { owner: String, details: NewPlaylist },
    Add { playlist: String, uris: Vec<String> },
    Replace { playlist: String, uris: Vec<String> },
}

/// Records every call; fails creation when `fail_create` is set.
#[derive(Default)]
pub struct RecordingPlaylists {
    pub calls: Mutex<Vec<PlaylistCall>>,
    pub fail_create: bool,
}

#[async_trait]
impl PlaylistProvider for RecordingPlaylists {
    fn id(&self) -> &str {
        "recording"
    }

    async fn create_playlist(&self, owner_id: &str, details: &NewPlaylist) -> Result<PlaylistRef> {
        if self.fail_create {
            anyhow::bail!("playlist service unavailable");
        }
        self.calls.lock().push(PlaylistCall::Create {
            owner: owner_id.to_string(),
            details: details.clone(),
        });
        Ok(PlaylistRef {
            id: "pl-1".to_string(),
            external_url: Some("https://open.spotify.com/playlist/pl-1".to_string()),
        })
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.calls.lock().push(PlaylistCall::Add {
            playlist: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        Ok(())
    }

    async fn replace_tracks_in_playlist(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.calls.lock().push(PlaylistCall::Replace {
            playlist: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        Ok(())
    }
}
