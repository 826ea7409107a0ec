use crate::models::{Sphere, Track};
use crate::providers::NewPlaylist;
use serde::{Deserialize, Serialize};

/// A playlist written from a sphere's selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedPlaylist {
    pub id: String,
    pub external_url: Option<String>,
    pub track_count: usize,
}

impl From<&Sphere> for NewPlaylist {
    fn from(sphere: &Sphere) -> Self {
        NewPlaylist {
            name: sphere.title.clone(),
            description: sphere.description.clone(),
        }
    }
}

/// Playlist URIs for `tracks`, order preserved.
pub fn track_uris(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.uri.clone()).collect()
}
