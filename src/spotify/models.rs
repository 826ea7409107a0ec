use crate::models::{Album, Artist, Track};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Track object as returned by the Web API (recommendations, search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub album: SpotifyAlbum,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

impl From<SpotifyTrack> for Track {
    fn from(t: SpotifyTrack) -> Self {
        // Images come largest first.
        let image_url = t.album.images.first().map(|i| i.url.clone());
        Track {
            id: t.id,
            name: t.name,
            preview_url: t.preview_url,
            uri: t.uri,
            duration_ms: t.duration_ms,
            album: Album {
                id: t.album.id,
                name: t.album.name,
                image_url,
                external_url: t.album.external_urls.spotify,
            },
            artists: t
                .artists
                .into_iter()
                .map(|a| Artist {
                    id: a.id,
                    name: a.name,
                    external_url: a.external_urls.spotify,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Paging<SpotifyTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistBody<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackUrisBody<'a> {
    pub uris: &'a [String],
}

/// Error types for Spotify operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpotifyError {
    NetworkError(String),
    ParseError(String),
    ApiError(String),
    NotFound(String),
    Unauthorized,
    RateLimited,
}

impl std::fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotifyError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            SpotifyError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SpotifyError::ApiError(msg) => write!(f, "API error: {}", msg),
            SpotifyError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SpotifyError::Unauthorized => write!(f, "Access token rejected by Spotify"),
            SpotifyError::RateLimited => write!(f, "Rate limited by Spotify"),
        }
    }
}

impl std::error::Error for SpotifyError {}

impl From<reqwest::Error> for SpotifyError {
    fn from(err: reqwest::Error) -> Self {
        SpotifyError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for SpotifyError {
    fn from(err: serde_json::Error) -> Self {
        SpotifyError::ParseError(err.to_string())
    }
}
