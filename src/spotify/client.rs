use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::models::*;
use crate::config::SpotifyConfig;
use crate::models::Track;
use crate::providers::{
    NewPlaylist, PlaylistProvider, PlaylistRef, RecommendationProvider, RecommendationQuery,
};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Most URIs the Web API accepts in one playlist write.
pub const MAX_URIS_PER_REQUEST: usize = 100;

/// Spotify Web API adapter for recommendations, search and playlists.
///
/// The access token is an opaque credential handed over by whatever runs the
/// auth flow; `set_access_token` swaps it after a refresh.
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: RwLock<String>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig, access_token: impl Into<String>) -> Result<Self, SpotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: RwLock::new(access_token.into()),
        })
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write() = token.into();
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
        operation: &str,
    ) -> Result<Value, SpotifyError> {
        let url = format!("{}{}", self.base_url, path);
        let url = reqwest::Url::parse_with_params(&url, params)
            .map_err(|e| SpotifyError::NetworkError(format!("URL parse error: {}", e)))?;

        log::debug!("{} {} ({})", method, url, operation);

        let token = self.access_token.read().clone();
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        match status {
            StatusCode::UNAUTHORIZED => {
                log::warn!("{} rejected: access token expired or invalid", operation);
                return Err(SpotifyError::Unauthorized);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                log::warn!("Rate limited (429) during {}", operation);
                return Err(SpotifyError::RateLimited);
            }
            StatusCode::NOT_FOUND => {
                return Err(SpotifyError::NotFound(operation.to_string()));
            }
            s if !s.is_success() => {
                log::warn!("{} failed ({}): {}", operation, s, text);
                return Err(SpotifyError::ApiError(format!("HTTP {} - {}", s, text)));
            }
            _ => {}
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| SpotifyError::ParseError(format!("JSON error in {}: {}", operation, e)))
    }

    fn decode<T: DeserializeOwned>(data: Value, operation: &str) -> Result<T, SpotifyError> {
        serde_json::from_value(data).map_err(|e| {
            log::error!("Failed to deserialize {} response: {}", operation, e);
            SpotifyError::ParseError(format!("{}: {}", operation, e))
        })
    }

    pub async fn recommendations(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Vec<Track>, SpotifyError> {
        let limit = query.limit.to_string();
        let seeds = query.seed_param();
        let data = self
            .request::<()>(
                Method::GET,
                "/recommendations",
                &[("limit", limit.as_str()), ("seed_tracks", seeds.as_str())],
                None,
                "recommendations",
            )
            .await?;

        let response: RecommendationsResponse = Self::decode(data, "recommendations")?;
        Ok(response.tracks.into_iter().map(Track::from).collect())
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, SpotifyError> {
        let limit = limit.to_string();
        let data = self
            .request::<()>(
                Method::GET,
                "/search",
                &[("q", query), ("type", "track"), ("limit", limit.as_str())],
                None,
                "search_tracks",
            )
            .await?;

        let response: SearchResponse = Self::decode(data, "search_tracks")?;
        Ok(response
            .tracks
            .map(|page| page.items.into_iter().map(Track::from).collect())
            .unwrap_or_default())
    }

    pub async fn create_user_playlist(
        &self,
        owner_id: &str,
        details: &NewPlaylist,
    ) -> Result<PlaylistRef, SpotifyError> {
        let body = CreatePlaylistBody {
            name: &details.name,
            description: &details.description,
            public: false,
        };
        let data = self
            .request(
                Method::POST,
                &format!("/users/{}/playlists", owner_id),
                &[],
                Some(&body),
                "create_playlist",
            )
            .await?;

        let playlist: SpotifyPlaylist = Self::decode(data, "create_playlist")?;
        log::info!("Created Spotify playlist {}", playlist.id);
        Ok(PlaylistRef {
            id: playlist.id,
            external_url: playlist.external_urls.spotify,
        })
    }

    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), SpotifyError> {
        self.write_tracks(playlist_id, write_plan(uris, false), "add_tracks")
            .await
    }

    /// Replace the playlist's tracks. The first chunk replaces, the rest append.
    pub async fn replace_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), SpotifyError> {
        self.write_tracks(playlist_id, write_plan(uris, true), "replace_tracks")
            .await
    }

    async fn write_tracks(
        &self,
        playlist_id: &str,
        plan: Vec<(Method, &[String])>,
        operation: &str,
    ) -> Result<(), SpotifyError> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        for (method, chunk) in plan {
            self.request(method, &path, &[], Some(&TrackUrisBody { uris: chunk }), operation)
                .await?;
        }
        Ok(())
    }
}

/// Requests needed to write `uris` to a playlist, at most
/// [`MAX_URIS_PER_REQUEST`] each. A replace always starts with one PUT,
/// even for an empty list; everything else is appended with POST.
fn write_plan(uris: &[String], replace: bool) -> Vec<(Method, &[String])> {
    let mut plan = Vec::new();
    let mut rest = uris;
    if replace {
        let (first, tail) = uris.split_at(uris.len().min(MAX_URIS_PER_REQUEST));
        plan.push((Method::PUT, first));
        rest = tail;
    }
    plan.extend(rest.chunks(MAX_URIS_PER_REQUEST).map(|chunk| (Method::POST, chunk)));
    plan
}

#[async_trait]
impl RecommendationProvider for SpotifyClient {
    fn id(&self) -> &str {
        "spotify"
    }

    async fn get_recommendations(&self, query: &RecommendationQuery) -> anyhow::Result<Vec<Track>> {
        Ok(self.recommendations(query).await?)
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Track>> {
        Ok(self.search(query, limit).await?)
    }
}

#[async_trait]
impl PlaylistProvider for SpotifyClient {
    fn id(&self) -> &str {
        "spotify"
    }

    async fn create_playlist(&self, owner_id: &str, details: &NewPlaylist) -> anyhow::Result<PlaylistRef> {
        Ok(self.create_user_playlist(owner_id, details).await?)
    }

    async fn add_tracks_to_playlist(&self, playlist_id: &str, uris: &[String]) -> anyhow::Result<()> {
        Ok(self.add_tracks(playlist_id, uris).await?)
    }

    async fn replace_tracks_in_playlist(&self, playlist_id: &str, uris: &[String]) -> anyhow::Result<()> {
        Ok(self.replace_tracks(playlist_id, uris).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = SpotifyConfig {
            api_base_url: "http://localhost:9999/v1/".to_string(),
            request_timeout_secs: 1,
        };
        let client = SpotifyClient::new(&config, "token").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }

    fn uris(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("spotify:track:{}", i)).collect()
    }

    fn shape(plan: &[(Method, &[String])]) -> Vec<(Method, usize)> {
        plan.iter().map(|(m, chunk)| (m.clone(), chunk.len())).collect()
    }

    #[test]
    fn test_replace_plan_chunks() {
        assert_eq!(shape(&write_plan(&[], true)), vec![(Method::PUT, 0)]);
        assert_eq!(shape(&write_plan(&uris(100), true)), vec![(Method::PUT, 100)]);
        assert_eq!(
            shape(&write_plan(&uris(101), true)),
            vec![(Method::PUT, 100), (Method::POST, 1)]
        );
        assert_eq!(
            shape(&write_plan(&uris(250), true)),
            vec![(Method::PUT, 100), (Method::POST, 100), (Method::POST, 50)]
        );
    }

    #[test]
    fn test_add_plan_chunks_and_keeps_order() {
        assert!(write_plan(&[], false).is_empty());
        let all = uris(250);
        let plan = write_plan(&all, false);
        assert_eq!(
            shape(&plan),
            vec![(Method::POST, 100), (Method::POST, 100), (Method::POST, 50)]
        );
        let rejoined: Vec<String> = plan.iter().flat_map(|(_, c)| c.iter().cloned()).collect();
        assert_eq!(rejoined, all);
    }

    #[test]
    fn test_token_swap() {
        let client = SpotifyClient::new(&SpotifyConfig::default(), "old").unwrap();
        client.set_access_token("new");
        assert_eq!(*client.access_token.read(), "new");
    }

    #[test]
    fn test_parse_errors_classified_as_malformed() {
        use crate::recommendations::RecommendationError;

        let err = anyhow::Error::from(SpotifyError::ParseError("bad".to_string()));
        assert!(matches!(
            RecommendationError::from(err),
            RecommendationError::MalformedResponse(_)
        ));

        let err = anyhow::Error::from(SpotifyError::RateLimited);
        assert!(matches!(
            RecommendationError::from(err),
            RecommendationError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = SpotifyConfig {
            api_base_url: "http://127.0.0.1:9/v1".to_string(),
            request_timeout_secs: 1,
        };
        let client = SpotifyClient::new(&config, "token").unwrap();
        let result = client
            .recommendations(&RecommendationQuery::new(10, vec!["a".to_string()]))
            .await;
        assert!(matches!(result, Err(SpotifyError::NetworkError(_))));
    }
}
