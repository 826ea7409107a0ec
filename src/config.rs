use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Candidates requested from the provider per attempt, regardless of remaining need.
pub const RECOMMENDATION_BATCH_SIZE: usize = 10;
pub const RECOMMENDATION_MAX_ATTEMPTS: usize = 2;
/// The node itself plus up to four ancestors.
pub const MAX_SEED_TRACKS: usize = 5;
pub const SEARCH_LIMIT: usize = 5;

/// Quiet period before a title/description edit is written.
pub const FIELD_DEBOUNCE_MS: u64 = 500;

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spheres")
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub batch_size: usize,
    pub max_attempts: usize,
    pub max_seed_tracks: usize,
    pub search_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            batch_size: RECOMMENDATION_BATCH_SIZE,
            max_attempts: RECOMMENDATION_MAX_ATTEMPTS,
            max_seed_tracks: MAX_SEED_TRACKS,
            search_limit: SEARCH_LIMIT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub debounce_ms: u64,
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: FIELD_DEBOUNCE_MS,
            database_path: get_config_dir().join("spheres.db"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base_url: SPOTIFY_API_BASE_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub recommendations: RecommendationConfig,
    pub persistence: PersistenceConfig,
    pub spotify: SpotifyConfig,
}

impl SphereConfig {
    /// Load from the default config file location.
    pub fn load() -> Self {
        Self::load_from(&get_config_file_path())
    }

    /// Load from `path`. A missing file yields defaults; so does a malformed one,
    /// with a warning.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", path);
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read config {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(config) => {
                log::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("Malformed config {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SphereConfig::default();
        assert_eq!(config.recommendations.batch_size, 10);
        assert_eq!(config.recommendations.max_attempts, 2);
        assert_eq!(config.recommendations.max_seed_tracks, 5);
        assert_eq!(config.persistence.debounce_ms, 500);
        assert_eq!(config.spotify.api_base_url, "https://api.spotify.com/v1");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SphereConfig =
            serde_json::from_str(r#"{ "recommendations": { "max_attempts": 5 } }"#).unwrap();
        assert_eq!(config.recommendations.max_attempts, 5);
        assert_eq!(config.recommendations.batch_size, 10);
        assert_eq!(config.persistence.debounce_ms, 500);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = SphereConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(missing.recommendations.batch_size, 10);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(SphereConfig::load_from(&bad).persistence.debounce_ms, 500);
    }
}
