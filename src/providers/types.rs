use serde::{Deserialize, Serialize};

/// A recommendation request: how many tracks, seeded by which track ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub limit: usize,
    pub seed_tracks: Vec<String>,
}

impl RecommendationQuery {
    pub fn new(limit: usize, seed_tracks: Vec<String>) -> Self {
        Self { limit, seed_tracks }
    }

    /// Seed ids in the comma-joined form the provider expects.
    pub fn seed_param(&self) -> String {
        self.seed_tracks.join(",")
    }
}

/// Name and description for a playlist about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
}

/// A playlist as the external service knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub external_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_param_is_comma_joined() {
        let q = RecommendationQuery::new(10, vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(q.seed_param(), "a,b,c");
        assert_eq!(RecommendationQuery::new(10, vec![]).seed_param(), "");
    }
}
