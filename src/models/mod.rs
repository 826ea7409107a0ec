use crate::tree::TreeNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to every freshly created sphere.
pub const DEFAULT_SPHERE_TITLE: &str = "New Sphere";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
}

/// A normalized track. Immutable once built; two tracks are equal when their ids are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Tracks without a preview are never accepted as recommendations.
    pub preview_url: Option<String>,
    /// Opaque identifier used when inserting into a playlist (e.g. "spotify:track:...")
    pub uri: String,
    pub duration_ms: u64,
    pub album: Album,
    /// Ordered; the first artist is the primary one.
    pub artists: Vec<Artist>,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }

    /// Whether the track carries a non-empty preview URL.
    pub fn has_preview(&self) -> bool {
        self.preview_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

/// A persisted exploration session: one tree plus its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sphere {
    pub id: String,
    pub title: String,
    pub description: String,
    pub playlist_id: Option<String>,
    pub playlist_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub root_node: TreeNode,
}

impl Sphere {
    /// Default description for a sphere seeded by `track`.
    pub fn default_description(track: &Track) -> String {
        let artist = track
            .primary_artist()
            .map(|a| a.name.as_str())
            .unwrap_or("Unknown Artist");
        format!("A Sphere inspired by '{}' by {}.", track.name, artist)
    }

    /// Apply a partial update locally. `last_edited_at` is left to the store.
    pub fn apply(&mut self, update: &SphereUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(playlist_id) = &update.playlist_id {
            self.playlist_id = Some(playlist_id.clone());
        }
        if let Some(playlist_url) = &update.playlist_url {
            self.playlist_url = Some(playlist_url.clone());
        }
        if let Some(root) = &update.root_node {
            self.root_node = root.clone();
        }
    }
}

/// Partial merge patch for a sphere document. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SphereUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_node: Option<TreeNode>,
}

impl SphereUpdate {
    pub fn root_node(root: TreeNode) -> Self {
        Self {
            root_node: Some(root),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn playlist(id: impl Into<String>, url: Option<String>) -> Self {
        Self {
            playlist_id: Some(id.into()),
            playlist_url: url,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.playlist_id.is_none()
            && self.playlist_url.is_none()
            && self.root_node.is_none()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a track whose name is `name` and id is derived from it.
    pub fn track(name: &str) -> Track {
        Track {
            id: format!("id-{}", name),
            name: name.to_string(),
            preview_url: Some(format!("https://p.scdn.co/mp3-preview/{}", name)),
            uri: format!("spotify:track:{}", name),
            duration_ms: 180_000,
            album: Album {
                id: format!("album-{}", name),
                name: format!("{} (Album)", name),
                image_url: None,
                external_url: None,
            },
            artists: vec![Artist {
                id: "artist-1".to_string(),
                name: "Test Artist".to_string(),
                external_url: None,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::track;
    use super::*;

    #[test]
    fn test_track_equality_is_by_id() {
        let a = track("A");
        let mut renamed = a.clone();
        renamed.name = "Something Else".to_string();
        assert_eq!(a, renamed);
        assert_ne!(a, track("B"));
    }

    #[test]
    fn test_has_preview() {
        let mut t = track("A");
        assert!(t.has_preview());
        t.preview_url = Some("  ".to_string());
        assert!(!t.has_preview());
        t.preview_url = None;
        assert!(!t.has_preview());
    }

    #[test]
    fn test_default_description_uses_primary_artist() {
        let t = track("Teardrop");
        assert_eq!(
            Sphere::default_description(&t),
            "A Sphere inspired by 'Teardrop' by Test Artist."
        );
    }

    #[test]
    fn test_track_serializes_camel_case() {
        let json = serde_json::to_value(track("A")).unwrap();
        assert!(json.get("previewUrl").is_some());
        assert!(json.get("durationMs").is_some());
        assert!(json["album"].get("imageUrl").is_some());
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let json = serde_json::to_value(SphereUpdate::title("Late Night")).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "Late Night" }));
        assert!(SphereUpdate::default().is_empty());
    }
}
