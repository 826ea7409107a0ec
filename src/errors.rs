use serde::Serialize;
use thiserror::Error;

/// Failures talking to the sphere document store.
///
/// Never surfaced synchronously to the user: the synchronizer logs them and
/// the next successful write supersedes the lost one.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sphere not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

impl From<crate::tree::TreeError> for PersistenceError {
    fn from(e: crate::tree::TreeError) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

/// Failures materializing a sphere as a playlist.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum PlaylistError {
    /// Update requested for a sphere that has no linked playlist yet.
    #[error("Sphere '{0}' has no playlist to update")]
    MissingPlaylist(String),

    #[error("No sphere is loaded")]
    NoSphere,

    #[error("Playlist provider error: {0}")]
    Provider(String),
}

impl From<anyhow::Error> for PlaylistError {
    fn from(e: anyhow::Error) -> Self {
        PlaylistError::Provider(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failures_become_provider_errors() {
        let err = PlaylistError::from(anyhow::anyhow!("HTTP 500"));
        assert!(matches!(err, PlaylistError::Provider(ref msg) if msg == "HTTP 500"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "Provider", "message": "HTTP 500" }));
        assert_eq!(
            serde_json::to_value(PlaylistError::NoSphere).unwrap(),
            serde_json::json!({ "type": "NoSphere" })
        );
    }
}
