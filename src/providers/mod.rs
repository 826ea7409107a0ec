//! Contracts for the external music services the core consumes.

pub mod traits;
pub mod types;

pub use traits::{PlaylistProvider, RecommendationProvider};
pub use types::{NewPlaylist, PlaylistRef, RecommendationQuery};

#[cfg(test)]
pub(crate) mod stubs;
