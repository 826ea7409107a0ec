pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod playlist;
pub mod providers;
pub mod recommendations;
pub mod session;
pub mod spotify;
pub mod sync;
pub mod tree;

pub use config::SphereConfig;
pub use database::{DatabaseManager, SphereRepository, SqliteSphereStore};
pub use errors::{PersistenceError, PlaylistError};
pub use models::{Artist, Album, Sphere, SphereUpdate, Track};
pub use playlist::{MaterializedPlaylist, PlaylistManager};
pub use recommendations::{Expansion, RecommendationEngine, RecommendationError, ReloadOutcome};
pub use session::{SphereSession, UserSession};
pub use sync::{EditableField, SphereSynchronizer};
pub use tree::{DeleteOutcome, NodeId, TrackTree, TreeNode, TreeStore};
