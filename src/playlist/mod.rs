pub mod manager;
pub mod models;

pub use manager::PlaylistManager;
pub use models::MaterializedPlaylist;
