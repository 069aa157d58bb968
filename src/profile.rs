pub mod operations;
pub mod types;

// Re-export types
pub use types::{GameProfile, PlayerInstanceConfig};

// Re-export operations
pub use operations::io::load_profile;
