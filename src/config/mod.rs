pub mod loader;
mod root;
pub mod types;

pub use loader::{CONFIG_FILE, ConfigFile, load};
pub use root::resolve_project_root;
pub use types::ServeConfig;
