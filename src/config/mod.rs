//! Client-side configuration (the extension's own config file, not the
//! spell-checker settings it manages)

mod loader;
mod user_config;

pub use loader::load_user_config;
pub use user_config::{ServerConfig, Settings, UserConfig};
