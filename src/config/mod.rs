//! Configuration loading and application.
mod apply;
mod loader;
mod settings;
pub mod types;


pub use apply::apply_config;
pub use loader::{default_config_path, load_config};
pub use settings::{ConnectionSettings, ReplaySettings, TargetSettings};

#[cfg(test)]
pub(crate) use loader::load_config_file;
