//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;


pub use cli::ReplayArgs;
pub use defaults::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_URL};
