// src/core/mod.rs
pub mod config;
pub mod errors;

pub use config::KeyringConfig;
pub use errors::{KeyringError, Result};
