//! Error types for the engine crate.

use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the keybridge engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from the hook layer.
    #[error("Hook error: {0}")]
    Hook(#[from] mac_hook::Error),

    /// Errors loading configuration during a reload.
    #[error("Config error: {0}")]
    Config(#[from] config::Error),
}
