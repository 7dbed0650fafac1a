//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading or parsing a configuration document.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// JSON parse error with its location.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly message including the path when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
            } => match path {
                Some(p) => format!(
                    "Config parse error at {}:{}:{}: {}",
                    p.display(),
                    line,
                    col,
                    message
                ),
                None => format!(
                    "Config parse error at line {}, column {}: {}",
                    line, col, message
                ),
            },
        }
    }
}
