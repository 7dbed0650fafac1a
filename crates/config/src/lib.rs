//! Configuration documents consumed by the keybridge core.
//!
//! Two JSON documents are loaded as whole files and held read-only:
//!
//! - `catalog.json`: the semantic action catalog (per-application native
//!   commands for each action) plus the named preference profiles.
//! - `settings.json`: runtime settings, chiefly the active profile name.
//!
//! Editing and persistence belong to the configuration UI; this crate only
//! parses, validates as far as the mapping engine needs, and answers
//! queries.

use std::{
    env,
    path::{Path, PathBuf},
};

mod error;
mod loader;
mod types;

#[cfg(test)]
mod test_parse;

pub use error::Error;
pub use loader::{Documents, load_catalog, load_settings};
pub use types::{ActionDefinition, ActionKind, Catalog, Preference, Profile, Settings};

/// Determine the preferred user config directory (`~/.keybridge`).
pub fn default_config_dir() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".keybridge");
    p
}

/// Resolve the effective config directory.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else use `~/.keybridge` when it exists.
/// 3) Else return a clear "no config found" error.
pub fn resolve_config_dir(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let preferred = default_config_dir();
    if preferred.exists() {
        return Ok(preferred);
    }
    Err(Error::Read {
        path: Some(preferred),
        message: "No config found. Create ~/.keybridge with catalog.json and settings.json \
                  (see demos/ for a starting point)"
            .to_string(),
    })
}
