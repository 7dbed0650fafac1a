//! Load configuration documents from disk.

use std::{fs, path::Path};

use crate::{Catalog, Error, Settings};

/// Both documents, loaded together so a reload is atomic from the caller's
/// point of view.
#[derive(Debug, Clone, Default)]
pub struct Documents {
    /// The action catalog and profiles.
    pub catalog: Catalog,
    /// Runtime settings.
    pub settings: Settings,
}

impl Documents {
    /// Load `catalog.json` and `settings.json` from `dir`.
    ///
    /// A missing settings file is not an error (defaults apply, the catalog
    /// fallback picks a profile); a missing catalog is, since without it
    /// there is nothing to remap.
    pub fn load_from_dir(dir: &Path) -> Result<Self, Error> {
        let catalog = load_catalog(&dir.join("catalog.json"))?;
        let settings_path = dir.join("settings.json");
        let settings = if settings_path.exists() {
            load_settings(&settings_path)?
        } else {
            Settings::default()
        };
        Ok(Self { catalog, settings })
    }
}

/// Load and parse the action catalog document.
pub fn load_catalog(path: &Path) -> Result<Catalog, Error> {
    parse_json(path)
}

/// Load and parse the settings document.
pub fn load_settings(path: &Path) -> Result<Settings, Error> {
    parse_json(path)
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let text = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Parse {
        path: Some(path.to_path_buf()),
        line: e.line(),
        col: e.column(),
        message: e.to_string(),
    })
}
