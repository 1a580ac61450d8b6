// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::StagehandToml;
use crate::errors::Result;

/// Load the optional `Stagehand.toml` from the given path.
///
/// A missing file is not an error: every section has defaults, so running
/// without a config file is the common case. Parse errors in an existing
/// file are reported.
pub fn load_optional(path: impl AsRef<Path>) -> Result<StagehandToml> {
    let path = path.as_ref();
    if !path.is_file() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(StagehandToml::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: StagehandToml = toml::from_str(&contents)?;

    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}
