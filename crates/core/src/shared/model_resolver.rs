use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model path has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("model {name} not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a model file, checking well-known locations.
///
/// Resolution order:
/// 1. The path as given (absolute, or relative to the working directory)
/// 2. `models_dir/<file name>` (for bundled / pre-packaged installs)
/// 3. User cache directory (platform-specific)
pub fn resolve(requested: &Path, models_dir: Option<&Path>) -> Result<PathBuf, ModelResolveError> {
    let mut search_dirs = Vec::new();
    if let Some(dir) = models_dir {
        search_dirs.push(dir.to_path_buf());
    }
    if let Some(dir) = model_cache_dir() {
        search_dirs.push(dir);
    }
    resolve_in(requested, &search_dirs)
}

/// Same as [`resolve`] with an explicit list of fallback directories.
pub fn resolve_in(requested: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf, ModelResolveError> {
    if requested.is_file() {
        return Ok(requested.to_path_buf());
    }

    let name = requested
        .file_name()
        .ok_or_else(|| ModelResolveError::NoFileName(requested.to_path_buf()))?;

    let mut searched = vec![requested.to_path_buf()];
    for dir in search_dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            log::debug!("Resolved model {} to {}", requested.display(), candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string_lossy().into_owned(),
        searched,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/emotion-server/models/`
/// - Linux: `$XDG_CACHE_HOME/emotion-server/models/` or `~/.cache/emotion-server/models/`
/// - Windows: `%LOCALAPPDATA%/emotion-server/models/`
pub fn model_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join("models"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir().map(|d| d.join(APP_DIR_NAME).join("models"))
    }
}
