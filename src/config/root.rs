use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::loader::CONFIG_FILE;

/// Files that mark the top of a project.
const ROOT_MARKERS: [&str; 3] = [CONFIG_FILE, "artisan", "composer.json"];

/// Find the directory to mount into the container.
///
/// An explicit path wins (relative paths are taken from `cwd`). Otherwise the
/// nearest ancestor of `cwd` holding a root marker, falling back to `cwd`.
/// The result is always absolute.
pub fn resolve_project_root(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let root = std::path::absolute(cwd.join(path))?;
        if !root.is_dir() {
            return Err(Error::ProjectRoot { path: root });
        }
        return Ok(root);
    }

    let cwd = std::path::absolute(cwd)?;
    let root = cwd
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(cwd.as_path())
        .to_path_buf();
    Ok(root)
}
