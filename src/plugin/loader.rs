use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::plugin::descriptor::NewDescriptor;
use crate::plugin::plugin::LoadedLibrary;

/// One format-specific backend: resolves a `path` (bare filename or absolute
/// path) to a loaded library, and dispenses descriptors by label from it.
/// Implemented by the built-in namespace and (when their features are
/// enabled) the LADSPA and LV2 hosts.
pub(crate) trait PluginLoader: Send + Sync {
    fn load(&self, path: &str, search_dirs: &[PathBuf]) -> Result<LoadedLibrary, LoadError>;

    fn make_descriptor(
        &self,
        library: &LoadedLibrary,
        path: &str,
        label: &str,
    ) -> Result<NewDescriptor, LoadError>;
}

/// Search `search_dirs` in order for a file named `filename`; returns the
/// bare filename unchanged if it is already absolute or already exists
/// relative to the current directory.
pub(crate) fn resolve_path(filename: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let candidate = Path::new(filename);
    if candidate.is_absolute() && candidate.exists() {
        return Some(candidate.to_path_buf());
    }
    if candidate.exists() {
        return Some(candidate.to_path_buf());
    }
    for dir in search_dirs {
        let joined = dir.join(filename);
        if joined.exists() {
            return Some(joined);
        }
    }
    None
}
