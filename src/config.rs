use std::path::PathBuf;

/// Settings the host supplies when it stands the engine up, mirroring the
/// node-descriptive properties (rate, channel count, latency) that the host
/// mirrors onto its own capture/playback streams (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub min_block_frames: u32,
    pub max_block_frames: u32,
    pub channels_capture: u32,
    pub channels_playback: u32,
    /// Override for the replication cap (`spec.md` §4.2 P3); defaults to
    /// [`crate::graph::MAX_INSTANCES`].
    pub max_instances: u32,
    plugin_search_dirs: Vec<PathBuf>,
}

impl EngineConfig {
    pub fn new(
        sample_rate: f64,
        min_block_frames: u32,
        max_block_frames: u32,
        channels_capture: u32,
        channels_playback: u32,
    ) -> Self {
        Self {
            sample_rate,
            min_block_frames,
            max_block_frames,
            channels_capture,
            channels_playback,
            max_instances: crate::graph::MAX_INSTANCES,
            plugin_search_dirs: Vec::new(),
        }
    }

    /// Add a directory to search for LADSPA/LV2 plugin libraries when a
    /// `NodeSpec::plugin` is a bare filename rather than an absolute path.
    /// Returns `false` if the directory was already registered.
    pub fn add_search_dir(&mut self, path: PathBuf) -> bool {
        if self.plugin_search_dirs.contains(&path) {
            false
        } else {
            self.plugin_search_dirs.push(path);
            true
        }
    }

    pub fn remove_search_dir(&mut self, path: &PathBuf) -> bool {
        let len_before = self.plugin_search_dirs.len();
        self.plugin_search_dirs.retain(|p| p != path);
        self.plugin_search_dirs.len() != len_before
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.plugin_search_dirs
    }
}
