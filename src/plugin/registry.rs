use std::path::PathBuf;
use std::sync::{Arc, Weak};

use fnv::FnvHashMap;

use crate::error::LoadError;
use crate::plugin::descriptor::Descriptor;
use crate::plugin::loader::PluginLoader;
use crate::plugin::plugin::{Plugin, PluginInner, PluginKey};
use crate::plugin::PluginType;

/// Caches loaded plugin libraries by `(type, path)` and dispenses descriptors
/// from them (`spec.md` §4.1). Lives on the control thread only.
pub struct PluginRegistry {
    sample_rate: f64,
    search_dirs: Vec<PathBuf>,
    plugins: FnvHashMap<PluginKey, Weak<PluginInner>>,
    descriptor_cache: FnvHashMap<(PluginKey, String), Descriptor>,
    builtin_loader: crate::plugin::builtin::BuiltinLoader,
    #[cfg(feature = "ladspa-host")]
    ladspa_loader: crate::plugin::ladspa::LadspaLoader,
    #[cfg(feature = "lv2-host")]
    lv2_loader: crate::plugin::lv2::Lv2Loader,
}

impl PluginRegistry {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            search_dirs: Vec::new(),
            plugins: FnvHashMap::default(),
            descriptor_cache: FnvHashMap::default(),
            builtin_loader: crate::plugin::builtin::BuiltinLoader::new(),
            #[cfg(feature = "ladspa-host")]
            ladspa_loader: crate::plugin::ladspa::LadspaLoader::new(),
            #[cfg(feature = "lv2-host")]
            lv2_loader: crate::plugin::lv2::Lv2Loader::new(),
        }
    }

    pub fn add_search_dir(&mut self, dir: PathBuf) {
        if !self.search_dirs.contains(&dir) {
            self.search_dirs.push(dir);
        }
    }

    fn loader_for(&self, plugin_type: PluginType) -> Result<&dyn PluginLoader, LoadError> {
        match plugin_type {
            PluginType::Builtin => Ok(&self.builtin_loader),
            #[cfg(feature = "ladspa-host")]
            PluginType::Ladspa => Ok(&self.ladspa_loader),
            #[cfg(not(feature = "ladspa-host"))]
            PluginType::Ladspa => Err(LoadError::UnsupportedType("ladspa".into())),
            #[cfg(feature = "lv2-host")]
            PluginType::Lv2 => Ok(&self.lv2_loader),
            #[cfg(not(feature = "lv2-host"))]
            PluginType::Lv2 => Err(LoadError::UnsupportedType("lv2".into())),
        }
    }

    /// `load(type, path) -> Plugin` (`spec.md` §4.1).
    pub fn load(&mut self, plugin_type: PluginType, path: &str) -> Result<Plugin, LoadError> {
        let key = PluginKey { plugin_type, path: path.to_string() };

        if let Some(existing) = self.plugins.get(&key).and_then(Weak::upgrade) {
            log::debug!("filterchain: reusing loaded plugin {} {:?}", plugin_type, path);
            return Ok(Plugin::from_inner(existing));
        }

        log::info!("filterchain: loading plugin {} {:?}", plugin_type, path);
        let loader = self.loader_for(plugin_type)?;
        let library = loader.load(path, &self.search_dirs)?;

        let plugin = Plugin::new(key.clone(), library);
        self.plugins.insert(key, Arc::downgrade(plugin.inner()));
        Ok(plugin)
    }

    /// `descriptor(plugin, label) -> Descriptor` (`spec.md` §4.1).
    pub fn descriptor(&mut self, plugin: &Plugin, label: &str) -> Result<Descriptor, LoadError> {
        let key = (plugin.key().clone(), label.to_string());

        if self.descriptor_cache.contains_key(&key) {
            // The cache is a Weak-equivalent: only reused while some other
            // live Descriptor clone also holds a strong ref, otherwise this
            // entry would have been evicted in `evict_stale`.
            self.evict_stale();
            if let Some(cached) = self.descriptor_cache.get(&key) {
                log::debug!("filterchain: reusing descriptor {:?} label {:?}", plugin.path(), label);
                return Ok(cached.clone());
            }
        }

        let loader = self.loader_for(plugin.plugin_type())?;
        let contents = loader.make_descriptor(&plugin.inner().library, plugin.path(), label)?;

        let descriptor =
            Descriptor::new(plugin.clone(), label.to_string(), contents, self.sample_rate);

        self.descriptor_cache.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Drop cache entries for descriptors that no caller holds anymore (the
    /// registry's own cache entry is the only strong ref once all Nodes have
    /// released theirs, so an `Arc` strong count of 1 means "collectible").
    fn evict_stale(&mut self) {
        self.descriptor_cache.retain(|_, d| d.strong_count() > 1);
    }
}
