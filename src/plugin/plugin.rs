use std::sync::Arc;

/// One of the three node `type`s a `NodeSpec` may request (`spec.md` §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginType {
    Builtin,
    Ladspa,
    Lv2,
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PluginType::Builtin => "builtin",
            PluginType::Ladspa => "ladspa",
            PluginType::Lv2 => "lv2",
        })
    }
}

impl std::str::FromStr for PluginType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(PluginType::Builtin),
            "ladspa" => Ok(PluginType::Ladspa),
            "lv2" => Ok(PluginType::Lv2),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PluginKey {
    pub plugin_type: PluginType,
    pub path: String,
}

/// The loaded, format-specific library contents. Dropping this is what
/// actually unloads a LADSPA/LV2 shared object; builtins have nothing to
/// unload.
pub(crate) enum LoadedLibrary {
    Builtin,
    #[cfg(feature = "ladspa-host")]
    Ladspa(crate::plugin::ladspa::LadspaLibrary),
    #[cfg(feature = "lv2-host")]
    Lv2(crate::plugin::lv2::Lv2Library),
}

pub(crate) struct PluginInner {
    pub key: PluginKey,
    pub library: LoadedLibrary,
}

/// A loaded plugin library (`spec.md` §3). Reference-counted: the library
/// stays mapped as long as any [`crate::plugin::Descriptor`] derived from it
/// (and hence any [`Plugin`] handle) is still alive.
#[derive(Clone)]
pub struct Plugin(Arc<PluginInner>);

impl Plugin {
    pub(crate) fn new(key: PluginKey, library: LoadedLibrary) -> Self {
        Plugin(Arc::new(PluginInner { key, library }))
    }

    pub(crate) fn from_inner(inner: Arc<PluginInner>) -> Self {
        Plugin(inner)
    }

    pub(crate) fn key(&self) -> &PluginKey {
        &self.0.key
    }

    pub(crate) fn inner(&self) -> &Arc<PluginInner> {
        &self.0
    }

    pub fn plugin_type(&self) -> PluginType {
        self.0.key.plugin_type
    }

    pub fn path(&self) -> &str {
        &self.0.key.path
    }

    /// Explicit symmetry with `spec.md` §4.1's `release(Plugin)`.
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("type", &self.0.key.plugin_type)
            .field("path", &self.0.key.path)
            .finish()
    }
}

impl PartialEq for Plugin {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
