//! The plugin abstraction layer (`spec.md` §4.1): a uniform descriptor/handle
//! interface over the built-in DSP primitives and third-party LADSPA/LV2
//! plugin formats, with reference-counted sharing of loaded libraries and
//! their descriptors.

pub mod builtin;
mod descriptor;
#[cfg(feature = "ladspa-host")]
mod ladspa;
mod loader;
#[cfg(feature = "lv2-host")]
mod lv2;
#[allow(clippy::module_inception)]
mod plugin;
pub mod registry;

pub use descriptor::{Descriptor, InstanceHandle, PluginVTable, PortHint, PortInfo, PortKind};
pub use plugin::{Plugin, PluginType};
pub use registry::PluginRegistry;
