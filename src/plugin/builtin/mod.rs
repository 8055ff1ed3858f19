//! Built-in DSP primitives (`spec.md` §4.5): mixer, copy, biquads, convolver,
//! and delay. Each is implemented directly against the same descriptor/vtable
//! contract LADSPA and LV2 plugins present, so the graph compiler treats all
//! three sources uniformly; there is no dynamic library behind this loader,
//! every label resolves straight to a constructor function.

mod biquad;
mod convolver;
mod copy;
mod delay;
mod mixer;

use std::path::PathBuf;

use crate::error::LoadError;
use crate::plugin::descriptor::NewDescriptor;
use crate::plugin::loader::PluginLoader;
use crate::plugin::plugin::LoadedLibrary;

pub(crate) struct BuiltinLoader;

impl BuiltinLoader {
    pub fn new() -> Self {
        BuiltinLoader
    }
}

impl PluginLoader for BuiltinLoader {
    fn load(&self, _path: &str, _search_dirs: &[PathBuf]) -> Result<LoadedLibrary, LoadError> {
        Ok(LoadedLibrary::Builtin)
    }

    fn make_descriptor(
        &self,
        _library: &LoadedLibrary,
        path: &str,
        label: &str,
    ) -> Result<NewDescriptor, LoadError> {
        match label {
            "mixer" => Ok(mixer::descriptor()),
            "copy" => Ok(copy::descriptor()),
            "lowpass" | "highpass" | "bandpass" | "lowshelf" | "highshelf" | "peaking"
            | "notch" | "allpass" => Ok(biquad::descriptor(biquad::Shape::from_label(label))),
            "convolver" => Ok(convolver::descriptor()),
            "delay" => Ok(delay::descriptor()),
            other => Err(LoadError::LabelNotFound {
                path: path.to_string(),
                label: other.to_string(),
            }),
        }
    }
}
