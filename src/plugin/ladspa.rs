//! LADSPA plugin hosting (`spec.md` §4.1, node `type: "ladspa"`): loads a
//! `.so`/`.dll` via `libloading`, walks its `ladspa_descriptor(index)` table
//! to find a label, and wraps its raw C function pointers in a
//! [`PluginVTable`].

use std::ffi::{c_void, CStr};
use std::os::raw::{c_char, c_int, c_ulong};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::LoadError;
use crate::plugin::descriptor::{InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind};
use crate::plugin::loader::{resolve_path, PluginLoader};
use crate::plugin::plugin::LoadedLibrary;

type LadspaHandle = *mut c_void;
type LadspaData = f32;

const PORT_INPUT: c_int = 0x1;
const PORT_AUDIO: c_int = 0x8;

const HINT_BOUNDED_BELOW: c_int = 0x1;
const HINT_BOUNDED_ABOVE: c_int = 0x2;
const HINT_TOGGLED: c_int = 0x4;
const HINT_SAMPLE_RATE: c_int = 0x8;
const HINT_LOGARITHMIC: c_int = 0x10;
const HINT_INTEGER: c_int = 0x20;
const HINT_DEFAULT_MASK: c_int = 0x3C0;
const HINT_DEFAULT_MINIMUM: c_int = 0x40;
const HINT_DEFAULT_LOW: c_int = 0x80;
const HINT_DEFAULT_MIDDLE: c_int = 0xC0;
const HINT_DEFAULT_HIGH: c_int = 0x100;
const HINT_DEFAULT_MAXIMUM: c_int = 0x140;
const HINT_DEFAULT_0: c_int = 0x180;
const HINT_DEFAULT_1: c_int = 0x1C0;
const HINT_DEFAULT_100: c_int = 0x200;
const HINT_DEFAULT_440: c_int = 0x240;

#[repr(C)]
struct RawPortRangeHint {
    hint_descriptor: c_int,
    lower_bound: f32,
    upper_bound: f32,
}

#[repr(C)]
struct RawDescriptor {
    unique_id: c_ulong,
    label: *const c_char,
    properties: c_int,
    name: *const c_char,
    maker: *const c_char,
    copyright: *const c_char,
    port_count: c_ulong,
    port_descriptors: *const c_int,
    port_names: *const *const c_char,
    port_range_hints: *const RawPortRangeHint,
    implementation_data: *mut c_void,
    instantiate: unsafe extern "C" fn(*const RawDescriptor, c_ulong) -> LadspaHandle,
    connect_port: unsafe extern "C" fn(LadspaHandle, c_ulong, *mut LadspaData),
    activate: Option<unsafe extern "C" fn(LadspaHandle)>,
    run: unsafe extern "C" fn(LadspaHandle, c_ulong),
    run_adding: Option<unsafe extern "C" fn(LadspaHandle, c_ulong)>,
    set_run_adding_gain: Option<unsafe extern "C" fn(LadspaHandle, LadspaData)>,
    deactivate: Option<unsafe extern "C" fn(LadspaHandle)>,
    cleanup: unsafe extern "C" fn(LadspaHandle),
}

type DescriptorFn = unsafe extern "C" fn(c_ulong) -> *const RawDescriptor;

pub(crate) struct LadspaLibrary {
    _lib: libloading::Library,
    descriptor_fn: DescriptorFn,
}

// Safe: the only state besides the loaded library is a C function pointer,
// and every raw pointer it hands out is only ever dereferenced while this
// struct (and hence the mapped library) is alive.
unsafe impl Send for LadspaLibrary {}
unsafe impl Sync for LadspaLibrary {}

/// A raw pointer wrapper so the vtable closures below (which must be `Send
/// + Sync` to live in a [`PluginVTable`]) can capture it by value.
#[derive(Clone, Copy)]
struct RawDescriptorPtr(*const RawDescriptor);
unsafe impl Send for RawDescriptorPtr {}
unsafe impl Sync for RawDescriptorPtr {}

pub(crate) struct LadspaLoader;

impl LadspaLoader {
    pub fn new() -> Self {
        LadspaLoader
    }
}

impl PluginLoader for LadspaLoader {
    fn load(&self, path: &str, search_dirs: &[PathBuf]) -> Result<LoadedLibrary, LoadError> {
        let resolved = resolve_path(path, search_dirs)
            .ok_or_else(|| LoadError::NotFound { plugin_type: "ladspa".to_string(), path: path.to_string() })?;

        let lib = unsafe { libloading::Library::new(&resolved) }.map_err(|e| LoadError::LoadFailed {
            plugin_type: "ladspa".to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let descriptor_fn = unsafe {
            let symbol: libloading::Symbol<DescriptorFn> =
                lib.get(b"ladspa_descriptor\0").map_err(|e| LoadError::LoadFailed {
                    plugin_type: "ladspa".to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            *symbol
        };

        Ok(LoadedLibrary::Ladspa(LadspaLibrary { _lib: lib, descriptor_fn }))
    }

    fn make_descriptor(&self, library: &LoadedLibrary, path: &str, label: &str) -> Result<NewDescriptor, LoadError> {
        let lib = match library {
            LoadedLibrary::Ladspa(l) => l,
            _ => unreachable!("the registry only routes a library to its own format's loader"),
        };

        let raw = find_by_label(lib.descriptor_fn, label)
            .ok_or_else(|| LoadError::LabelNotFound { path: path.to_string(), label: label.to_string() })?;
        let raw_ref = unsafe { &*raw };

        let port_count = raw_ref.port_count as usize;
        let descriptors = unsafe { std::slice::from_raw_parts(raw_ref.port_descriptors, port_count) };
        let names = unsafe { std::slice::from_raw_parts(raw_ref.port_names, port_count) };
        let hints = unsafe { std::slice::from_raw_parts(raw_ref.port_range_hints, port_count) };

        let mut ports = Vec::with_capacity(port_count);
        for i in 0..port_count {
            let pd = descriptors[i];
            let kind = match (pd & PORT_AUDIO != 0, pd & PORT_INPUT != 0) {
                (true, true) => PortKind::AudioIn,
                (true, false) => PortKind::AudioOut,
                (false, true) => PortKind::ControlIn,
                (false, false) => PortKind::ControlOut,
            };

            let name = unsafe { CStr::from_ptr(names[i]) }.to_string_lossy().into_owned();
            let (min, max, default) = range_hint(&hints[i]);

            let mut hint = PortHint::empty();
            let d = hints[i].hint_descriptor;
            if d & HINT_TOGGLED != 0 {
                hint |= PortHint::BOOLEAN;
            }
            if d & HINT_INTEGER != 0 {
                hint |= PortHint::INTEGER;
            }
            if d & HINT_SAMPLE_RATE != 0 {
                hint |= PortHint::SAMPLE_RATE;
            }

            ports.push(PortInfo { name, kind, descriptor_port_index: i as u32, default, min, max, hint });
        }

        let raw_ptr = RawDescriptorPtr(raw);
        let instantiate_fn = raw_ref.instantiate;
        let connect_port_fn = raw_ref.connect_port;
        let activate_fn = raw_ref.activate;
        let deactivate_fn = raw_ref.deactivate;
        let cleanup_fn = raw_ref.cleanup;
        let run_fn = raw_ref.run;

        let vtable = PluginVTable {
            instantiate: Arc::new(move |_descriptor, sample_rate, _config| {
                let handle = unsafe { instantiate_fn(raw_ptr.0, sample_rate.round() as c_ulong) };
                if handle.is_null() {
                    Err("LADSPA instantiate() returned a null handle".to_string())
                } else {
                    Ok(handle as InstanceHandle)
                }
            }),
            activate: Arc::new(move |handle| {
                if let Some(f) = activate_fn {
                    unsafe { f(handle as LadspaHandle) }
                }
            }),
            deactivate: Arc::new(move |handle| {
                if let Some(f) = deactivate_fn {
                    unsafe { f(handle as LadspaHandle) }
                }
            }),
            cleanup: Arc::new(move |handle| unsafe { cleanup_fn(handle as LadspaHandle) }),
            connect_port: Arc::new(move |handle, port_index, data| unsafe {
                connect_port_fn(handle as LadspaHandle, port_index as c_ulong, data as *mut LadspaData)
            }),
            run: Arc::new(move |handle, n_samples| unsafe { run_fn(handle as LadspaHandle, n_samples as c_ulong) }),
        };

        // LADSPA plugins dereference every connected port unconditionally;
        // unlike the built-ins they are never written to check for null.
        Ok(NewDescriptor { ports, vtable, supports_null_data: false })
    }
}

fn find_by_label(descriptor_fn: DescriptorFn, label: &str) -> Option<*const RawDescriptor> {
    let mut index = 0;
    loop {
        let candidate = unsafe { descriptor_fn(index) };
        if candidate.is_null() {
            return None;
        }
        let candidate_label = unsafe { CStr::from_ptr((*candidate).label) }.to_string_lossy();
        if candidate_label == label {
            return Some(candidate);
        }
        index += 1;
    }
}

/// `(min, max, default)` per the LADSPA port range hint rules: unbounded
/// sides fall back to 0.0/1.0, and the default bucket (`DEFAULT_*`) picks a
/// point between the bounds, honoring `LOGARITHMIC` when both bounds are
/// positive.
fn range_hint(hint: &RawPortRangeHint) -> (f32, f32, f32) {
    let d = hint.hint_descriptor;
    let lower = if d & HINT_BOUNDED_BELOW != 0 { hint.lower_bound } else { 0.0 };
    let upper = if d & HINT_BOUNDED_ABOVE != 0 { hint.upper_bound } else { 1.0 };

    if d & HINT_TOGGLED != 0 {
        let default = if d & HINT_DEFAULT_MASK == HINT_DEFAULT_1 { 1.0 } else { 0.0 };
        return (lower, upper, default);
    }

    let interpolate = |frac: f32| -> f32 {
        if d & HINT_LOGARITHMIC != 0 && lower > 0.0 && upper > 0.0 {
            (lower.ln() + (upper.ln() - lower.ln()) * frac).exp()
        } else {
            lower + (upper - lower) * frac
        }
    };

    let default = match d & HINT_DEFAULT_MASK {
        HINT_DEFAULT_MINIMUM => lower,
        HINT_DEFAULT_LOW => interpolate(0.25),
        HINT_DEFAULT_MIDDLE => interpolate(0.5),
        HINT_DEFAULT_HIGH => interpolate(0.75),
        HINT_DEFAULT_MAXIMUM => upper,
        HINT_DEFAULT_0 => 0.0,
        HINT_DEFAULT_1 => 1.0,
        HINT_DEFAULT_100 => 100.0,
        HINT_DEFAULT_440 => 440.0,
        _ => interpolate(0.5),
    };

    (lower, upper, default)
}
