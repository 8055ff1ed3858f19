//! LV2 plugin hosting (`spec.md` §4.1, node `type: "lv2"`). A bundle is a
//! directory holding one shared library (the `LV2_Descriptor` table,
//! indexed by `lv2_descriptor(index)`) and one or more `.ttl` manifest
//! files declaring its ports. Full RDF/Turtle parsing is out of scope — no
//! turtle crate appears anywhere in this engine's dependency stack — so the
//! loader scans each manifest file directly for `lv2:port [ ... ]` blocks,
//! which is all the port metadata this engine needs (`a`, `lv2:index`,
//! `lv2:name`/`lv2:symbol`, `lv2:default`, `lv2:minimum`, `lv2:maximum`,
//! `lv2:portProperty`).

use std::ffi::{c_void, CStr, CString};
use std::fs;
use std::os::raw::{c_char, c_double, c_uint};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoadError;
use crate::plugin::descriptor::{InstanceHandle, NewDescriptor, PluginVTable, PortHint, PortInfo, PortKind};
use crate::plugin::loader::PluginLoader;
use crate::plugin::plugin::LoadedLibrary;

type Lv2Handle = *mut c_void;

#[repr(C)]
struct RawFeature {
    uri: *const c_char,
    data: *mut c_void,
}

#[repr(C)]
struct RawDescriptor {
    uri: *const c_char,
    instantiate: unsafe extern "C" fn(
        *const RawDescriptor,
        c_double,
        *const c_char,
        *const *const RawFeature,
    ) -> Lv2Handle,
    connect_port: unsafe extern "C" fn(Lv2Handle, c_uint, *mut c_void),
    activate: Option<unsafe extern "C" fn(Lv2Handle)>,
    run: unsafe extern "C" fn(Lv2Handle, c_uint),
    deactivate: Option<unsafe extern "C" fn(Lv2Handle)>,
    cleanup: unsafe extern "C" fn(Lv2Handle),
    extension_data: Option<unsafe extern "C" fn(*const c_char) -> *const c_void>,
}

type DescriptorFn = unsafe extern "C" fn(c_uint) -> *const RawDescriptor;

pub(crate) struct Lv2Library {
    _lib: libloading::Library,
    descriptor_fn: DescriptorFn,
    bundle_path: PathBuf,
}
unsafe impl Send for Lv2Library {}
unsafe impl Sync for Lv2Library {}

#[derive(Clone, Copy)]
struct RawDescriptorPtr(*const RawDescriptor);
unsafe impl Send for RawDescriptorPtr {}
unsafe impl Sync for RawDescriptorPtr {}

pub(crate) struct Lv2Loader;

impl Lv2Loader {
    pub fn new() -> Self {
        Lv2Loader
    }
}

impl PluginLoader for Lv2Loader {
    fn load(&self, path: &str, search_dirs: &[PathBuf]) -> Result<LoadedLibrary, LoadError> {
        let bundle_path = resolve_bundle(path, search_dirs)
            .ok_or_else(|| LoadError::NotFound { plugin_type: "lv2".to_string(), path: path.to_string() })?;

        let binary = find_shared_object(&bundle_path).ok_or_else(|| LoadError::LoadFailed {
            plugin_type: "lv2".to_string(),
            path: path.to_string(),
            reason: "bundle directory contains no shared library".to_string(),
        })?;

        let lib = unsafe { libloading::Library::new(&binary) }.map_err(|e| LoadError::LoadFailed {
            plugin_type: "lv2".to_string(),
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let descriptor_fn = unsafe {
            let symbol: libloading::Symbol<DescriptorFn> =
                lib.get(b"lv2_descriptor\0").map_err(|e| LoadError::LoadFailed {
                    plugin_type: "lv2".to_string(),
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            *symbol
        };

        Ok(LoadedLibrary::Lv2(Lv2Library { _lib: lib, descriptor_fn, bundle_path }))
    }

    fn make_descriptor(&self, library: &LoadedLibrary, path: &str, label: &str) -> Result<NewDescriptor, LoadError> {
        let lib = match library {
            LoadedLibrary::Lv2(l) => l,
            _ => unreachable!("the registry only routes a library to its own format's loader"),
        };

        let raw = find_by_uri(lib.descriptor_fn, label)
            .ok_or_else(|| LoadError::LabelNotFound { path: path.to_string(), label: label.to_string() })?;
        let raw_ref = unsafe { &*raw };

        let ports = read_port_manifest(&lib.bundle_path).map_err(|reason| LoadError::LoadFailed {
            plugin_type: "lv2".to_string(),
            path: path.to_string(),
            reason,
        })?;

        let raw_ptr = RawDescriptorPtr(raw);
        let instantiate_fn = raw_ref.instantiate;
        let connect_port_fn = raw_ref.connect_port;
        let activate_fn = raw_ref.activate;
        let deactivate_fn = raw_ref.deactivate;
        let cleanup_fn = raw_ref.cleanup;
        let run_fn = raw_ref.run;
        let bundle_uri = path_to_uri(&lib.bundle_path);

        let vtable = PluginVTable {
            instantiate: Arc::new(move |_descriptor, sample_rate, _config| {
                let c_bundle = CString::new(bundle_uri.clone()).map_err(|e| e.to_string())?;
                let no_features: [*const RawFeature; 1] = [std::ptr::null()];
                let handle = unsafe {
                    instantiate_fn(raw_ptr.0, sample_rate as c_double, c_bundle.as_ptr(), no_features.as_ptr())
                };
                if handle.is_null() {
                    Err("LV2 instantiate() returned a null handle".to_string())
                } else {
                    Ok(handle as InstanceHandle)
                }
            }),
            activate: Arc::new(move |handle| {
                if let Some(f) = activate_fn {
                    unsafe { f(handle as Lv2Handle) }
                }
            }),
            deactivate: Arc::new(move |handle| {
                if let Some(f) = deactivate_fn {
                    unsafe { f(handle as Lv2Handle) }
                }
            }),
            cleanup: Arc::new(move |handle| unsafe { cleanup_fn(handle as Lv2Handle) }),
            connect_port: Arc::new(move |handle, port_index, data| unsafe {
                connect_port_fn(handle as Lv2Handle, port_index, data as *mut c_void)
            }),
            run: Arc::new(move |handle, n_samples| unsafe { run_fn(handle as Lv2Handle, n_samples) }),
        };

        Ok(NewDescriptor { ports, vtable, supports_null_data: false })
    }
}

fn resolve_bundle(path: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let candidate = Path::new(path);
    if candidate.is_dir() {
        return Some(candidate.to_path_buf());
    }
    for dir in search_dirs {
        let joined = dir.join(path);
        if joined.is_dir() {
            return Some(joined);
        }
    }
    None
}

fn find_shared_object(bundle_path: &Path) -> Option<PathBuf> {
    let ext = if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    };
    fs::read_dir(bundle_path)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.extension().map(|e| e == ext).unwrap_or(false))
}

fn path_to_uri(path: &Path) -> String {
    let mut uri = format!("file://{}", path.to_string_lossy());
    if !uri.ends_with('/') {
        uri.push('/');
    }
    uri
}

fn find_by_uri(descriptor_fn: DescriptorFn, uri: &str) -> Option<*const RawDescriptor> {
    let mut index = 0;
    loop {
        let candidate = unsafe { descriptor_fn(index) };
        if candidate.is_null() {
            return None;
        }
        let candidate_uri = unsafe { CStr::from_ptr((*candidate).uri) }.to_string_lossy();
        if candidate_uri == uri {
            return Some(candidate);
        }
        index += 1;
    }
}

fn read_port_manifest(bundle_path: &Path) -> Result<Vec<PortInfo>, String> {
    let mut text = String::new();
    for entry in fs::read_dir(bundle_path).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        let p = entry.path();
        if p.extension().map(|e| e == "ttl").unwrap_or(false) {
            text.push_str(&fs::read_to_string(&p).map_err(|e| e.to_string())?);
            text.push('\n');
        }
    }

    let mut ports = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find("lv2:port") {
        let start = cursor + rel;
        let Some(open) = text[start..].find('[') else { break };
        let block_start = start + open;
        let Some(block_end) = find_matching_bracket(&text, block_start) else { break };
        ports.push(parse_port_block(&text[block_start + 1..block_end]));
        cursor = block_end + 1;
    }

    ports.sort_by_key(|p| p.descriptor_port_index);
    Ok(ports)
}

fn find_matching_bracket(text: &str, open_index: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, b) in text.as_bytes()[open_index..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open_index + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_port_block(block: &str) -> PortInfo {
    let is_audio = block.contains("AudioPort");
    let is_input = block.contains("InputPort");
    let kind = match (is_audio, is_input) {
        (true, true) => PortKind::AudioIn,
        (true, false) => PortKind::AudioOut,
        (false, true) => PortKind::ControlIn,
        (false, false) => PortKind::ControlOut,
    };

    let descriptor_port_index = find_number(block, "lv2:index").unwrap_or(0.0) as u32;
    let name = find_quoted(block, "lv2:name").or_else(|| find_quoted(block, "lv2:symbol")).unwrap_or_default();
    let default = find_number(block, "lv2:default").unwrap_or(0.0);
    let min = find_number(block, "lv2:minimum").unwrap_or(0.0);
    let max = find_number(block, "lv2:maximum").unwrap_or(1.0);

    let mut hint = PortHint::empty();
    if block.contains("toggled") {
        hint |= PortHint::BOOLEAN;
    }
    if block.contains("integer") {
        hint |= PortHint::INTEGER;
    }
    if block.contains("sampleRate") {
        hint |= PortHint::SAMPLE_RATE;
    }

    PortInfo { name, kind, descriptor_port_index, default, min, max, hint }
}

fn find_number(block: &str, key: &str) -> Option<f32> {
    let idx = block.find(key)?;
    let rest = block[idx + key.len()..].trim_start();
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-')).unwrap_or(rest.len());
    rest[..end].parse::<f32>().ok()
}

fn find_quoted(block: &str, key: &str) -> Option<String> {
    let idx = block.find(key)?;
    let rest = &block[idx + key.len()..];
    let start = rest.find('"')? + 1;
    let end = rest[start..].find('"')? + start;
    Some(rest[start..end].to_string())
}
