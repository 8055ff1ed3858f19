use std::os::raw::c_void;
use std::sync::Arc;

use bitflags::bitflags;

use crate::plugin::plugin::{Plugin, PluginInner};

bitflags! {
    /// Flags attached to a control port declaring how its value should be
    /// interpreted (`spec.md` GLOSSARY: "Descriptor hint").
    pub struct PortHint: u32 {
        /// The value is conceptually a boolean (0.0 / 1.0); if `min == max`
        /// the port is a fixed boolean rather than a real control.
        const BOOLEAN = 1 << 0;
        /// The value is conceptually an integer; round rather than truncate
        /// when coercing from a control-surface float.
        const INTEGER = 1 << 1;
        /// The default (and min/max) are expressed as a fraction of the
        /// sample rate and must be scaled by it once the runtime rate is
        /// known.
        const SAMPLE_RATE = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    AudioIn,
    AudioOut,
    ControlIn,
    ControlOut,
}

impl PortKind {
    pub fn is_audio(self) -> bool {
        matches!(self, PortKind::AudioIn | PortKind::AudioOut)
    }

    pub fn is_input(self) -> bool {
        matches!(self, PortKind::AudioIn | PortKind::ControlIn)
    }
}

/// One port as declared by a plugin descriptor, before it is partitioned
/// into the per-kind arrays `spec.md` §3 describes.
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub kind: PortKind,
    /// The port's index in the plugin's own flat port numbering, i.e. the
    /// value passed to `connect_port`.
    pub descriptor_port_index: u32,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub hint: PortHint,
}

/// An opaque per-instance handle, owned by whichever format loader created
/// it (builtin, LADSPA, or LV2). Only ever dereferenced by the same
/// descriptor's own vtable functions.
pub type InstanceHandle = *mut c_void;

/// The descriptor IS the vtable (`spec.md` §9): opaque plugin handles are
/// modeled as a record of function pointers plus an opaque instance handle
/// rather than as a trait object, because the underlying formats (LADSPA,
/// LV2) hand the host function pointers across a C ABI, not a Rust vtable.
/// Each field is boxed as `Arc<dyn Fn>` rather than a bare `fn` pointer
/// because a loaded LADSPA/LV2 symbol is a runtime value (resolved via
/// `libloading`), not a compile-time function name.
#[derive(Clone)]
pub struct PluginVTable {
    pub instantiate: Arc<
        dyn Fn(&Descriptor, f64, Option<&serde_json::Value>) -> Result<InstanceHandle, String>
            + Send
            + Sync,
    >,
    pub activate: Arc<dyn Fn(InstanceHandle) + Send + Sync>,
    pub deactivate: Arc<dyn Fn(InstanceHandle) + Send + Sync>,
    pub cleanup: Arc<dyn Fn(InstanceHandle) + Send + Sync>,
    pub connect_port: Arc<dyn Fn(InstanceHandle, u32, *mut f32) + Send + Sync>,
    pub run: Arc<dyn Fn(InstanceHandle, u32) + Send + Sync>,
}

struct DescriptorInner {
    plugin: Plugin,
    label: String,
    ports: Vec<PortInfo>,
    audio_in: Vec<u32>,
    audio_out: Vec<u32>,
    control_in: Vec<u32>,
    control_out: Vec<u32>,
    /// Parallel to `control_in`; SAMPLE_RATE-hinted entries are already
    /// scaled by the runtime sample rate (`spec.md` §4.1).
    control_defaults: Vec<f32>,
    vtable: PluginVTable,
    supports_null_data: bool,
}

/// Immutable metadata for one plugin label (`spec.md` §3). Cheap to clone
/// (an `Arc` bump); held alive as long as any `Node` references it, which in
/// turn keeps the parent [`Plugin`] (and its loaded library) alive.
#[derive(Clone)]
pub struct Descriptor(Arc<DescriptorInner>);

pub(crate) struct NewDescriptor {
    pub ports: Vec<PortInfo>,
    pub vtable: PluginVTable,
    pub supports_null_data: bool,
}

impl Descriptor {
    pub(crate) fn new(
        plugin: Plugin,
        label: String,
        contents: NewDescriptor,
        sample_rate: f64,
    ) -> Self {
        let NewDescriptor { ports, vtable, supports_null_data } = contents;

        let mut audio_in = Vec::new();
        let mut audio_out = Vec::new();
        let mut control_in = Vec::new();
        let mut control_out = Vec::new();
        let mut control_defaults = Vec::new();

        for port in &ports {
            match port.kind {
                PortKind::AudioIn => audio_in.push(port.descriptor_port_index),
                PortKind::AudioOut => audio_out.push(port.descriptor_port_index),
                PortKind::ControlIn => {
                    control_in.push(port.descriptor_port_index);
                    let mut default = port.default;
                    if port.hint.contains(PortHint::SAMPLE_RATE) {
                        default *= sample_rate as f32;
                    }
                    control_defaults.push(default);
                }
                PortKind::ControlOut => control_out.push(port.descriptor_port_index),
            }
        }

        Descriptor(Arc::new(DescriptorInner {
            plugin,
            label,
            ports,
            audio_in,
            audio_out,
            control_in,
            control_out,
            control_defaults,
            vtable,
            supports_null_data,
        }))
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn plugin(&self) -> &Plugin {
        &self.0.plugin
    }

    pub fn ports(&self) -> &[PortInfo] {
        &self.0.ports
    }

    pub fn audio_in_ports(&self) -> &[u32] {
        &self.0.audio_in
    }

    pub fn audio_out_ports(&self) -> &[u32] {
        &self.0.audio_out
    }

    pub fn control_in_ports(&self) -> &[u32] {
        &self.0.control_in
    }

    pub fn control_out_ports(&self) -> &[u32] {
        &self.0.control_out
    }

    /// Default values for `control_in_ports()`, in the same order, with the
    /// SAMPLE_RATE hint already applied.
    pub fn control_defaults(&self) -> &[f32] {
        &self.0.control_defaults
    }

    pub fn supports_null_data(&self) -> bool {
        self.0.supports_null_data
    }

    /// Find a port by name within one kind partition, or by its decimal
    /// index into that partition if `token` parses as an integer smaller
    /// than the partition's length (`spec.md` §4.2 P2: "A trailing token
    /// that parses as a decimal integer less than the port count is an
    /// index; otherwise it matches by the descriptor's port name").
    pub fn resolve_port(&self, token: &str, want_kind_is_input: bool) -> Option<&PortInfo> {
        let candidates: Vec<&PortInfo> = self
            .0
            .ports
            .iter()
            .filter(|p| p.kind.is_audio() && p.kind.is_input() == want_kind_is_input)
            .collect();

        if let Ok(index) = token.parse::<usize>() {
            if index < candidates.len() {
                return candidates.get(index).copied();
            }
        }

        candidates.into_iter().find(|p| p.name == token)
    }

    pub(crate) fn instantiate(
        &self,
        sample_rate: f64,
        config: Option<&serde_json::Value>,
    ) -> Result<InstanceHandle, String> {
        (self.0.vtable.instantiate)(self, sample_rate, config)
    }

    pub(crate) fn activate(&self, handle: InstanceHandle) {
        (self.0.vtable.activate)(handle)
    }

    pub(crate) fn deactivate(&self, handle: InstanceHandle) {
        (self.0.vtable.deactivate)(handle)
    }

    pub(crate) fn cleanup(&self, handle: InstanceHandle) {
        (self.0.vtable.cleanup)(handle)
    }

    pub(crate) fn connect_port(&self, handle: InstanceHandle, port_index: u32, data: *mut f32) {
        (self.0.vtable.connect_port)(handle, port_index, data)
    }

    pub(crate) fn run(&self, handle: InstanceHandle, n_samples: u32) {
        (self.0.vtable.run)(handle, n_samples)
    }

    pub(crate) fn plugin_inner(&self) -> &Arc<PluginInner> {
        self.0.plugin.inner()
    }

    /// Used by the registry's cache eviction: a count of 1 means the cache
    /// entry is the only reference left.
    pub(crate) fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Explicit symmetry with `spec.md` §4.1's `release(Descriptor)`; the
    /// same effect as simply dropping the value, since the descriptor's
    /// reference count is just its `Arc` strong count.
    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("label", &self.0.label)
            .field("audio_in", &self.0.audio_in.len())
            .field("audio_out", &self.0.audio_out.len())
            .field("control_in", &self.0.control_in.len())
            .field("control_out", &self.0.control_out.len())
            .finish()
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
