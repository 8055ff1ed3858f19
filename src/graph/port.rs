use std::sync::atomic::{AtomicU32, Ordering};

use smallvec::SmallVec;

use crate::graph::link::LinkIndex;
use crate::graph::node::NodeIndex;
use crate::plugin::PortKind;

/// Sentinel stored in [`Port::external`] meaning "not exposed".
pub(crate) const NONE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortIndex(pub(crate) u32);

/// A node-resident control value: one writer (the control thread, via
/// [`crate::control::ControlBridge`]), one reader (the audio thread, inside
/// a plugin's `run`), block-granular visibility. `Relaxed` is sufficient —
/// a torn read only ever yields the previous block's value.
pub(crate) struct ControlCell(AtomicU32);

impl ControlCell {
    pub fn new(value: f32) -> Self {
        ControlCell(AtomicU32::new(value.to_bits()))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed)
    }

    /// The address a plugin's `connect_port` is wired to. LADSPA/LV2 control
    /// ports are plain `*mut float`, not atomics, but the bit layout of an
    /// `AtomicU32` is identical to a `u32`/`f32` at this address, so handing
    /// out this pointer is sound for a single-writer/single-reader cell.
    pub fn as_ptr(&self) -> *mut f32 {
        self.0.as_ptr() as *mut f32
    }
}

/// One port of one [`crate::graph::node::Node`] (`spec.md` §3).
pub(crate) struct Port {
    pub node: NodeIndex,
    pub kind: PortKind,
    pub index_within_kind: u32,
    pub descriptor_port_index: u32,
    /// Incoming links for an input port (at most one); outgoing for an
    /// output port (fan-out). Almost always 0 or 1 entries, so a few are
    /// kept inline rather than heap-allocating a `Vec` per port.
    pub links: SmallVec<[LinkIndex; 4]>,
    pub external: u32,
    /// `Some` for control ports only; shared by every replica instance.
    pub control_cell: Option<ControlCell>,
    /// Output audio ports only, one buffer per replica instance, lazily
    /// allocated during P5 scheduling.
    pub audio_buffers: Vec<Vec<f32>>,
}

impl Port {
    pub fn new(node: NodeIndex, kind: PortKind, index_within_kind: u32, descriptor_port_index: u32) -> Self {
        Port {
            node,
            kind,
            index_within_kind,
            descriptor_port_index,
            links: SmallVec::new(),
            external: NONE,
            control_cell: None,
            audio_buffers: Vec::new(),
        }
    }

    pub fn is_externally_exposed(&self) -> bool {
        self.external != NONE
    }
}
