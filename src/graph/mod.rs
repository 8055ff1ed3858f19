//! The compiled, executable dataflow graph (`spec.md` §3) and the compiler
//! that builds one from a [`desc::GraphDesc`].

pub mod compiler;
pub mod desc;
pub(crate) mod link;
pub(crate) mod node;
pub(crate) mod port;
mod verifier;

use crate::plugin::{Descriptor, InstanceHandle};

pub use compiler::GraphCompiler;
pub use link::LinkIndex;
pub use node::NodeIndex;
pub use port::PortIndex;

/// The replication-factor ceiling (`spec.md` §4.2 P3).
pub const MAX_INSTANCES: u32 = 64;

/// One entry of the execution schedule (`spec.md` §3): a single replica
/// instance's handle paired with the descriptor that knows how to run it.
pub(crate) struct ScheduleEntry {
    pub instance: InstanceHandle,
    pub descriptor: Descriptor,
}

/// One slot of the external input/output mux tables (`spec.md` §3): `None`
/// means the channel is dropped (input discarded, output silenced).
pub(crate) struct MuxSlot {
    pub descriptor: Descriptor,
    pub instance: InstanceHandle,
    pub port_index: u32,
}

/// An executable filter-chain graph, owned exclusively by the control
/// thread except for its control cells (shared, lock-free, with the audio
/// thread — see [`port::ControlCell`]). Produced only by [`GraphCompiler::compile`];
/// there is no public mutation API, matching `spec.md`'s "no hot topology
/// edits" concurrency model (§5).
pub struct Graph {
    pub(crate) nodes: Vec<node::Node>,
    pub(crate) ports: Vec<port::Port>,
    pub(crate) links: Vec<link::Link>,
    pub(crate) schedule: Vec<ScheduleEntry>,
    pub(crate) input_mux: Vec<Option<MuxSlot>>,
    pub(crate) output_mux: Vec<Option<MuxSlot>>,
    /// The flat control-port table, in compile order (`spec.md` §3, §4.4).
    pub(crate) control_ports: Vec<PortIndex>,
    pub(crate) scratch: crate::buffers::ScratchBuffers,
}

// `Node`/`Port`/`MuxSlot`/`ScheduleEntry` embed raw `InstanceHandle` pointers
// from plugin vtables. They are only ever dereferenced on the audio thread
// (schedule, mux tables) or not at all (control thread only touches control
// cells, which are atomics) — see `spec.md` §5.
unsafe impl Send for Graph {}
unsafe impl Sync for Graph {}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn schedule_len(&self) -> usize {
        self.schedule.len()
    }

    pub fn control_port_count(&self) -> usize {
        self.control_ports.len()
    }

    pub(crate) fn control_port_cell(&self, index: usize) -> &port::ControlCell {
        let port_idx = self.control_ports[index];
        self.ports[port_idx.0 as usize].control_cell.as_ref().expect("control port missing its cell")
    }

    pub(crate) fn control_port_info(&self, index: usize) -> &crate::plugin::PortInfo {
        let port_idx = self.control_ports[index];
        let port = &self.ports[port_idx.0 as usize];
        let node = &self.nodes[port.node.0 as usize];
        node.descriptor
            .ports()
            .iter()
            .find(|p| p.descriptor_port_index == port.descriptor_port_index && p.kind == port.kind)
            .expect("control port must have a matching descriptor PortInfo")
    }

    /// `<node_name>:<port_name>`, or just `<port_name>` if the node is
    /// anonymous (`spec.md` §4.4).
    pub(crate) fn control_port_name(&self, index: usize) -> String {
        let port_idx = self.control_ports[index];
        let port = &self.ports[port_idx.0 as usize];
        let node = &self.nodes[port.node.0 as usize];
        let port_name = node
            .descriptor
            .ports()
            .iter()
            .find(|p| p.descriptor_port_index == port.descriptor_port_index && p.kind == port.kind)
            .map(|p| p.name.as_str())
            .unwrap_or("");
        if node.name.is_empty() {
            port_name.to_string()
        } else {
            format!("{}:{}", node.name, port_name)
        }
    }
}
