use crate::graph::port::PortIndex;
use crate::plugin::{Descriptor, InstanceHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub(crate) u32);

/// One vertex of the graph (`spec.md` §3): a descriptor plus `N` parallel
/// instances, one per replication factor, sharing one set of ports.
pub(crate) struct Node {
    pub name: String,
    pub descriptor: Descriptor,
    pub config: Option<serde_json::Value>,
    /// One handle per replica instance; `instances.len() == N` for every
    /// node in a compiled graph.
    pub instances: Vec<InstanceHandle>,
    pub audio_in: Vec<PortIndex>,
    pub audio_out: Vec<PortIndex>,
    pub control_in: Vec<PortIndex>,
    pub control_out: Vec<PortIndex>,
    pub in_degree: u32,
    pub visited: bool,
}

impl Node {
    pub fn audio_in_count(&self) -> usize {
        self.audio_in.len()
    }

    pub fn audio_out_count(&self) -> usize {
        self.audio_out.len()
    }
}
