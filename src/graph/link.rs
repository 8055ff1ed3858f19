use crate::graph::port::PortIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkIndex(pub(crate) u32);

/// An (output-port, input-port) edge (`spec.md` §3). Lives in the graph's
/// own arena; both endpoints hold this index in their per-port link lists.
pub(crate) struct Link {
    pub output: PortIndex,
    pub input: PortIndex,
}
