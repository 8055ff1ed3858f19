//! The non-real-time side of parameter control (`spec.md` §4.4): discovers
//! one parameter per control port and reads/writes the same scalar cells
//! the audio thread's plugins read from.

mod param;

use std::sync::Arc;

pub use param::{ParamInfo, ParamType, Params};

use crate::graph::Graph;

/// Built from a compiled [`Graph`] shared with the audio thread. Every
/// operation here is a plain atomic load/store on the graph's control
/// cells (`spec.md` §5) — no lock, no allocation.
pub struct ControlBridge {
    graph: Arc<Graph>,
    params: Vec<ParamInfo>,
}

impl ControlBridge {
    pub fn new(graph: Arc<Graph>) -> Self {
        let params = (0..graph.control_port_count())
            .map(|i| ParamInfo::from_port_info(graph.control_port_name(i), graph.control_port_info(i)))
            .collect();
        ControlBridge { graph, params }
    }

    pub fn params(&self) -> &[ParamInfo] {
        &self.params
    }

    /// Finds the port by full name, coerces `value` to float, and writes it
    /// only if it differs from the current cell. Unknown names are ignored.
    pub fn set(&self, name: &str, value: f64) -> u32 {
        match self.params.iter().position(|p| p.name == name) {
            Some(index) => {
                let cell = self.graph.control_port_cell(index);
                let value = value as f32;
                if cell.get() != value {
                    cell.set(value);
                    1
                } else {
                    0
                }
            }
            None => 0,
        }
    }

    pub fn snapshot(&self) -> Params {
        let values = self
            .params
            .iter()
            .enumerate()
            .map(|(i, info)| (info.name.clone(), self.graph.control_port_cell(i).get()))
            .collect();
        Params { values }
    }

    /// Applies an inbound parameter blob, returning the fresh snapshot to
    /// push back to observers only if something actually changed.
    pub fn apply_blob(&self, blob: &Params) -> Option<Params> {
        let mut changed = 0;
        for (name, value) in &blob.values {
            changed += self.set(name, *value as f64);
        }
        if changed > 0 {
            Some(self.snapshot())
        } else {
            None
        }
    }
}
