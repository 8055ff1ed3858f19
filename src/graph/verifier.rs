use std::error::Error;
use std::fmt;

use crate::graph::Graph;

/// Debug-only re-checks of the invariants `spec.md` §8 requires of every
/// successfully compiled graph. Run once at the end of [`super::compiler::GraphCompiler::compile`]
/// behind `cfg(debug_assertions)`; a release build trusts the compiler.
pub(crate) struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Verifier
    }

    pub fn verify(&mut self, graph: &Graph) -> Result<(), VerifyError> {
        for port in &graph.ports {
            if port.kind.is_input() && port.kind.is_audio() && port.links.len() > 1 {
                return Err(VerifyError::InputPortOverLinked { links: port.links.len() });
            }
            if port.is_externally_exposed() && !port.links.is_empty() {
                return Err(VerifyError::ExternalPortAlsoLinked);
            }
            if port.kind.is_input() && !port.kind.is_audio() && port.control_cell.is_none() {
                return Err(VerifyError::ControlPortMissingCell);
            }
        }

        let expected_schedule_len: usize = graph.nodes.iter().map(|n| n.instances.len()).sum();
        if graph.schedule.len() != expected_schedule_len {
            return Err(VerifyError::ScheduleLengthMismatch {
                expected: expected_schedule_len,
                actual: graph.schedule.len(),
            });
        }

        // Positions are recorded per-node the first time any of its
        // instances appears in the actual compiled schedule, not the arena's
        // declaration order — the schedule is what the audio thread runs.
        let mut instance_to_node = std::collections::HashMap::with_capacity(graph.schedule.len());
        for (node_idx, node) in graph.nodes.iter().enumerate() {
            for instance in &node.instances {
                instance_to_node.insert(*instance, node_idx);
            }
        }

        let mut position = vec![usize::MAX; graph.nodes.len()];
        for (pos, entry) in graph.schedule.iter().enumerate() {
            let node_idx = instance_to_node[&entry.instance];
            if position[node_idx] == usize::MAX {
                position[node_idx] = pos;
            }
        }

        for link in &graph.links {
            let output_node = graph.ports[link.output.0 as usize].node;
            let input_node = graph.ports[link.input.0 as usize].node;
            if position[output_node.0 as usize] >= position[input_node.0 as usize] {
                return Err(VerifyError::NotTopologicallyOrdered);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum VerifyError {
    InputPortOverLinked { links: usize },
    ExternalPortAlsoLinked,
    ControlPortMissingCell,
    ScheduleLengthMismatch { expected: usize, actual: usize },
    NotTopologicallyOrdered,
}

impl Error for VerifyError {}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::InputPortOverLinked { links } => {
                write!(f, "audio input port has {} incoming links, expected at most 1", links)
            }
            VerifyError::ExternalPortAlsoLinked => {
                write!(f, "an externally exposed port still has an internal link")
            }
            VerifyError::ControlPortMissingCell => {
                write!(f, "a control-in port was never wired to a scalar cell")
            }
            VerifyError::ScheduleLengthMismatch { expected, actual } => {
                write!(f, "execution schedule has {} entries, expected {}", actual, expected)
            }
            VerifyError::NotTopologicallyOrdered => {
                write!(f, "execution schedule is not a topological order of the node DAG")
            }
        }
    }
}
