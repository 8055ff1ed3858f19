//! The five-phase graph compiler (`spec.md` §4.2): node materialization,
//! link resolution, external binding and replication, port exposure, and
//! Kahn's-algorithm scheduling.

use std::collections::VecDeque;

use crate::buffers::ScratchBuffers;
use crate::config::EngineConfig;
use crate::error::{CapacityError, ConfigError, FilterChainError, ResourceError};
use crate::graph::desc::GraphDesc;
use crate::graph::link::{Link, LinkIndex};
use crate::graph::node::{Node, NodeIndex};
use crate::graph::port::{ControlCell, Port, PortIndex, NONE};
use crate::graph::verifier::Verifier;
use crate::graph::{Graph, MuxSlot, ScheduleEntry};
use crate::plugin::{PluginRegistry, PluginType, PortKind};

pub struct GraphCompiler;

impl GraphCompiler {
    /// Turns a declarative [`GraphDesc`] into an executable [`Graph`]
    /// (`spec.md` §4.2). Any error after P1 rolls back every already
    /// instantiated plugin handle; no partial graph is ever returned.
    pub fn compile(
        desc: &GraphDesc,
        registry: &mut PluginRegistry,
        config: &EngineConfig,
    ) -> Result<Graph, FilterChainError> {
        for dir in config.search_dirs() {
            registry.add_search_dir(dir.clone());
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(desc.nodes.len());
        let mut ports: Vec<Port> = Vec::new();
        let mut links: Vec<Link> = Vec::new();

        // P1 - node materialization.
        for spec in &desc.nodes {
            let plugin_type: PluginType = spec
                .node_type
                .parse()
                .map_err(|_| ConfigError::UnknownType(spec.node_type.clone()))?;

            let path = if plugin_type == PluginType::Builtin {
                "builtin".to_string()
            } else {
                spec.plugin.clone().ok_or_else(|| ConfigError::MissingField {
                    node: spec.name.clone(),
                    field: "plugin",
                })?
            };

            let plugin = registry.load(plugin_type, &path)?;
            let descriptor = registry.descriptor(&plugin, &spec.label)?;

            let node_index = NodeIndex(nodes.len() as u32);
            let audio_in =
                push_node_ports(&mut ports, node_index, PortKind::AudioIn, descriptor.audio_in_ports());
            let audio_out =
                push_node_ports(&mut ports, node_index, PortKind::AudioOut, descriptor.audio_out_ports());
            let control_in = push_node_ports(
                &mut ports,
                node_index,
                PortKind::ControlIn,
                descriptor.control_in_ports(),
            );
            let control_out = push_node_ports(
                &mut ports,
                node_index,
                PortKind::ControlOut,
                descriptor.control_out_ports(),
            );

            let defaults = descriptor.control_defaults();
            for (i, &port_index) in control_in.iter().enumerate() {
                ports[port_index.0 as usize].control_cell = Some(ControlCell::new(defaults[i]));
            }
            for &port_index in &control_out {
                ports[port_index.0 as usize].control_cell = Some(ControlCell::new(0.0));
            }

            for (name, value) in &spec.control {
                match descriptor.ports().iter().find(|p| p.kind == PortKind::ControlIn && &p.name == name) {
                    Some(info) => {
                        let target = control_in
                            .iter()
                            .find(|&&pi| ports[pi.0 as usize].descriptor_port_index == info.descriptor_port_index);
                        if let Some(&pi) = target {
                            ports[pi.0 as usize].control_cell.as_ref().unwrap().set(*value as f32);
                        }
                    }
                    None => {
                        log::warn!(
                            "filterchain: node {:?} has no control port named {:?}, ignoring",
                            spec.name,
                            name
                        );
                    }
                }
            }

            nodes.push(Node {
                name: spec.name.clone(),
                descriptor,
                config: spec.config.clone(),
                instances: Vec::new(),
                audio_in,
                audio_out,
                control_in,
                control_out,
                in_degree: 0,
                visited: false,
            });
        }

        // P2 - link resolution.
        for link_spec in &desc.links {
            let (out_node, out_dpi) = resolve_ref(&nodes, &link_spec.output, true)?;
            let (in_node, in_dpi) = resolve_ref(&nodes, &link_spec.input, false)?;

            let output_port = port_index_for(&nodes, &ports, out_node, out_dpi, true);
            let input_port = port_index_for(&nodes, &ports, in_node, in_dpi, false);

            if !ports[input_port.0 as usize].links.is_empty() {
                return Err(ConfigError::PortAlreadyLinked {
                    node: nodes[in_node].name.clone(),
                    port: link_spec.input.clone(),
                }
                .into());
            }

            let link_index = LinkIndex(links.len() as u32);
            links.push(Link { output: output_port, input: input_port });
            ports[output_port.0 as usize].links.push(link_index);
            ports[input_port.0 as usize].links.push(link_index);
            nodes[in_node].in_degree += 1;
        }

        // P3 - external binding and replication.
        let n_in = match &desc.inputs {
            Some(v) => v.len() as u32,
            None => nodes.first().map(|n| n.audio_in.len() as u32).unwrap_or(0),
        };
        let n_out = match &desc.outputs {
            Some(v) => v.len() as u32,
            None => nodes.last().map(|n| n.audio_out.len() as u32).unwrap_or(0),
        };
        if n_in == 0 {
            return Err(ConfigError::ZeroChannels { which: "inputs" }.into());
        }
        if n_out == 0 {
            return Err(ConfigError::ZeroChannels { which: "outputs" }.into());
        }

        let replication = config.channels_capture / n_in;
        if config.channels_playback / n_out != replication {
            return Err(ConfigError::ChannelMismatch {
                channels_capture: config.channels_capture,
                n_in,
                channels_playback: config.channels_playback,
                n_out,
            }
            .into());
        }
        if replication > config.max_instances {
            return Err(
                CapacityError::TooManyInstances { requested: replication, max: config.max_instances }.into()
            );
        }
        let replication = if replication == 0 {
            log::warn!("filterchain: replication factor is 0, forcing N=1 (some channels will be unconnected)");
            1
        } else {
            replication
        };

        let mut scratch = ScratchBuffers::new(config.max_block_frames as usize);

        if let Err(e) = instantiate_nodes(&mut nodes, &ports, config, replication, &mut scratch) {
            rollback(&nodes);
            return Err(e);
        }

        // P4 - port exposure.
        let input_mux = match build_mux_table(&nodes, &mut ports, &desc.inputs, n_in, replication, false) {
            Ok(t) => t,
            Err(e) => {
                rollback(&nodes);
                return Err(e.into());
            }
        };
        let output_mux = match build_mux_table(&nodes, &mut ports, &desc.outputs, n_out, replication, true) {
            Ok(t) => t,
            Err(e) => {
                rollback(&nodes);
                return Err(e.into());
            }
        };

        // P5 - scheduling.
        let (schedule, control_ports) =
            match topological_schedule(&mut nodes, &mut ports, &links, replication, &scratch) {
                Ok(r) => r,
                Err(e) => {
                    rollback(&nodes);
                    return Err(e.into());
                }
            };

        let graph = Graph { nodes, ports, links, schedule, input_mux, output_mux, control_ports, scratch };

        #[cfg(debug_assertions)]
        {
            if let Err(e) = Verifier::new().verify(&graph) {
                panic!("filterchain: internal invariant violated after compilation: {}", e);
            }
        }

        Ok(graph)
    }
}

fn push_node_ports(
    ports: &mut Vec<Port>,
    node_index: NodeIndex,
    kind: PortKind,
    descriptor_port_indices: &[u32],
) -> Vec<PortIndex> {
    let mut out = Vec::with_capacity(descriptor_port_indices.len());
    for (i, &dpi) in descriptor_port_indices.iter().enumerate() {
        let port_index = PortIndex(ports.len() as u32);
        ports.push(Port::new(node_index, kind, i as u32, dpi));
        out.push(port_index);
    }
    out
}

/// Resolves a `PortRef` (`"node:port"`, `"port"`, or `"index"`) against the
/// node list, returning `(node_index, descriptor_port_index)`. A reference
/// without a `:` defaults to the first node for an input-side resolution and
/// the last node for an output-side one (`spec.md` §4.2 P2).
fn resolve_ref(nodes: &[Node], reference: &str, is_output_side: bool) -> Result<(usize, u32), ConfigError> {
    let (node_name, token) = match reference.split_once(':') {
        Some((n, t)) => (Some(n), t),
        None => (None, reference),
    };

    let node_index = match node_name {
        Some(name) => nodes
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))?,
        None => {
            if nodes.is_empty() {
                return Err(ConfigError::UnknownNode(reference.to_string()));
            }
            if is_output_side {
                nodes.len() - 1
            } else {
                0
            }
        }
    };

    let node = &nodes[node_index];
    let info = node
        .descriptor
        .resolve_port(token, !is_output_side)
        .ok_or_else(|| ConfigError::UnknownPort { node: node.name.clone(), port: token.to_string() })?;

    Ok((node_index, info.descriptor_port_index))
}

fn port_index_for(
    nodes: &[Node],
    ports: &[Port],
    node_index: usize,
    descriptor_port_index: u32,
    is_output_side: bool,
) -> PortIndex {
    let node = &nodes[node_index];
    let candidates = if is_output_side { &node.audio_out } else { &node.audio_in };
    *candidates
        .iter()
        .find(|&&pi| ports[pi.0 as usize].descriptor_port_index == descriptor_port_index)
        .expect("resolved descriptor port index must exist in the node's own port arena")
}

fn rollback(nodes: &[Node]) {
    for node in nodes {
        for &handle in &node.instances {
            node.descriptor.cleanup(handle);
        }
    }
}

/// Creates `replication` instances per node at the runtime sample rate,
/// pre-wires every port to the shared scratch buffers (or the node's control
/// cell), and activates each instance (`spec.md` §4.2 P3).
fn instantiate_nodes(
    nodes: &mut [Node],
    ports: &[Port],
    config: &EngineConfig,
    replication: u32,
    scratch: &mut ScratchBuffers,
) -> Result<(), FilterChainError> {
    for node in nodes.iter_mut() {
        for _ in 0..replication {
            let handle = node
                .descriptor
                .instantiate(config.sample_rate, node.config.as_ref())
                .map_err(|reason| ResourceError::InstantiationFailed { node: node.name.clone(), reason })?;
            node.instances.push(handle);
        }

        for &port_index in node.audio_in.iter() {
            let dpi = ports[port_index.0 as usize].descriptor_port_index;
            for &instance in &node.instances {
                node.descriptor.connect_port(instance, dpi, scratch.silence_ptr() as *mut f32);
            }
        }
        for &port_index in node.audio_out.iter() {
            let dpi = ports[port_index.0 as usize].descriptor_port_index;
            for &instance in &node.instances {
                node.descriptor.connect_port(instance, dpi, scratch.discard_ptr());
            }
        }
        for &port_index in node.control_in.iter().chain(node.control_out.iter()) {
            let dpi = ports[port_index.0 as usize].descriptor_port_index;
            let cell_ptr = ports[port_index.0 as usize].control_cell.as_ref().unwrap().as_ptr();
            for &instance in &node.instances {
                node.descriptor.connect_port(instance, dpi, cell_ptr);
            }
        }

        for &instance in &node.instances {
            node.descriptor.activate(instance);
        }
    }

    Ok(())
}

/// Builds one external mux table (`spec.md` §3, §4.2 P4). `refs = None`
/// behaves exactly like `refs = Some(["0", "1", ..., "n-1"])` against the
/// default node, since an un-prefixed numeric token is itself an index.
fn build_mux_table(
    nodes: &[Node],
    ports: &mut [Port],
    refs: &Option<Vec<Option<String>>>,
    n: u32,
    replication: u32,
    is_output_side: bool,
) -> Result<Vec<Option<MuxSlot>>, ConfigError> {
    let effective: Vec<Option<String>> = match refs {
        Some(v) => v.clone(),
        None => (0..n).map(|i| Some(i.to_string())).collect(),
    };

    let mut table: Vec<Option<MuxSlot>> = (0..(n * replication)).map(|_| None).collect();

    for (logical_idx, reference) in effective.iter().enumerate() {
        let reference = match reference {
            Some(r) => r,
            None => continue,
        };

        let (node_index, dpi) = resolve_ref(nodes, reference, is_output_side)?;
        let port_index = port_index_for(nodes, ports, node_index, dpi, is_output_side);
        let port = &ports[port_index.0 as usize];

        if port.is_externally_exposed() {
            return Err(ConfigError::ExternalAlreadyExposed { reference: reference.clone() });
        }
        if !port.links.is_empty() {
            return Err(ConfigError::PortAlreadyLinked {
                node: nodes[node_index].name.clone(),
                port: reference.clone(),
            });
        }

        ports[port_index.0 as usize].external = logical_idx as u32;

        for instance_idx in 0..replication {
            let slot = MuxSlot {
                descriptor: nodes[node_index].descriptor.clone(),
                instance: nodes[node_index].instances[instance_idx as usize],
                port_index: dpi,
            };
            table[(instance_idx * n) as usize + logical_idx] = Some(slot);
        }
    }

    Ok(table)
}

/// Kahn's-algorithm topological scheduling (`spec.md` §4.2 P5): repeatedly
/// dispatches a zero-in-degree node, wires its real internal links (the
/// producer has necessarily already been scheduled), appends its instances
/// to the execution schedule, and allocates+connects its output buffers.
fn topological_schedule(
    nodes: &mut [Node],
    ports: &mut [Port],
    links: &[Link],
    replication: u32,
    scratch: &ScratchBuffers,
) -> Result<(Vec<ScheduleEntry>, Vec<PortIndex>), ConfigError> {
    let mut schedule = Vec::with_capacity(nodes.len() * replication as usize);
    let mut control_ports = Vec::new();
    let mut queue: VecDeque<usize> =
        nodes.iter().enumerate().filter(|(_, n)| n.in_degree == 0).map(|(i, _)| i).collect();
    let mut visited_count = 0;

    while let Some(node_index) = queue.pop_front() {
        if nodes[node_index].visited {
            continue;
        }
        nodes[node_index].visited = true;
        visited_count += 1;

        let descriptor = nodes[node_index].descriptor.clone();

        let audio_in = nodes[node_index].audio_in.clone();
        for port_index in audio_in {
            let incoming = ports[port_index.0 as usize].links.first().copied();
            if let Some(link_index) = incoming {
                let output_port_index = links[link_index.0 as usize].output;
                let dpi = ports[port_index.0 as usize].descriptor_port_index;
                for i in 0..replication as usize {
                    let ptr = ports[output_port_index.0 as usize].audio_buffers[i].as_mut_ptr();
                    let instance = nodes[node_index].instances[i];
                    descriptor.connect_port(instance, dpi, ptr);
                }
            }
        }

        for i in 0..replication as usize {
            schedule.push(ScheduleEntry { instance: nodes[node_index].instances[i], descriptor: descriptor.clone() });
        }

        let audio_out = nodes[node_index].audio_out.clone();
        for port_index in audio_out {
            let dpi = ports[port_index.0 as usize].descriptor_port_index;
            if ports[port_index.0 as usize].audio_buffers.is_empty() {
                let frames = scratch.len();
                ports[port_index.0 as usize].audio_buffers =
                    (0..replication).map(|_| vec![0.0f32; frames]).collect();
            }
            for i in 0..replication as usize {
                let ptr = ports[port_index.0 as usize].audio_buffers[i].as_mut_ptr();
                let instance = nodes[node_index].instances[i];
                descriptor.connect_port(instance, dpi, ptr);
            }

            let outgoing = ports[port_index.0 as usize].links.clone();
            for link_index in outgoing {
                let downstream_port = links[link_index.0 as usize].input;
                let downstream_node = ports[downstream_port.0 as usize].node;
                nodes[downstream_node.0 as usize].in_degree -= 1;
                if nodes[downstream_node.0 as usize].in_degree == 0 && !nodes[downstream_node.0 as usize].visited {
                    queue.push_back(downstream_node.0 as usize);
                }
            }
        }

        control_ports.extend(nodes[node_index].control_in.iter().copied());
    }

    if visited_count != nodes.len() {
        return Err(ConfigError::Cyclic);
    }

    Ok((schedule, control_ports))
}
