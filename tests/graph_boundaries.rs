//! Compiler boundary cases (`spec.md` §8).

use std::collections::HashMap;

use filterchain::{CapacityError, ConfigError, EngineConfig, FilterChainError, GraphCompiler, GraphDesc, LinkSpec, NodeSpec, PluginRegistry};

fn node(label: &str, name: &str) -> NodeSpec {
    NodeSpec {
        node_type: "builtin".to_string(),
        name: name.to_string(),
        plugin: None,
        label: label.to_string(),
        config: None,
        control: HashMap::new(),
    }
}

fn config(channels_capture: u32, channels_playback: u32) -> EngineConfig {
    EngineConfig::new(48_000.0, 64, 256, channels_capture, channels_playback)
}

#[test]
fn zero_channels_is_rejected() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "pass")],
        inputs: Some(vec![]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap_err();
    assert!(matches!(err, FilterChainError::Config(ConfigError::ZeroChannels { which: "inputs" })));
}

#[test]
fn mismatched_replication_is_rejected() {
    let desc = GraphDesc { nodes: vec![node("copy", "pass")], ..Default::default() };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(3, 4)).unwrap_err();
    assert!(matches!(err, FilterChainError::Config(ConfigError::ChannelMismatch { .. })));
}

#[test]
fn replication_above_the_instance_cap_is_rejected() {
    let desc = GraphDesc { nodes: vec![node("copy", "pass")], ..Default::default() };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(65, 65)).unwrap_err();
    assert!(matches!(
        err,
        FilterChainError::Capacity(CapacityError::TooManyInstances { requested: 65, max: 64 })
    ));
}

#[test]
fn cyclic_graph_is_rejected() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "a"), node("copy", "b"), node("copy", "external")],
        links: vec![
            LinkSpec { output: "a:Out".to_string(), input: "b:In".to_string() },
            LinkSpec { output: "b:Out".to_string(), input: "a:In".to_string() },
        ],
        inputs: Some(vec![Some("external:In".to_string())]),
        outputs: Some(vec![Some("external:Out".to_string())]),
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap_err();
    assert!(matches!(err, FilterChainError::Config(ConfigError::Cyclic)));
}
