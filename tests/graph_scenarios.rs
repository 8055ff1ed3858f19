//! End-to-end compile+run scenarios (`spec.md` §8).

use std::collections::HashMap;
use std::sync::Arc;

use filterchain::{Channel, ControlBridge, EngineConfig, GraphCompiler, GraphDesc, GraphRuntime, LinkSpec, NodeSpec, PluginRegistry};

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
fn identity_via_copy() {
    let desc = GraphDesc { nodes: vec![node("copy", "pass")], ..Default::default() };

    let mut registry = PluginRegistry::new(48_000.0);
    let graph = GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap();

    let runtime = GraphRuntime::new();
    let mut input = vec![1.0f32, -2.0, 3.0];
    let mut output = vec![0.0f32; 3];
    let ok = runtime.process_block(
        &graph,
        &mut [Channel::new(&mut input)],
        &mut [Channel::new(&mut output)],
    );

    assert!(ok);
    assert_eq!(output, vec![1.0, -2.0, 3.0]);
}

#[test]
fn gain_mixer() {
    let mut mix = node("mixer", "mix");
    mix.control.insert("Gain 1".to_string(), 2.0);

    let desc = GraphDesc {
        nodes: vec![mix],
        inputs: Some(vec![Some("In 1".to_string())]),
        outputs: Some(vec![Some("Out".to_string())]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let graph = GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap();

    let runtime = GraphRuntime::new();
    let mut input = vec![1.0f32, 2.0, 3.0];
    let mut output = vec![0.0f32; 3];
    let ok = runtime.process_block(
        &graph,
        &mut [Channel::new(&mut input)],
        &mut [Channel::new(&mut output)],
    );

    assert!(ok);
    assert_eq!(output, vec![2.0, 4.0, 6.0]);
}

#[test]
fn replication_doubles_instances() {
    let desc = GraphDesc { nodes: vec![node("copy", "pass")], ..Default::default() };

    let mut registry = PluginRegistry::new(48_000.0);
    let graph = GraphCompiler::compile(&desc, &mut registry, &config(2, 2)).unwrap();
    assert_eq!(graph.schedule_len(), 2);

    let runtime = GraphRuntime::new();
    let mut in0 = vec![1.0f32, 1.0];
    let mut in1 = vec![5.0f32, 5.0];
    let mut out0 = vec![0.0f32; 2];
    let mut out1 = vec![0.0f32; 2];
    let ok = runtime.process_block(
        &graph,
        &mut [Channel::new(&mut in0), Channel::new(&mut in1)],
        &mut [Channel::new(&mut out0), Channel::new(&mut out1)],
    );

    assert!(ok);
    assert_eq!(out0, vec![1.0, 1.0]);
    assert_eq!(out1, vec![5.0, 5.0]);
}

#[test]
fn fan_out_to_two_nodes_compiles() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "a"), node("copy", "b"), node("copy", "c")],
        links: vec![
            LinkSpec { output: "a:Out".to_string(), input: "b:In".to_string() },
            LinkSpec { output: "a:Out".to_string(), input: "c:In".to_string() },
        ],
        inputs: Some(vec![Some("a:In".to_string())]),
        outputs: Some(vec![Some("b:Out".to_string()), Some("c:Out".to_string())]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let graph = GraphCompiler::compile(&desc, &mut registry, &config(1, 2)).unwrap();

    let runtime = GraphRuntime::new();
    let mut input = vec![4.0f32, -1.0];
    let mut out_b = vec![0.0f32; 2];
    let mut out_c = vec![0.0f32; 2];
    let ok = runtime.process_block(
        &graph,
        &mut [Channel::new(&mut input)],
        &mut [Channel::new(&mut out_b), Channel::new(&mut out_c)],
    );

    assert!(ok);
    assert_eq!(out_b, vec![4.0, -1.0]);
    assert_eq!(out_c, vec![4.0, -1.0]);
}

#[test]
fn input_port_cannot_be_exposed_twice() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "pass")],
        inputs: Some(vec![Some("pass:In".to_string()), Some("pass:In".to_string())]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(2, 1)).unwrap_err();
    assert!(format!("{}", err).contains("already exposed"));
}

#[test]
fn fan_out_requires_a_mixer() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "a"), node("copy", "b"), node("copy", "c")],
        links: vec![
            LinkSpec { output: "a:Out".to_string(), input: "c:In".to_string() },
            LinkSpec { output: "b:Out".to_string(), input: "c:In".to_string() },
        ],
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap_err();
    assert!(format!("{}", err).contains("already in use"));
}

#[test]
fn external_port_cannot_be_exposed_twice() {
    let desc = GraphDesc {
        nodes: vec![node("copy", "pass")],
        outputs: Some(vec![Some("pass:Out".to_string()), Some("pass:Out".to_string())]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let err = GraphCompiler::compile(&desc, &mut registry, &config(1, 2)).unwrap_err();
    assert!(format!("{}", err).contains("already exposed"));
}

#[test]
fn control_round_trip() {
    let mix = node("mixer", "mix");

    let desc = GraphDesc {
        nodes: vec![mix],
        inputs: Some(vec![Some("In 1".to_string())]),
        outputs: Some(vec![Some("Out".to_string())]),
        ..Default::default()
    };

    let mut registry = PluginRegistry::new(48_000.0);
    let graph = Arc::new(GraphCompiler::compile(&desc, &mut registry, &config(1, 1)).unwrap());
    let bridge = ControlBridge::new(graph.clone());

    let initial = bridge.snapshot();
    assert_eq!(initial.get("mix:Gain 1"), Some(1.0));

    let changed = bridge.set("mix:Gain 1", 3.0);
    assert_eq!(changed, 1);
    assert_eq!(bridge.set("mix:Gain 1", 3.0), 0, "re-setting the same value reports no change");

    let runtime = GraphRuntime::new();
    let mut input = vec![2.0f32];
    let mut output = vec![0.0f32; 1];
    runtime.process_block(&graph, &mut [Channel::new(&mut input)], &mut [Channel::new(&mut output)]);
    assert_eq!(output, vec![6.0]);

    let snapshot = bridge.snapshot();
    assert_eq!(snapshot.get("mix:Gain 1"), Some(3.0));
}
