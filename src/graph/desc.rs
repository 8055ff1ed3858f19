//! The declarative graph description (`spec.md` §6): a JSON tree of nodes,
//! links, and external port bindings, deserialized with `serde`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `"<node_name>:<port_name>"`, `"<port_name>"`, or `"<port_index_as_string>"`
/// (`spec.md` §4.2). Resolved against the node list by [`crate::graph::compiler`].
pub type PortRef = String;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphDesc {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    /// `None` means "bind the first/last node's entire audio port list";
    /// `Some(vec)` may still contain `None` entries for dropped channels.
    #[serde(default)]
    pub inputs: Option<Vec<Option<PortRef>>>,
    #[serde(default)]
    pub outputs: Option<Vec<Option<PortRef>>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plugin: Option<String>,
    pub label: String,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub control: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkSpec {
    pub output: PortRef,
    pub input: PortRef,
}
