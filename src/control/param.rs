//! Parameter metadata and snapshots (`spec.md` §4.4).

use serde::{Deserialize, Serialize};

use crate::plugin::{PortHint, PortInfo};

/// A control port's value type, derived from its descriptor hint flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    Int,
    Float,
}

/// Static metadata for one parameter, named `<node_name>:<port_name>` (or
/// just `<port_name>` for an anonymous node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub param_type: ParamType,
    pub min: f32,
    pub max: f32,
}

impl ParamInfo {
    /// BOOLEAN ⇒ boolean, INTEGER ⇒ integer (or fixed bool if min==max),
    /// else float (`spec.md` §4.4).
    pub(crate) fn from_port_info(name: String, info: &PortInfo) -> Self {
        let param_type = if info.hint.contains(PortHint::BOOLEAN) {
            ParamType::Bool
        } else if info.hint.contains(PortHint::INTEGER) {
            if info.min == info.max {
                ParamType::Bool
            } else {
                ParamType::Int
            }
        } else {
            ParamType::Float
        };
        ParamInfo { name, param_type, min: info.min, max: info.max }
    }
}

/// A full snapshot of every control port's current value, in
/// `graph.control_port` order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    pub values: Vec<(String, f32)>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<f32> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}
