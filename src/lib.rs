//! A real-time audio filter-chain graph engine.
//!
//! A host (the capture/playback stream transport, a plugin module loader,
//! whatever drives the control surface) builds a [`graph::Graph`] from a
//! declarative [`graph::desc::GraphDesc`] via [`graph::compiler`], then drives
//! it each audio block with [`runtime::GraphRuntime`]. Live parameter changes
//! come in through [`control::ControlBridge`].
//!
//! Nothing in this crate spawns the audio thread, owns the capture/playback
//! streams, or picks a logging backend: it only emits [`log`] calls and
//! expects the host to have installed a logger.

mod buffers;
mod config;
mod error;

pub mod control;
pub mod graph;
pub mod plugin;
pub mod runtime;

pub use config::EngineConfig;
pub use error::{CapacityError, ConfigError, FilterChainError, LoadError, ResourceError};

pub use control::ControlBridge;
pub use graph::desc::{GraphDesc, LinkSpec, NodeSpec, PortRef};
pub use graph::{Graph, GraphCompiler, MAX_INSTANCES};
pub use plugin::registry::PluginRegistry;
pub use runtime::{Channel, GraphRuntime};
