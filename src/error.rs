use std::error::Error;
use std::fmt;

/// Errors raised while compiling a graph description: malformed input,
/// unknown references, port-usage violations, or a cycle.
#[derive(Debug, Clone)]
pub enum ConfigError {
    MissingField { node: String, field: &'static str },
    UnknownType(String),
    UnknownPort { node: String, port: String },
    UnknownNode(String),
    PortAlreadyLinked { node: String, port: String },
    PortNotAudio { node: String, port: String },
    ExternalAlreadyExposed { reference: String },
    ZeroChannels { which: &'static str },
    ChannelMismatch { channels_capture: u32, n_in: u32, channels_playback: u32, n_out: u32 },
    Cyclic,
}

impl Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField { node, field } => {
                write!(f, "node {:?} is missing required field {:?}", node, field)
            }
            ConfigError::UnknownType(t) => write!(f, "unknown node type {:?}", t),
            ConfigError::UnknownPort { node, port } => {
                write!(f, "node {:?} has no port named {:?}", node, port)
            }
            ConfigError::UnknownNode(n) => write!(f, "no node named {:?}", n),
            ConfigError::PortAlreadyLinked { node, port } => {
                write!(f, "port {:?}:{:?} is already in use (use a mixer)", node, port)
            }
            ConfigError::PortNotAudio { node, port } => {
                write!(f, "port {:?}:{:?} is not an audio port", node, port)
            }
            ConfigError::ExternalAlreadyExposed { reference } => {
                write!(f, "port {:?} is already exposed externally", reference)
            }
            ConfigError::ZeroChannels { which } => {
                write!(f, "{} resolved to zero channels", which)
            }
            ConfigError::ChannelMismatch { channels_capture, n_in, channels_playback, n_out } => {
                write!(
                    f,
                    "channels_capture ({}) / n_in ({}) does not match channels_playback ({}) / n_out ({})",
                    channels_capture, n_in, channels_playback, n_out
                )
            }
            ConfigError::Cyclic => write!(f, "CYCLIC_GRAPH"),
        }
    }
}

/// Errors raised while loading a plugin library or resolving a descriptor
/// label within it.
#[derive(Debug, Clone)]
pub enum LoadError {
    UnsupportedType(String),
    NotFound { plugin_type: String, path: String },
    LoadFailed { plugin_type: String, path: String, reason: String },
    LabelNotFound { path: String, label: String },
}

impl Error for LoadError {}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedType(t) => write!(f, "unsupported plugin type {:?}", t),
            LoadError::NotFound { plugin_type, path } => {
                write!(f, "{} plugin not found at {:?}", plugin_type, path)
            }
            LoadError::LoadFailed { plugin_type, path, reason } => {
                write!(f, "failed to load {} plugin {:?}: {}", plugin_type, path, reason)
            }
            LoadError::LabelNotFound { path, label } => {
                write!(f, "plugin {:?} has no descriptor labeled {:?}", path, label)
            }
        }
    }
}

/// Raised when the graph's replication or channel-count requirements exceed
/// an engine-imposed limit.
#[derive(Debug, Clone, Copy)]
pub enum CapacityError {
    TooManyInstances { requested: u32, max: u32 },
}

impl Error for CapacityError {}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityError::TooManyInstances { requested, max } => write!(
                f,
                "replication factor {} exceeds the maximum of {} instances",
                requested, max
            ),
        }
    }
}

/// Raised when a plugin fails to instantiate or activate, or a required
/// allocation fails.
#[derive(Debug, Clone)]
pub enum ResourceError {
    InstantiationFailed { node: String, reason: String },
    ActivationFailed { node: String, reason: String },
}

impl Error for ResourceError {}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InstantiationFailed { node, reason } => {
                write!(f, "failed to instantiate node {:?}: {}", node, reason)
            }
            ResourceError::ActivationFailed { node, reason } => {
                write!(f, "failed to activate node {:?}: {}", node, reason)
            }
        }
    }
}

/// The top-level error type for anything that can go wrong on the control
/// thread. There is no runtime counterpart: a block the audio thread cannot
/// process is simply skipped (see [`crate::runtime::GraphRuntime::process_block`]),
/// not reported as an error.
#[derive(Debug, Clone)]
pub enum FilterChainError {
    Config(ConfigError),
    Load(LoadError),
    Capacity(CapacityError),
    Resource(ResourceError),
}

impl Error for FilterChainError {}

impl fmt::Display for FilterChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterChainError::Config(e) => write!(f, "{}", e),
            FilterChainError::Load(e) => write!(f, "{}", e),
            FilterChainError::Capacity(e) => write!(f, "{}", e),
            FilterChainError::Resource(e) => write!(f, "{}", e),
        }
    }
}

impl From<ConfigError> for FilterChainError {
    fn from(e: ConfigError) -> Self {
        FilterChainError::Config(e)
    }
}
impl From<LoadError> for FilterChainError {
    fn from(e: LoadError) -> Self {
        FilterChainError::Load(e)
    }
}
impl From<CapacityError> for FilterChainError {
    fn from(e: CapacityError) -> Self {
        FilterChainError::Capacity(e)
    }
}
impl From<ResourceError> for FilterChainError {
    fn from(e: ResourceError) -> Self {
        FilterChainError::Resource(e)
    }
}
