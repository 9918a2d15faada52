//! Errors raised by the scene hierarchy.

/// Errors that can occur while building scene nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The requested feature kind has no constructor.
    UnsupportedFeature(String),
    /// The requested layer kind has no constructor.
    UnsupportedLayer(String),
    /// The node has already been torn down.
    Detached,
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::UnsupportedFeature(name) => {
                write!(f, "Unsupported feature type: {}", name)
            }
            SceneError::UnsupportedLayer(name) => write!(f, "Unsupported layer type: {}", name),
            SceneError::Detached => write!(f, "Node has been torn down"),
        }
    }
}

impl std::error::Error for SceneError {}
