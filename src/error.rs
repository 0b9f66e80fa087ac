//! Error handling for pixgraph
//!
//! Each subsystem has its own error enum ([`GraphError`], [`BackendError`],
//! [`CaptureError`]). This module ties them together into [`PixError`] and
//! a Result alias for host-facing code such as configuration loading.

use crate::capture::CaptureError;
use crate::gpu::BackendError;
use crate::graph::GraphError;
use thiserror::Error;

/// Main error type for pixgraph operations
#[derive(Error, Debug)]
pub enum PixError {
    /// Topology or parameter errors raised by the render graph
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Errors reported by the GPU backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Errors from the capture adapters
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PixError>,
    },
}

impl PixError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PixError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for PixError {
    fn from(err: serde_json::Error) -> Self {
        PixError::Serialization(err.to_string())
    }
}

/// Result type alias for pixgraph operations
pub type Result<T> = std::result::Result<T, PixError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PixError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn test_error_display() {
        let err = PixError::Config("missing fps".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing fps");
    }

    #[test]
    fn test_error_with_context() {
        let err = PixError::Serialization("bad json".to_string());
        let with_ctx = err.with_context("Failed to decode node");
        assert!(with_ctx.to_string().contains("Failed to decode node"));
        assert!(with_ctx.to_string().contains("bad json"));
    }

    #[test]
    fn test_graph_error_converts() {
        let result: std::result::Result<(), GraphError> =
            Err(GraphError::UnknownNode(NodeId(3)));
        let err = result.context("connect").unwrap_err();
        assert!(err.to_string().starts_with("connect: "));
        assert!(err.to_string().contains("NodeId(3)"));
    }
}
