//! OutputNode: terminal sink that presents its single input.

use crate::gpu::shaders;
use crate::types::Resolution;
use serde::{Deserialize, Serialize};

/// Output nodes have no parameters; kept for a uniform persisted shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputParams {}

pub struct OutputNode {
    resolution: Option<Resolution>,
}

impl OutputNode {
    pub fn new() -> Self {
        Self { resolution: None }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn name(&self) -> &str {
        "Output"
    }

    pub fn shader(&self) -> &'static str {
        shaders::OUTPUT
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn uniforms(&self) -> Vec<f32> {
        Vec::new()
    }
}

impl Default for OutputNode {
    fn default() -> Self {
        Self::new()
    }
}
