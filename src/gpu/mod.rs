//! GPU backend boundary.
//!
//! The render graph never talks to a graphics API directly. Every node
//! recompute becomes one [`RenderRequest`] handed to a [`GpuBackend`]: a named
//! shader, its positional uniforms, and one optional input artifact per slot.
//! The backend has no names for uniforms, so each node type must emit them in
//! a fixed order.
//!
//! [`SoftwareBackend`] is a deterministic CPU implementation of the built-in
//! shaders, used by tests, benches and the headless host.

pub mod software;

pub use software::SoftwareBackend;

use crate::capture::FrameBuffer;
use crate::graph::modes::{ExtendMode, FillMode};
use crate::types::{PixelFormat, Resolution};
use std::fmt;
use thiserror::Error;

/// Shader identifiers of the built-in node types.
pub mod shaders {
    pub const NOISE: &str = "contentGeneratorNoisePIX";
    pub const CAMERA: &str = "contentResourceCameraPIX";
    pub const LEVELS: &str = "effectSingleLevelsPIX";
    pub const BLENDS: &str = "effectMultiBlendsPIX";
    pub const OUTPUT: &str = "outputPIX";
    pub const RESAMPLE: &str = "resamplePIX";
}

/// Opaque backend texture identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Texture#{}", self.0)
    }
}

/// A GPU-resident node output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Artifact {
    pub texture: TextureHandle,
    pub resolution: Resolution,
    pub format: PixelFormat,
}

/// One shader invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Shader identifier
    pub shader: &'static str,
    /// Positional uniforms, in the order the node type declares them
    pub uniforms: Vec<f32>,
    /// One entry per input slot; `None` is an empty slot
    pub inputs: Vec<Option<Artifact>>,
    /// Output size
    pub resolution: Resolution,
    /// Output channel depth
    pub format: PixelFormat,
}

/// Errors reported by a GPU backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Render of '{shader}' failed: {message}")]
    Render {
        shader: &'static str,
        message: String,
    },

    #[error("Unknown shader '{0}'")]
    UnknownShader(String),

    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureHandle),

    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Interface to whatever executes shaders and owns textures.
///
/// Calls are synchronous from the graph's point of view. Implementations
/// report failures as values; the scheduler keeps the node dirty and retries
/// on the next tick.
#[cfg_attr(test, mockall::automock)]
pub trait GpuBackend {
    /// Run a shader and return the produced texture.
    fn render(&mut self, request: &RenderRequest) -> Result<Artifact, BackendError>;

    /// Turn a captured CPU frame into a source texture.
    fn upload(&mut self, frame: &FrameBuffer, format: PixelFormat)
        -> Result<Artifact, BackendError>;

    /// Produce a copy of `input` at `resolution`.
    ///
    /// The default implementation runs the resample shader with
    /// `[fill index, extend index]` as uniforms.
    fn resample(
        &mut self,
        input: &Artifact,
        resolution: Resolution,
        fill: FillMode,
        extend: ExtendMode,
    ) -> Result<Artifact, BackendError> {
        self.render(&RenderRequest {
            shader: shaders::RESAMPLE,
            uniforms: vec![fill.index() as f32, extend.index() as f32],
            inputs: vec![Some(*input)],
            resolution,
            format: input.format,
        })
    }

    /// Read back all channels of a texture as normalized RGBA, row-major.
    fn read_normalized(&self, artifact: &Artifact) -> Option<Vec<f32>>;

    /// The texture is no longer referenced by the graph.
    fn release(&mut self, _artifact: &Artifact) {}
}
