//! Node abstraction for the render graph.
//!
//! Two-layer design:
//! - **`PixNode` trait** for host-defined node types.
//! - **`BuiltinNode` enum** for the built-in node types, dispatched with
//!   plain matches.
//!
//! `AnyNode` wraps either variant so the graph can handle both uniformly.
//!
//! # Roles
//!
//! A node's [`NodeKind`] decides its capabilities: every kind except
//! [`NodeKind::OutputSink`] can produce, every kind except the two source
//! kinds can consume, and only [`NodeKind::MultiInputEffect`] has more than
//! one input slot.

use crate::capture::FrameBuffer;
use crate::config::EngineConfig;
use crate::graph::bridge::EventSender;
use crate::graph::id::NodeId;
use crate::graph::modes::{ExtendMode, FillMode};
use crate::graph::nodes::{BlendsNode, CameraNode, LevelsNode, NoiseNode, OutputNode};
use crate::graph::param::{Param, ParamError, ParamValue};
use crate::types::Resolution;

/// Role of a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Procedural content, no inputs
    Generator,
    /// Externally-fed content (camera), no inputs
    Resource,
    /// One required input
    SingleInputEffect,
    /// N optional inputs
    MultiInputEffect,
    /// One required input, cannot feed other nodes
    OutputSink,
}

impl NodeKind {
    /// Whether other nodes may take this node as an input.
    pub fn can_produce(&self) -> bool {
        !matches!(self, NodeKind::OutputSink)
    }

    /// Whether this node has input slots.
    pub fn can_consume(&self) -> bool {
        !self.is_source()
    }

    /// Generators and resources start a render chain.
    pub fn is_source(&self) -> bool {
        matches!(self, NodeKind::Generator | NodeKind::Resource)
    }

    /// Number of input slots unless the node declares otherwise.
    pub fn default_input_slots(&self) -> usize {
        match self {
            NodeKind::Generator | NodeKind::Resource => 0,
            NodeKind::SingleInputEffect | NodeKind::OutputSink => 1,
            NodeKind::MultiInputEffect => 2,
        }
    }

    /// Slot count a node of this kind may register when it declares
    /// `declared`. Sources take no inputs, single-input effects and sinks
    /// exactly one, multi-input effects at least one.
    pub fn allowed_input_slots(&self, declared: usize) -> usize {
        match self {
            NodeKind::Generator | NodeKind::Resource => 0,
            NodeKind::SingleInputEffect | NodeKind::OutputSink => 1,
            NodeKind::MultiInputEffect => declared.max(1),
        }
    }

    /// Whether an empty `slot` blocks recomputation.
    pub fn slot_required(&self, slot: usize) -> bool {
        match self {
            NodeKind::SingleInputEffect | NodeKind::OutputSink => slot == 0,
            _ => false,
        }
    }
}

/// Context passed to node lifecycle hooks.
pub struct NodeContext<'a> {
    /// Id the graph assigned to the node.
    pub id: NodeId,
    /// Queue for events raised from foreign threads.
    pub events: &'a EventSender,
    /// Engine-wide settings.
    pub config: &'a EngineConfig,
}

/// Trait for host-defined node types.
pub trait PixNode: Send {
    /// Human-readable name of this node.
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// Shader the backend runs for this node.
    fn shader(&self) -> &'static str;

    /// Declared input slots. Only multi-input effects may change the
    /// count; the graph clamps every other kind to its role.
    fn input_slots(&self) -> usize {
        self.kind().default_input_slots()
    }

    /// Current parameter values.
    fn params(&self) -> Vec<Param> {
        Vec::new()
    }

    fn set_param(&mut self, key: &str, _value: &ParamValue) -> Result<(), ParamError> {
        Err(ParamError::Unknown(key.to_string()))
    }

    /// Parameters flattened to positional uniforms, in declaration order.
    fn uniforms(&self) -> Vec<f32>;

    /// Fixed output resolution, if the node has one.
    fn resolution(&self) -> Option<Resolution> {
        None
    }

    /// How mismatched inputs are fitted into the working resolution.
    fn fill_mode(&self) -> FillMode {
        FillMode::default()
    }

    fn extend_mode(&self) -> ExtendMode {
        ExtendMode::default()
    }

    /// Latest external frame of a resource node.
    fn source_frame(&self) -> Option<&FrameBuffer> {
        None
    }

    /// Called once the node is inserted into a graph.
    fn on_attach(&mut self, _ctx: &NodeContext) {}

    /// Called when the node is removed from its graph.
    fn on_detach(&mut self) {}
}

/// Enum dispatch for built-in nodes.
pub enum BuiltinNode {
    Noise(NoiseNode),
    Camera(CameraNode),
    Levels(LevelsNode),
    Blends(BlendsNode),
    Output(OutputNode),
}

impl BuiltinNode {
    pub fn name(&self) -> &str {
        match self {
            BuiltinNode::Noise(n) => n.name(),
            BuiltinNode::Camera(n) => n.name(),
            BuiltinNode::Levels(n) => n.name(),
            BuiltinNode::Blends(n) => n.name(),
            BuiltinNode::Output(n) => n.name(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            BuiltinNode::Noise(_) => NodeKind::Generator,
            BuiltinNode::Camera(_) => NodeKind::Resource,
            BuiltinNode::Levels(_) => NodeKind::SingleInputEffect,
            BuiltinNode::Blends(_) => NodeKind::MultiInputEffect,
            BuiltinNode::Output(_) => NodeKind::OutputSink,
        }
    }

    pub fn shader(&self) -> &'static str {
        match self {
            BuiltinNode::Noise(n) => n.shader(),
            BuiltinNode::Camera(n) => n.shader(),
            BuiltinNode::Levels(n) => n.shader(),
            BuiltinNode::Blends(n) => n.shader(),
            BuiltinNode::Output(n) => n.shader(),
        }
    }

    pub fn input_slots(&self) -> usize {
        match self {
            BuiltinNode::Blends(n) => n.input_slots(),
            other => other.kind().default_input_slots(),
        }
    }

    pub fn params(&self) -> Vec<Param> {
        match self {
            BuiltinNode::Noise(n) => n.params(),
            BuiltinNode::Camera(n) => n.params(),
            BuiltinNode::Levels(n) => n.params(),
            BuiltinNode::Blends(n) => n.params(),
            BuiltinNode::Output(_) => Vec::new(),
        }
    }

    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        match self {
            BuiltinNode::Noise(n) => n.set_param(key, value),
            BuiltinNode::Camera(n) => n.set_param(key, value),
            BuiltinNode::Levels(n) => n.set_param(key, value),
            BuiltinNode::Blends(n) => n.set_param(key, value),
            BuiltinNode::Output(_) => Err(ParamError::Unknown(key.to_string())),
        }
    }

    pub fn uniforms(&self) -> Vec<f32> {
        match self {
            BuiltinNode::Noise(n) => n.uniforms(),
            BuiltinNode::Camera(n) => n.uniforms(),
            BuiltinNode::Levels(n) => n.uniforms(),
            BuiltinNode::Blends(n) => n.uniforms(),
            BuiltinNode::Output(n) => n.uniforms(),
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            BuiltinNode::Noise(n) => Some(n.resolution()),
            BuiltinNode::Camera(n) => n.resolution(),
            BuiltinNode::Levels(n) => n.resolution(),
            BuiltinNode::Blends(n) => n.resolution(),
            BuiltinNode::Output(n) => n.resolution(),
        }
    }

    pub fn fill_mode(&self) -> FillMode {
        match self {
            BuiltinNode::Blends(n) => n.fill_mode(),
            _ => FillMode::default(),
        }
    }

    pub fn extend_mode(&self) -> ExtendMode {
        match self {
            BuiltinNode::Blends(n) => n.extend_mode(),
            _ => ExtendMode::default(),
        }
    }

    pub fn source_frame(&self) -> Option<&FrameBuffer> {
        match self {
            BuiltinNode::Camera(n) => n.frame(),
            _ => None,
        }
    }

    pub fn on_attach(&mut self, ctx: &NodeContext) {
        if let BuiltinNode::Camera(n) = self {
            n.on_attach(ctx);
        }
    }

    pub fn on_detach(&mut self) {
        if let BuiltinNode::Camera(n) = self {
            n.on_detach();
        }
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn PixNode>),
}

impl AnyNode {
    pub fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            AnyNode::Builtin(n) => n.kind(),
            AnyNode::Plugin(n) => n.kind(),
        }
    }

    pub fn shader(&self) -> &'static str {
        match self {
            AnyNode::Builtin(n) => n.shader(),
            AnyNode::Plugin(n) => n.shader(),
        }
    }

    pub fn input_slots(&self) -> usize {
        match self {
            AnyNode::Builtin(n) => n.input_slots(),
            AnyNode::Plugin(n) => n.kind().allowed_input_slots(n.input_slots()),
        }
    }

    pub fn params(&self) -> Vec<Param> {
        match self {
            AnyNode::Builtin(n) => n.params(),
            AnyNode::Plugin(n) => n.params(),
        }
    }

    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        match self {
            AnyNode::Builtin(n) => n.set_param(key, value),
            AnyNode::Plugin(n) => n.set_param(key, value),
        }
    }

    pub fn uniforms(&self) -> Vec<f32> {
        match self {
            AnyNode::Builtin(n) => n.uniforms(),
            AnyNode::Plugin(n) => n.uniforms(),
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            AnyNode::Builtin(n) => n.resolution(),
            AnyNode::Plugin(n) => n.resolution(),
        }
    }

    pub fn fill_mode(&self) -> FillMode {
        match self {
            AnyNode::Builtin(n) => n.fill_mode(),
            AnyNode::Plugin(n) => n.fill_mode(),
        }
    }

    pub fn extend_mode(&self) -> ExtendMode {
        match self {
            AnyNode::Builtin(n) => n.extend_mode(),
            AnyNode::Plugin(n) => n.extend_mode(),
        }
    }

    pub fn source_frame(&self) -> Option<&FrameBuffer> {
        match self {
            AnyNode::Builtin(n) => n.source_frame(),
            AnyNode::Plugin(n) => n.source_frame(),
        }
    }

    pub fn on_attach(&mut self, ctx: &NodeContext) {
        match self {
            AnyNode::Builtin(n) => n.on_attach(ctx),
            AnyNode::Plugin(n) => n.on_attach(ctx),
        }
    }

    pub fn on_detach(&mut self) {
        match self {
            AnyNode::Builtin(n) => n.on_detach(),
            AnyNode::Plugin(n) => n.on_detach(),
        }
    }

    pub fn as_camera(&self) -> Option<&CameraNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::Camera(n)) => Some(n),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut CameraNode> {
        match self {
            AnyNode::Builtin(BuiltinNode::Camera(n)) => Some(n),
            _ => None,
        }
    }
}

impl From<BuiltinNode> for AnyNode {
    fn from(node: BuiltinNode) -> Self {
        AnyNode::Builtin(node)
    }
}

impl From<Box<dyn PixNode>> for AnyNode {
    fn from(node: Box<dyn PixNode>) -> Self {
        AnyNode::Plugin(node)
    }
}

macro_rules! builtin_from {
    ($($variant:ident($ty:ty)),+ $(,)?) => {
        $(
            impl From<$ty> for BuiltinNode {
                fn from(node: $ty) -> Self {
                    BuiltinNode::$variant(node)
                }
            }

            impl From<$ty> for AnyNode {
                fn from(node: $ty) -> Self {
                    AnyNode::Builtin(BuiltinNode::$variant(node))
                }
            }
        )+
    };
}

builtin_from!(
    Noise(NoiseNode),
    Camera(CameraNode),
    Levels(LevelsNode),
    Blends(BlendsNode),
    Output(OutputNode),
);
