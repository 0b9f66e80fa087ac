//! Persisted form of built-in nodes.
//!
//! Each node type persists a fixed key set, tagged with `kind`:
//!
//! ```text
//! {"kind":"noise","seed":0,"octaves":7,"position":{"x":0.0,"y":0.0},
//!  "zPosition":0.0,"zoom":1.0,"colored":false,"random":false}
//! {"kind":"camera","camera":"back"}
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected. A decoded
//! node is always dirty.

use crate::capture::CaptureDevice;
use crate::config::EngineConfig;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::node::{AnyNode, BuiltinNode};
use crate::graph::nodes::{
    BlendsNode, BlendsParams, CameraNode, CameraParams, LevelsNode, LevelsParams, NoiseNode,
    NoiseParams, OutputNode, OutputParams,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Serializable parameters of one built-in node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeState {
    Noise(NoiseParams),
    Camera(CameraParams),
    Levels(LevelsParams),
    Blends(BlendsParams),
    Output(OutputParams),
}

impl NodeState {
    /// Snapshot a node's parameters. Plugin nodes have no persisted form.
    pub fn capture(node: &AnyNode) -> Option<Self> {
        let AnyNode::Builtin(node) = node else {
            return None;
        };
        Some(match node {
            BuiltinNode::Noise(n) => NodeState::Noise(n.noise_params().clone()),
            BuiltinNode::Camera(n) => NodeState::Camera(n.camera_params().clone()),
            BuiltinNode::Levels(n) => NodeState::Levels(n.levels_params().clone()),
            BuiltinNode::Blends(n) => NodeState::Blends(n.blends_params().clone()),
            BuiltinNode::Output(_) => NodeState::Output(OutputParams::default()),
        })
    }

    /// Build a fresh node from persisted parameters.
    ///
    /// Noise nodes get the configured default resolution. Camera nodes
    /// need a capture device.
    pub fn build(
        self,
        config: &EngineConfig,
        capture: Option<Arc<dyn CaptureDevice>>,
    ) -> GraphResult<BuiltinNode> {
        let invalid = |e: crate::graph::param::ParamError| GraphError::Decode(e.to_string());
        Ok(match self {
            NodeState::Noise(params) => {
                params.validate().map_err(invalid)?;
                BuiltinNode::Noise(NoiseNode::with_params(params, config.default_resolution))
            }
            NodeState::Camera(params) => {
                let device = capture.ok_or_else(|| {
                    GraphError::Decode("camera node requires a capture device".to_string())
                })?;
                BuiltinNode::Camera(CameraNode::with_params(params, device))
            }
            NodeState::Levels(params) => {
                params.validate().map_err(invalid)?;
                BuiltinNode::Levels(LevelsNode::with_params(params))
            }
            NodeState::Blends(params) => {
                params.validate().map_err(invalid)?;
                BuiltinNode::Blends(BlendsNode::with_params(params))
            }
            NodeState::Output(_) => BuiltinNode::Output(OutputNode::new()),
        })
    }

    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string(self).map_err(|e| GraphError::Decode(e.to_string()))
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::Decode(e.to_string()))
    }
}
