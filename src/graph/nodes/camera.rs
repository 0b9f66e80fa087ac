//! CameraNode: live camera resource.
//!
//! Owns a [`CameraAdapter`] once attached to a graph. Frames accepted by
//! the adapter are kept here and uploaded to the backend when the node
//! recomputes.
//!
//! Uniform layout (2 values): `[orientation raw value, mirrored]`, where
//! mirrored is 1 for the front camera.

use crate::capture::{
    AcceptedFrame, CameraAdapter, CameraSelector, CameraState, CaptureDevice, FrameBuffer,
    Orientation,
};
use crate::gpu::shaders;
use crate::graph::node::NodeContext;
use crate::graph::param::{expect_mode, Param, ParamError, ParamValue};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraParams {
    pub camera: CameraSelector,
}

/// Camera resource node.
pub struct CameraNode {
    params: CameraParams,
    device: Arc<dyn CaptureDevice>,
    adapter: Option<CameraAdapter>,
    frame: Option<FrameBuffer>,
}

impl CameraNode {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self::with_params(CameraParams::default(), device)
    }

    pub fn with_params(params: CameraParams, device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            params,
            device,
            adapter: None,
            frame: None,
        }
    }

    pub fn name(&self) -> &str {
        "Camera"
    }

    pub fn shader(&self) -> &'static str {
        shaders::CAMERA
    }

    pub fn camera(&self) -> CameraSelector {
        self.params.camera
    }

    pub fn camera_params(&self) -> &CameraParams {
        &self.params
    }

    /// Capture state; `Uninitialized` until attached to a graph.
    pub fn state(&self) -> CameraState {
        self.adapter
            .as_ref()
            .map(|a| a.state())
            .unwrap_or(CameraState::Uninitialized)
    }

    pub fn adapter(&self) -> Option<&CameraAdapter> {
        self.adapter.as_ref()
    }

    /// Output resolution from the current baseline.
    pub fn resolution(&self) -> Option<Resolution> {
        self.adapter
            .as_ref()
            .and_then(|a| a.baseline())
            .map(|b| b.resolution)
    }

    /// Most recent accepted frame.
    pub fn frame(&self) -> Option<&FrameBuffer> {
        self.frame.as_ref()
    }

    pub fn params(&self) -> Vec<Param> {
        vec![Param::new("camera", self.params.camera.key())]
    }

    /// Setting `camera` restarts capture, even for the same camera.
    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        match key {
            "camera" => {
                let camera: CameraSelector = expect_mode(key, value)?;
                self.params.camera = camera;
                self.frame = None;
                if let Some(adapter) = self.adapter.as_mut() {
                    adapter.set_camera(camera);
                }
                Ok(())
            }
            _ => Err(ParamError::Unknown(key.to_string())),
        }
    }

    pub fn uniforms(&self) -> Vec<f32> {
        let orientation = self
            .adapter
            .as_ref()
            .and_then(|a| a.baseline())
            .map(|b| b.orientation)
            .unwrap_or(Orientation::Unknown);
        vec![
            orientation.raw_value() as f32,
            if self.params.camera.mirrored() { 1.0 } else { 0.0 },
        ]
    }

    pub fn on_attach(&mut self, ctx: &NodeContext) {
        let mut adapter = CameraAdapter::new(
            ctx.id,
            self.device.clone(),
            ctx.events.clone(),
            self.params.camera,
            ctx.config,
        );
        adapter.setup();
        self.adapter = Some(adapter);
    }

    /// Stops capture; returns once no frame callback is running.
    pub fn on_detach(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.stop();
        }
        self.frame = None;
    }

    pub fn on_permission(&mut self, granted: bool) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.on_permission(granted);
        }
    }

    /// Offer a frame from the event queue. Returns true when accepted.
    pub fn accept_frame(
        &mut self,
        session: u64,
        frame: FrameBuffer,
        orientation: Orientation,
    ) -> bool {
        let Some(adapter) = self.adapter.as_mut() else {
            return false;
        };
        match adapter.on_frame(session, frame, orientation) {
            Some(AcceptedFrame { frame, .. }) => {
                self.frame = Some(frame);
                true
            }
            None => false,
        }
    }

    pub fn on_rotation(&mut self, now: Instant) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.on_rotation(now);
        }
    }

    pub fn poll_orientation(&mut self, now: Instant) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.poll_orientation(now);
        }
    }
}
