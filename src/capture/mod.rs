//! Camera capture plumbing.
//!
//! Platform capture is an external collaborator reached through two narrow
//! traits: [`CaptureDevice`] (permission, session start, interface
//! orientation) and [`CaptureSession`] (blocking stop). Frames and
//! permission answers arrive on foreign threads; they are never applied to
//! node state directly but forwarded as [`GraphEvent`](crate::graph::GraphEvent)s
//! to the graph loop.
//!
//! # Architecture
//!
//! ```text
//! [capture thread] --onFrame--> EventSender --queue--> RenderGraph::process_events
//!                                                          └─► CameraAdapter::on_frame
//! ```
//!
//! [`CameraAdapter`] is the per-node state machine; [`MockCaptureDevice`]
//! simulates a platform device for tests and the headless host.

pub mod adapter;
pub mod mock;
pub mod orientation;

pub use adapter::{AcceptedFrame, Baseline, CameraAdapter, CameraState, PermissionStatus};
pub use mock::{MockCaptureDevice, MockPermission};
pub use orientation::{OrientationWatch, WatchOutcome};

use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from capture devices and adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Camera access not granted")]
    PermissionDenied,

    /// Device, input or output unavailable.
    #[error("Camera configuration failed: {0}")]
    Configuration(String),

    #[error("Camera buffer conversion failed: {0}")]
    BufferConversion(String),
}

/// Which physical camera to capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraSelector {
    Front,
    #[default]
    Back,
}

impl CameraSelector {
    /// The front camera image is mirrored horizontally.
    pub fn mirrored(&self) -> bool {
        matches!(self, CameraSelector::Front)
    }

    pub fn key(&self) -> &'static str {
        match self {
            CameraSelector::Front => "front",
            CameraSelector::Back => "back",
        }
    }
}

impl std::str::FromStr for CameraSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(CameraSelector::Front),
            "back" => Ok(CameraSelector::Back),
            other => Err(format!("'{}' is not a camera (expected front or back)", other)),
        }
    }
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Interface orientation of the host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl Orientation {
    /// Platform raw value, passed to the camera shader as a uniform.
    pub fn raw_value(&self) -> u32 {
        match self {
            Orientation::Unknown => 0,
            Orientation::Portrait => 1,
            Orientation::PortraitUpsideDown => 2,
            Orientation::LandscapeRight => 3,
            Orientation::LandscapeLeft => 4,
        }
    }

    /// Portrait orientations transpose the sensor image.
    pub fn is_portrait(&self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::PortraitUpsideDown)
    }

    pub fn is_landscape(&self) -> bool {
        matches!(self, Orientation::LandscapeLeft | Orientation::LandscapeRight)
    }
}

/// A captured frame as normalized RGBA channels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// A frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [f32; 4]) -> Self {
        let count = width as usize * height as usize;
        let data = rgba.iter().copied().cycle().take(count * 4).collect();
        Self::new(width, height, data)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Whether the channel buffer matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.resolution().channel_count()
    }
}

/// Called on the capture context for every delivered frame.
pub type FrameCallback = Box<dyn Fn(FrameBuffer, Orientation) + Send + Sync>;

/// Called once with the user's answer to a permission request.
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send>;

/// A platform camera.
pub trait CaptureDevice: Send + Sync {
    /// Ask for camera access. The answer may arrive on any thread.
    fn request_permission(&self, callback: PermissionCallback);

    /// Start capturing from `camera`; frames go to `on_frame` until the
    /// returned session is stopped.
    fn start_session(
        &self,
        camera: CameraSelector,
        on_frame: FrameCallback,
    ) -> Result<Box<dyn CaptureSession>, CaptureError>;

    /// Current interface orientation as reported by the platform.
    fn interface_orientation(&self) -> Orientation;
}

/// A running capture session.
pub trait CaptureSession: Send {
    /// Stop capturing. Blocks until no further frame callbacks will run.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
