//! Per-node camera state machine.
//!
//! ```text
//! Uninitialized ──setup──► AwaitingPermission ──granted──► Configuring ──first frame──► Streaming
//!        │                        │ denied                      │ error                     │
//!        └──(already granted)─────┴──────────► Stopped ◄────────┴──────── stop ────────────┘
//! ```
//!
//! The adapter runs on the graph context. Everything the platform reports
//! (frames, permission answers, rotations) reaches it through the event
//! queue; each capture session is tagged with a generation so frames still
//! in flight from a replaced session are discarded.

use crate::capture::{
    CameraSelector, CaptureDevice, CaptureError, CaptureSession, FrameBuffer, Orientation,
    OrientationWatch, WatchOutcome,
};
use crate::config::EngineConfig;
use crate::graph::bridge::EventSender;
use crate::graph::id::NodeId;
use crate::types::Resolution;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of a camera node's capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Uninitialized,
    AwaitingPermission,
    Configuring,
    Streaming,
    Stopped,
}

/// Camera access as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Unknown,
    Granted,
    Denied,
}

/// Output geometry established from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    /// Dimensions of the sensor frame
    pub source: Resolution,
    /// Output resolution (transposed for portrait)
    pub resolution: Resolution,
    /// Device orientation the baseline was taken in
    pub orientation: Orientation,
}

/// A frame the adapter accepted for display.
#[derive(Debug, Clone)]
pub struct AcceptedFrame {
    pub frame: FrameBuffer,
    pub baseline: Baseline,
    /// Whether this frame re-established the baseline
    pub rebaselined: bool,
}

pub struct CameraAdapter {
    node: NodeId,
    device: Arc<dyn CaptureDevice>,
    events: EventSender,
    camera: CameraSelector,
    state: CameraState,
    permission: PermissionStatus,
    session: Option<Box<dyn CaptureSession>>,
    session_generation: u64,
    baseline: Option<Baseline>,
    orientation_updated: bool,
    watch: Option<OrientationWatch>,
    poll_interval: Duration,
    poll_budget: u32,
    watch_timeout: Duration,
}

impl CameraAdapter {
    pub fn new(
        node: NodeId,
        device: Arc<dyn CaptureDevice>,
        events: EventSender,
        camera: CameraSelector,
        config: &EngineConfig,
    ) -> Self {
        Self {
            node,
            device,
            events,
            camera,
            state: CameraState::Uninitialized,
            permission: PermissionStatus::Unknown,
            session: None,
            session_generation: 0,
            baseline: None,
            orientation_updated: false,
            watch: None,
            poll_interval: config.orientation_poll_interval(),
            poll_budget: config.orientation_poll_budget(),
            watch_timeout: config.orientation_watch_timeout(),
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    pub fn camera(&self) -> CameraSelector {
        self.camera
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// Generation of the current (or last) capture session.
    pub fn session_generation(&self) -> u64 {
        self.session_generation
    }

    pub fn is_watching_orientation(&self) -> bool {
        self.watch.is_some()
    }

    /// Start capturing, asking for permission first when needed.
    pub fn setup(&mut self) {
        match self.permission {
            PermissionStatus::Granted => self.start_session(),
            PermissionStatus::Unknown | PermissionStatus::Denied => self.request_permission(),
        }
    }

    /// Switch cameras. Always re-runs setup, which replaces any running session.
    pub fn set_camera(&mut self, camera: CameraSelector) {
        debug!("{} camera set to {}", self.node, camera);
        self.camera = camera;
        self.setup();
    }

    fn request_permission(&mut self) {
        self.state = CameraState::AwaitingPermission;
        let events = self.events.clone();
        let node = self.node;
        self.device.request_permission(Box::new(move |granted| {
            events.permission_resolved(node, granted);
        }));
    }

    /// Apply a permission answer taken from the event queue.
    pub fn on_permission(&mut self, granted: bool) {
        if self.state != CameraState::AwaitingPermission {
            debug!("{} ignoring permission answer in state {:?}", self.node, self.state);
            return;
        }
        if granted {
            self.permission = PermissionStatus::Granted;
            self.start_session();
        } else {
            self.permission = PermissionStatus::Denied;
            warn!("{}: {}", self.node, CaptureError::PermissionDenied);
            self.stop_session();
            self.state = CameraState::Stopped;
        }
    }

    fn start_session(&mut self) {
        self.stop_session();
        let generation = self.session_generation;
        let sink = self.events.frame_sink(self.node, generation);

        match self.device.start_session(self.camera, sink) {
            Ok(session) => {
                self.session = Some(session);
                self.state = CameraState::Configuring;
                info!(
                    "{} capture session {} started ({} camera)",
                    self.node, generation, self.camera
                );
            }
            Err(e) => {
                error!("{} failed to start capture: {}", self.node, e);
                self.state = CameraState::Stopped;
            }
        }
    }

    /// Stop the running session, if any, and invalidate its in-flight frames.
    fn stop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            debug!("{} capture session {} stopped", self.node, self.session_generation);
        }
        self.session_generation += 1;
        self.baseline = None;
        self.orientation_updated = false;
        self.watch = None;
    }

    /// Stop capturing. Returns once no further frame callbacks will run.
    pub fn stop(&mut self) {
        self.stop_session();
        self.state = CameraState::Stopped;
    }

    /// Handle a frame taken from the event queue.
    ///
    /// Returns `None` for frames of a stale session, frames arriving outside
    /// `Configuring`/`Streaming`, and frames whose buffer cannot be used.
    pub fn on_frame(
        &mut self,
        generation: u64,
        frame: FrameBuffer,
        orientation: Orientation,
    ) -> Option<AcceptedFrame> {
        if generation != self.session_generation || self.session.is_none() {
            trace!("{} dropping frame from stale session {}", self.node, generation);
            return None;
        }
        if !matches!(self.state, CameraState::Configuring | CameraState::Streaming) {
            return None;
        }
        if !frame.is_consistent() {
            error!(
                "{}: {}",
                self.node,
                CaptureError::BufferConversion(format!(
                    "{} channels for a {}x{} frame",
                    frame.data.len(),
                    frame.width,
                    frame.height
                ))
            );
            return None;
        }

        let needs_baseline = match self.baseline {
            None => true,
            Some(b) => {
                self.orientation_updated
                    || b.orientation != orientation
                    || b.source != frame.resolution()
            }
        };

        let baseline = if needs_baseline {
            let b = self.establish_baseline(&frame, orientation);
            self.baseline = Some(b);
            self.orientation_updated = false;
            self.watch = None;
            self.state = CameraState::Streaming;
            b
        } else {
            // needs_baseline is false only when a baseline exists
            self.baseline?
        };

        Some(AcceptedFrame {
            frame,
            baseline,
            rebaselined: needs_baseline,
        })
    }

    fn establish_baseline(&self, frame: &FrameBuffer, orientation: Orientation) -> Baseline {
        let source = frame.resolution();
        let resolution = match orientation {
            Orientation::Portrait | Orientation::PortraitUpsideDown => source.transposed(),
            Orientation::LandscapeLeft | Orientation::LandscapeRight => source,
            Orientation::Unknown => {
                warn!("{} camera orientation unknown", self.node);
                source
            }
        };
        info!(
            "{} camera baseline {} ({:?}, sensor {})",
            self.node, resolution, orientation, source
        );
        Baseline {
            source,
            resolution,
            orientation,
        }
    }

    /// The platform announced a rotation.
    pub fn on_rotation(&mut self, now: Instant) {
        if self.state != CameraState::Streaming {
            return;
        }
        let Some(baseline) = self.baseline else {
            return;
        };
        let current = self.device.interface_orientation();
        if current != baseline.orientation {
            debug!("{} orientation changed to {:?}", self.node, current);
            self.orientation_updated = true;
            self.watch = None;
        } else {
            self.watch = Some(OrientationWatch::new(
                now,
                baseline.orientation,
                self.poll_interval,
                self.poll_budget,
                self.watch_timeout,
            ));
        }
    }

    /// Advance a pending orientation watch.
    pub fn poll_orientation(&mut self, now: Instant) {
        let Some(watch) = self.watch.as_mut() else {
            return;
        };
        match watch.poll(now, self.device.interface_orientation()) {
            WatchOutcome::Pending => {}
            WatchOutcome::Changed(orientation) => {
                debug!("{} orientation settled at {:?}", self.node, orientation);
                self.orientation_updated = true;
                self.watch = None;
            }
            WatchOutcome::Expired => {
                trace!("{} orientation watch expired without change", self.node);
                self.watch = None;
            }
        }
    }

    /// Whether the next frame will re-establish the baseline.
    pub fn orientation_updated(&self) -> bool {
        self.orientation_updated
    }
}

impl Drop for CameraAdapter {
    fn drop(&mut self) {
        if self.session.is_some() {
            self.stop();
        }
    }
}
