//! Simulated capture device.
//!
//! Used by tests and the headless host. Frames can be pushed manually with
//! [`MockCaptureDevice::deliver`] or produced by a background thread per
//! session ([`MockCaptureDevice::with_streaming`]), which exercises the same
//! cross-thread hand-off a platform camera does.

use crate::capture::{
    CameraSelector, CaptureDevice, CaptureError, CaptureSession, FrameBuffer, FrameCallback,
    Orientation, PermissionCallback,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// How the mock answers permission requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPermission {
    /// Answer `true` immediately
    Grant,
    /// Answer `false` immediately
    Deny,
    /// Hold the request until [`MockCaptureDevice::resolve_permission`]
    Manual,
}

/// Frame source for a streaming session.
#[derive(Debug, Clone)]
struct StreamConfig {
    frame: FrameBuffer,
    interval: Duration,
}

/// State shared between a session handle and its delivery thread.
struct SessionShared {
    camera: CameraSelector,
    sink: Mutex<Option<FrameCallback>>,
}

impl SessionShared {
    /// Deliver one frame. Returns false once the session is stopped.
    fn deliver(&self, frame: FrameBuffer, orientation: Orientation) -> bool {
        let guard = lock(&self.sink);
        match guard.as_ref() {
            Some(sink) => {
                sink(frame, orientation);
                true
            }
            None => false,
        }
    }
}

#[derive(Default)]
struct DeviceState {
    orientation: Mutex<Orientation>,
    pending_permission: Mutex<Vec<PermissionCallback>>,
    fail_next: Mutex<Option<String>>,
    sessions: Mutex<Vec<Arc<SessionShared>>>,
    permission_requests: AtomicUsize,
    sessions_started: AtomicUsize,
}

/// In-process stand-in for a platform camera.
pub struct MockCaptureDevice {
    permission: MockPermission,
    stream: Option<StreamConfig>,
    state: Arc<DeviceState>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockCaptureDevice {
    /// A device that grants permission and delivers frames only on demand.
    pub fn new() -> Self {
        Self::with_permission(MockPermission::Grant)
    }

    pub fn with_permission(permission: MockPermission) -> Self {
        Self {
            permission,
            stream: None,
            state: Arc::new(DeviceState::default()),
        }
    }

    /// Every session spawns a thread delivering `frame` every `interval`.
    pub fn with_streaming(mut self, frame: FrameBuffer, interval: Duration) -> Self {
        self.stream = Some(StreamConfig { frame, interval });
        self
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        *lock(&self.state.orientation) = orientation;
    }

    /// Make the next `start_session` fail with a configuration error.
    pub fn fail_next_session(&self, reason: &str) {
        *lock(&self.state.fail_next) = Some(reason.to_string());
    }

    /// Answer held permission requests (`MockPermission::Manual`).
    pub fn resolve_permission(&self, granted: bool) -> usize {
        let callbacks: Vec<PermissionCallback> =
            lock(&self.state.pending_permission).drain(..).collect();
        let count = callbacks.len();
        for callback in callbacks {
            callback(granted);
        }
        count
    }

    /// Push a frame into the most recently started running session.
    ///
    /// Returns false if no session is running.
    pub fn deliver(&self, frame: FrameBuffer, orientation: Orientation) -> bool {
        let session = lock(&self.state.sessions).last().cloned();
        match session {
            Some(session) => session.deliver(frame, orientation),
            None => false,
        }
    }

    pub fn permission_requests(&self) -> usize {
        self.state.permission_requests.load(Ordering::Relaxed)
    }

    pub fn sessions_started(&self) -> usize {
        self.state.sessions_started.load(Ordering::Relaxed)
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.state.sessions).len()
    }

    /// Camera of the most recently started running session.
    pub fn active_camera(&self) -> Option<CameraSelector> {
        lock(&self.state.sessions).last().map(|s| s.camera)
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn request_permission(&self, callback: PermissionCallback) {
        self.state.permission_requests.fetch_add(1, Ordering::Relaxed);
        match self.permission {
            MockPermission::Grant => callback(true),
            MockPermission::Deny => callback(false),
            MockPermission::Manual => lock(&self.state.pending_permission).push(callback),
        }
    }

    fn start_session(
        &self,
        camera: CameraSelector,
        on_frame: FrameCallback,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        if let Some(reason) = lock(&self.state.fail_next).take() {
            return Err(CaptureError::Configuration(reason));
        }

        let shared = Arc::new(SessionShared {
            camera,
            sink: Mutex::new(Some(on_frame)),
        });
        lock(&self.state.sessions).push(shared.clone());
        self.state.sessions_started.fetch_add(1, Ordering::Relaxed);

        let running = Arc::new(AtomicBool::new(true));
        let worker = self.stream.clone().map(|stream| {
            let shared = shared.clone();
            let device = self.state.clone();
            let running = running.clone();
            std::thread::spawn(move || {
                while running.load(Ordering::Acquire) {
                    let orientation = *lock(&device.orientation);
                    if !shared.deliver(stream.frame.clone(), orientation) {
                        break;
                    }
                    std::thread::sleep(stream.interval);
                }
            })
        });

        Ok(Box::new(MockSession {
            shared,
            device: self.state.clone(),
            running,
            worker,
        }))
    }

    fn interface_orientation(&self) -> Orientation {
        *lock(&self.state.orientation)
    }
}

struct MockSession {
    shared: Arc<SessionShared>,
    device: Arc<DeviceState>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession for MockSession {
    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        // Taking the sink waits for an in-progress delivery to finish
        lock(&self.shared.sink).take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        lock(&self.device.sessions).retain(|s| !Arc::ptr_eq(s, &self.shared));
    }

    fn is_running(&self) -> bool {
        lock(&self.shared.sink).is_some()
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
