//! Thread boundary between capture contexts and the graph loop.
//!
//! Frame deliveries, permission answers and rotation notifications arrive on
//! foreign threads. They are enqueued here as [`GraphEvent`]s and applied by
//! `RenderGraph::process_events` on the graph's own context, in arrival
//! order.

use crate::capture::{FrameBuffer, FrameCallback, Orientation};
use crate::graph::id::NodeId;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Events sent from capture contexts to the graph loop.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// A camera frame from capture session `session` of `node`.
    FrameDelivered {
        node: NodeId,
        session: u64,
        frame: FrameBuffer,
        orientation: Orientation,
    },

    /// The answer to a camera permission request.
    PermissionResolved { node: NodeId, granted: bool },

    /// The platform announced a device rotation.
    OrientationChanged,
}

/// Cloneable producer side of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<GraphEvent>,
    /// Frames are dropped once this many events are queued, leaving the
    /// rest of the queue for control events.
    frame_limit: usize,
}

impl EventSender {
    /// Create a bounded queue: `(sender, receiver)`.
    ///
    /// The graph owns the receiver; capture adapters get clones of the sender.
    pub fn channel(capacity: usize) -> (Self, Receiver<GraphEvent>) {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        let frame_limit = capacity - capacity / 4;
        (Self { tx, frame_limit }, rx)
    }

    /// Enqueue a control event, blocking while the queue is full.
    pub fn send(&self, event: GraphEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Enqueue a frame without blocking the capture thread.
    ///
    /// Late frames are discarded when the graph falls behind.
    pub fn send_frame(
        &self,
        node: NodeId,
        session: u64,
        frame: FrameBuffer,
        orientation: Orientation,
    ) -> bool {
        if self.tx.len() >= self.frame_limit {
            tracing::trace!("Event queue busy, dropping frame for {}", node);
            return false;
        }
        match self.tx.try_send(GraphEvent::FrameDelivered {
            node,
            session,
            frame,
            orientation,
        }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Event queue full, dropping frame for {}", node);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn permission_resolved(&self, node: NodeId, granted: bool) -> bool {
        self.send(GraphEvent::PermissionResolved { node, granted })
    }

    pub fn orientation_changed(&self) -> bool {
        self.send(GraphEvent::OrientationChanged)
    }

    /// Frame callback for one capture session of `node`.
    pub fn frame_sink(&self, node: NodeId, session: u64) -> FrameCallback {
        let sender = self.clone();
        Box::new(move |frame, orientation| {
            sender.send_frame(node, session, frame, orientation);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_keep_arrival_order() {
        let (tx, rx) = EventSender::channel(8);
        tx.permission_resolved(NodeId(1), true);
        tx.orientation_changed();
        let sink = tx.frame_sink(NodeId(1), 3);
        sink(FrameBuffer::solid(1, 1, [0.0; 4]), Orientation::Portrait);

        let events: Vec<GraphEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            GraphEvent::PermissionResolved {
                node: NodeId(1),
                granted: true
            }
        ));
        assert!(matches!(events[1], GraphEvent::OrientationChanged));
        assert!(matches!(
            events[2],
            GraphEvent::FrameDelivered { session: 3, .. }
        ));
    }

    #[test]
    fn test_frames_leave_room_for_control_events() {
        let (tx, rx) = EventSender::channel(4);
        let frame = FrameBuffer::solid(1, 1, [1.0; 4]);
        for _ in 0..4 {
            tx.send_frame(NodeId(0), 1, frame.clone(), Orientation::Unknown);
        }
        assert_eq!(rx.len(), 3);
        assert!(tx.permission_resolved(NodeId(0), true));
        assert_eq!(rx.len(), 4);
    }

    #[test]
    fn test_full_queue_drops_frames() {
        let (tx, rx) = EventSender::channel(1);
        let frame = FrameBuffer::solid(1, 1, [1.0; 4]);
        assert!(tx.send_frame(NodeId(0), 1, frame.clone(), Orientation::Unknown));
        assert!(!tx.send_frame(NodeId(0), 1, frame, Orientation::Unknown));
        assert_eq!(rx.len(), 1);
    }
}
