//! Mock construction helpers

use pixgraph::{
    capture::{CaptureDevice, MockCaptureDevice, MockPermission},
    gpu::SoftwareBackend,
    graph::{nodes::CameraNode, NodeId, RenderGraph},
};
use std::sync::Arc;

/// A mock device plus the same device as a trait object
pub fn create_test_device(permission: MockPermission) -> (Arc<MockCaptureDevice>, Arc<dyn CaptureDevice>) {
    let device = Arc::new(MockCaptureDevice::with_permission(permission));
    let dynamic: Arc<dyn CaptureDevice> = device.clone();
    (device, dynamic)
}

/// Add a camera node and run the tick that applies the permission answer
pub fn add_streaming_camera(
    graph: &mut RenderGraph<SoftwareBackend>,
    device: &Arc<dyn CaptureDevice>,
) -> NodeId {
    let camera = graph.add_node(CameraNode::new(device.clone()));
    graph.process_events();
    camera
}
