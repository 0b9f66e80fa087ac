//! Render graph: node storage, topology operations and the tick loop.
//!
//! The graph runs on a single logical thread driven by the host's frame
//! clock. Each tick:
//! 1. Drain capture events (frames, permission answers, rotations).
//! 2. Advance pending orientation watches.
//! 3. Plan the dirty subgraph in dependency order.
//! 4. Recompute each planned node whose inputs are ready.
//!
//! Topology and parameter errors are returned to the caller of the
//! mutating operation. Render and capture errors never abort a tick: they
//! are logged and the affected nodes stay dirty for the next tick.

use crate::capture::{CameraState, CaptureDevice};
use crate::config::EngineConfig;
use crate::gpu::{Artifact, GpuBackend, RenderRequest};
use crate::graph::bridge::{EventSender, GraphEvent};
use crate::graph::connections::ConnectionGraph;
use crate::graph::dirty::DirtyPropagator;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::extract::PixelPack;
use crate::graph::id::NodeId;
use crate::graph::node::{AnyNode, NodeContext, NodeKind};
use crate::graph::nodes::CameraNode;
use crate::graph::param::{Param, ParamError, ParamValue};
use crate::graph::persist::NodeState;
use crate::graph::plan::{NodeOutcome, RecomputePlan, TickReport};
use crate::graph::scheduler::RecomputeScheduler;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace};

/// A slot holding a node and its cached output.
pub struct NodeSlot {
    pub node: AnyNode,
    /// Cached artifact is stale
    pub dirty: bool,
    pub artifact: Option<Artifact>,
    /// Incremented each time the artifact is replaced
    pub version: u64,
    /// Whether this node has been removed (slot is empty).
    pub deleted: bool,
}

impl NodeSlot {
    pub fn new(node: AnyNode) -> Self {
        Self {
            node,
            dirty: true,
            artifact: None,
            version: 0,
            deleted: false,
        }
    }
}

/// The node graph and its recompute loop.
pub struct RenderGraph<B: GpuBackend> {
    nodes: Vec<NodeSlot>,
    connections: ConnectionGraph,
    backend: B,
    config: EngineConfig,
    capture: Option<Arc<dyn CaptureDevice>>,
    events: EventSender,
    event_rx: Receiver<GraphEvent>,
    tick: u64,
}

impl<B: GpuBackend> RenderGraph<B> {
    pub fn new(config: EngineConfig, backend: B) -> Self {
        let (events, event_rx) = EventSender::channel(config.event_queue_capacity);
        Self {
            nodes: Vec::new(),
            connections: ConnectionGraph::new(),
            backend,
            config,
            capture: None,
            events,
            event_rx,
            tick: 0,
        }
    }

    /// Capture device used for camera nodes decoded with [`Self::insert_decoded`].
    pub fn with_capture_device(mut self, device: Arc<dyn CaptureDevice>) -> Self {
        self.capture = Some(device);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Handle for posting events (e.g. rotation notifications) from any thread.
    pub fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    // ── Graph building ──

    /// Add a node. It starts dirty; camera nodes start their adapter.
    pub fn add_node(&mut self, node: impl Into<AnyNode>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = node.into();
        self.connections
            .register(id, node.input_slots(), node.kind().can_produce());
        node.on_attach(&NodeContext {
            id,
            events: &self.events,
            config: &self.config,
        });
        debug!("Added {} ({})", id, node.name());
        self.nodes.push(NodeSlot::new(node));
        id
    }

    /// Remove a node.
    ///
    /// A camera's capture session is stopped before anything else is torn
    /// down. Former consumers lose the slot and become dirty.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        self.live_slot(id)?;
        let slot = &mut self.nodes[id.index()];
        slot.node.on_detach();

        let orphaned = self.connections.unregister(id);
        for consumer in orphaned {
            self.mark_dirty(consumer);
        }

        let slot = &mut self.nodes[id.index()];
        if let Some(artifact) = slot.artifact.take() {
            self.backend.release(&artifact);
        }
        slot.dirty = false;
        slot.deleted = true;
        debug!("Removed {} ({})", id, slot.node.name());
        Ok(())
    }

    /// Connect `producer` into `slot` of `consumer`, replacing any previous
    /// edge at that slot. The consumer becomes dirty.
    pub fn connect(&mut self, producer: NodeId, consumer: NodeId, slot: usize) -> GraphResult<()> {
        self.live_slot(producer)?;
        self.live_slot(consumer)?;
        self.connections.connect(producer, consumer, slot)?;
        self.mark_dirty(consumer);
        trace!("Connected {} -> {}[{}]", producer, consumer, slot);
        Ok(())
    }

    /// Clear `slot` of `consumer`. No-op if the slot is empty.
    pub fn disconnect(&mut self, consumer: NodeId, slot: usize) -> GraphResult<()> {
        self.live_slot(consumer)?;
        if self.connections.disconnect(consumer, slot)?.is_some() {
            self.mark_dirty(consumer);
        }
        Ok(())
    }

    /// Validate and assign a parameter, then mark the node dirty.
    pub fn set_param(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<ParamValue>,
    ) -> GraphResult<()> {
        let value = value.into();
        self.live_slot(id)?;
        self.nodes[id.index()]
            .node
            .set_param(key, &value)
            .map_err(|e| match e {
                ParamError::Unknown(key) => GraphError::UnknownParameter { node: id, key },
                ParamError::Invalid { key, reason } => GraphError::InvalidParameter {
                    node: id,
                    key,
                    reason,
                },
            })?;
        self.mark_dirty(id);
        trace!("{} {} = {}", id, key, value);
        Ok(())
    }

    /// Mark `id` and everything downstream dirty.
    ///
    /// Returns the number of nodes that were clean before.
    pub fn mark_dirty(&mut self, id: NodeId) -> usize {
        if self.live_slot(id).is_err() {
            return 0;
        }
        let nodes = &mut self.nodes;
        DirtyPropagator::mark(&self.connections, id, |n| match nodes.get_mut(n.index()) {
            Some(slot) if !slot.deleted && !slot.dirty => {
                slot.dirty = true;
                true
            }
            _ => false,
        })
    }

    // ── Queries ──

    fn live_slot(&self, id: NodeId) -> GraphResult<&NodeSlot> {
        match self.nodes.get(id.index()) {
            Some(slot) if !slot.deleted => Ok(slot),
            _ => Err(GraphError::UnknownNode(id)),
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.live_slot(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Option<&AnyNode> {
        self.live_slot(id).ok().map(|s| &s.node)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|s| !s.deleted).count()
    }

    /// Live node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.deleted)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn is_dirty(&self, id: NodeId) -> Option<bool> {
        self.live_slot(id).ok().map(|s| s.dirty)
    }

    /// Currently dirty nodes in id order.
    pub fn dirty_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.deleted && s.dirty)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn artifact(&self, id: NodeId) -> Option<Artifact> {
        self.live_slot(id).ok().and_then(|s| s.artifact)
    }

    pub fn version(&self, id: NodeId) -> Option<u64> {
        self.live_slot(id).ok().map(|s| s.version)
    }

    pub fn params(&self, id: NodeId) -> GraphResult<Vec<Param>> {
        Ok(self.live_slot(id)?.node.params())
    }

    pub fn producers_of(&self, consumer: NodeId) -> &[Option<NodeId>] {
        self.connections.producers_of(consumer)
    }

    pub fn consumers_of(&self, producer: NodeId) -> Vec<NodeId> {
        self.connections.consumers_of(producer)
    }

    pub fn camera(&self, id: NodeId) -> Option<&CameraNode> {
        self.node(id).and_then(AnyNode::as_camera)
    }

    fn camera_mut(&mut self, id: NodeId) -> Option<&mut CameraNode> {
        match self.nodes.get_mut(id.index()) {
            Some(slot) if !slot.deleted => slot.node.as_camera_mut(),
            _ => None,
        }
    }

    pub fn camera_state(&self, id: NodeId) -> Option<CameraState> {
        self.camera(id).map(CameraNode::state)
    }

    /// Read back a node's artifact. `None` without a resolved artifact.
    pub fn extract_pixels(&self, id: NodeId) -> Option<PixelPack> {
        let artifact = self.artifact(id)?;
        PixelPack::read(&self.backend, &artifact)
    }

    // ── Persistence ──

    pub fn encode_node(&self, id: NodeId) -> GraphResult<NodeState> {
        let slot = self.live_slot(id)?;
        NodeState::capture(&slot.node).ok_or_else(|| {
            GraphError::Decode(format!("{} ({}) has no persisted form", id, slot.node.name()))
        })
    }

    /// Insert a node built from persisted parameters. It starts dirty.
    pub fn insert_decoded(&mut self, state: NodeState) -> GraphResult<NodeId> {
        let node = state.build(&self.config, self.capture.clone())?;
        Ok(self.add_node(node))
    }

    // ── Events ──

    /// Apply queued capture events in arrival order.
    pub fn process_events(&mut self) -> usize {
        self.process_events_at(Instant::now())
    }

    pub fn process_events_at(&mut self, now: Instant) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            processed += 1;
            match event {
                GraphEvent::FrameDelivered {
                    node,
                    session,
                    frame,
                    orientation,
                } => {
                    let accepted = self
                        .camera_mut(node)
                        .map(|camera| camera.accept_frame(session, frame, orientation))
                        .unwrap_or(false);
                    if accepted {
                        self.mark_dirty(node);
                    }
                }
                GraphEvent::PermissionResolved { node, granted } => {
                    if let Some(camera) = self.camera_mut(node) {
                        camera.on_permission(granted);
                    }
                }
                GraphEvent::OrientationChanged => {
                    for slot in self.nodes.iter_mut().filter(|s| !s.deleted) {
                        if let Some(camera) = slot.node.as_camera_mut() {
                            camera.on_rotation(now);
                        }
                    }
                }
            }
        }

        for slot in self.nodes.iter_mut().filter(|s| !s.deleted) {
            if let Some(camera) = slot.node.as_camera_mut() {
                camera.poll_orientation(now);
            }
        }
        processed
    }

    // ── Tick ──

    /// The plan the next tick would run, without running it.
    pub fn plan(&self) -> RecomputePlan {
        RecomputeScheduler::plan(&self.nodes, &self.connections, self.tick + 1)
    }

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Run one tick with `now` as the event/orientation clock.
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        self.tick += 1;
        let events_processed = self.process_events_at(now);
        let plan = RecomputeScheduler::plan(&self.nodes, &self.connections, self.tick);

        // Nodes that did not produce this tick; their consumers are skipped
        let mut blocked = vec![false; self.nodes.len()];
        let mut outcomes = Vec::with_capacity(plan.order.len());
        for &id in &plan.order {
            let outcome = self.recompute(id, &blocked);
            if matches!(outcome, NodeOutcome::Recomputed { .. }) {
                self.refresh_consumers(id);
            } else {
                blocked[id.index()] = true;
            }
            outcomes.push((id, outcome));
        }

        let report = TickReport {
            tick: self.tick,
            events_processed,
            outcomes,
            stats: plan.stats,
        };
        if !report.is_idle() {
            debug!(
                "Tick {}: {} dirty, {} recomputed, {} failed",
                report.tick,
                report.stats.dirty_nodes,
                report.recomputed().len(),
                report.failed().len()
            );
        }
        report
    }

    /// Re-dirty clean consumers of a freshly rendered node.
    ///
    /// A consumer is only clean here if it rendered with this node's slot
    /// left empty; it picks up the new artifact on the next tick.
    fn refresh_consumers(&mut self, id: NodeId) {
        let stale: Vec<NodeId> = self
            .connections
            .consumers_of(id)
            .into_iter()
            .filter(|c| self.is_dirty(*c) == Some(false))
            .collect();
        for consumer in stale {
            trace!("{} rendered without {}, refreshing", consumer, id);
            self.mark_dirty(consumer);
        }
    }

    /// Attempt to recompute one planned node.
    fn recompute(&mut self, id: NodeId, blocked: &[bool]) -> NodeOutcome {
        let slot = &self.nodes[id.index()];
        let kind = slot.node.kind();

        let mut inputs = Vec::new();
        for (slot_idx, producer) in self.connections.producers_of(id).iter().enumerate() {
            let Some(p) = producer else {
                if kind.slot_required(slot_idx) {
                    return NodeOutcome::Deferred;
                }
                inputs.push(None);
                continue;
            };
            let producer_slot = self.nodes.get(p.index());
            let producer_blocked = blocked.get(p.index()).copied().unwrap_or(false);
            if !producer_blocked {
                if let Some(ps) = producer_slot.filter(|ps| !ps.dirty && ps.artifact.is_some()) {
                    inputs.push(ps.artifact);
                    continue;
                }
            }
            // An optional slot whose producer has never rendered counts as empty
            let never_rendered = producer_slot.map_or(true, |ps| ps.artifact.is_none());
            if !kind.slot_required(slot_idx) && never_rendered {
                inputs.push(None);
                continue;
            }
            return if producer_blocked {
                NodeOutcome::Skipped
            } else {
                NodeOutcome::Deferred
            };
        }

        let resolution = match kind {
            NodeKind::Generator => slot
                .node
                .resolution()
                .unwrap_or(self.config.default_resolution),
            NodeKind::Resource => match slot.node.resolution() {
                Some(resolution) => resolution,
                None => return NodeOutcome::Deferred,
            },
            _ => slot
                .node
                .resolution()
                .or_else(|| inputs.iter().flatten().next().map(|a| a.resolution))
                .unwrap_or(self.config.default_resolution),
        };

        let format = self.config.pixel_format;
        let mut temporaries = Vec::new();

        if kind == NodeKind::Resource {
            let Some(frame) = slot.node.source_frame() else {
                return NodeOutcome::Deferred;
            };
            match self.backend.upload(frame, format) {
                Ok(uploaded) => {
                    temporaries.push(uploaded);
                    inputs = vec![Some(uploaded)];
                }
                Err(e) => {
                    error!("{} ({}) upload failed: {}", id, slot.node.name(), e);
                    return NodeOutcome::Failed;
                }
            }
        } else {
            let (fill, extend) = (slot.node.fill_mode(), slot.node.extend_mode());
            for input in inputs.iter_mut() {
                let Some(artifact) = *input else { continue };
                if artifact.resolution == resolution {
                    continue;
                }
                match self.backend.resample(&artifact, resolution, fill, extend) {
                    Ok(resampled) => {
                        temporaries.push(resampled);
                        *input = Some(resampled);
                    }
                    Err(e) => {
                        error!("{} ({}) resample failed: {}", id, slot.node.name(), e);
                        for t in &temporaries {
                            self.backend.release(t);
                        }
                        return NodeOutcome::Failed;
                    }
                }
            }
        }

        let request = RenderRequest {
            shader: slot.node.shader(),
            uniforms: slot.node.uniforms(),
            inputs,
            resolution,
            format,
        };
        let result = self.backend.render(&request);
        for t in &temporaries {
            self.backend.release(t);
        }

        match result {
            Ok(artifact) => {
                let slot = &mut self.nodes[id.index()];
                if let Some(old) = slot.artifact.replace(artifact) {
                    self.backend.release(&old);
                }
                slot.version += 1;
                slot.dirty = false;
                trace!("{} recomputed at {} (v{})", id, resolution, slot.version);
                NodeOutcome::Recomputed {
                    version: slot.version,
                }
            }
            Err(e) => {
                error!("{} ({}) render failed: {}", id, slot.node.name(), e);
                NodeOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{shaders, BackendError, MockGpuBackend, TextureHandle};
    use crate::graph::nodes::{BlendsNode, LevelsNode, NoiseNode, OutputNode};
    use crate::types::Resolution;
    use mockall::predicate::*;

    fn artifact(n: u64) -> Artifact {
        Artifact {
            texture: TextureHandle(n),
            resolution: Resolution::square(8),
            format: Default::default(),
        }
    }

    #[test]
    fn test_renders_each_node_exactly_once() {
        let mut backend = MockGpuBackend::new();
        backend
            .expect_render()
            .withf(|r| r.shader == shaders::NOISE && r.inputs.is_empty())
            .times(1)
            .returning(|_| Ok(artifact(1)));
        backend
            .expect_render()
            .withf(|r| r.shader == shaders::OUTPUT && r.inputs == vec![Some(artifact(1))])
            .times(1)
            .returning(|_| Ok(artifact(2)));
        backend.expect_release().returning(|_| ());

        let mut graph = RenderGraph::new(EngineConfig::default(), backend);
        let noise = graph.add_node(NoiseNode::new(Resolution::square(8)));
        let out = graph.add_node(OutputNode::new());
        graph.connect(noise, out, 0).unwrap();

        let report = graph.tick();
        assert_eq!(report.recomputed(), vec![noise, out]);

        // Clean graph: no further backend calls
        assert!(graph.tick().is_idle());
    }

    #[test]
    fn test_render_failure_skips_downstream() {
        let mut backend = MockGpuBackend::new();
        backend
            .expect_render()
            .with(function(|r: &RenderRequest| r.shader == shaders::NOISE))
            .times(1)
            .returning(|_| {
                Err(BackendError::Render {
                    shader: shaders::NOISE,
                    message: "device lost".to_string(),
                })
            });
        backend.expect_release().returning(|_| ());

        let mut graph = RenderGraph::new(EngineConfig::default(), backend);
        let noise = graph.add_node(NoiseNode::new(Resolution::square(8)));
        let levels = graph.add_node(LevelsNode::new());
        graph.connect(noise, levels, 0).unwrap();

        let report = graph.tick();
        assert_eq!(report.outcome(noise), Some(NodeOutcome::Failed));
        assert_eq!(report.outcome(levels), Some(NodeOutcome::Skipped));
        assert_eq!(graph.is_dirty(noise), Some(true));
        assert_eq!(graph.is_dirty(levels), Some(true));
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut graph = RenderGraph::new(EngineConfig::default(), MockGpuBackend::new());
        assert_eq!(
            graph.connect(NodeId(0), NodeId(1), 0),
            Err(GraphError::UnknownNode(NodeId(0)))
        );
        assert_eq!(
            graph.set_param(NodeId(5), "seed", 1i64),
            Err(GraphError::UnknownNode(NodeId(5)))
        );
        assert_eq!(graph.mark_dirty(NodeId(2)), 0);
    }

    #[test]
    fn test_param_errors_carry_node() {
        let mut graph = RenderGraph::new(EngineConfig::default(), MockGpuBackend::new());
        let blends = graph.add_node(BlendsNode::new(2));
        assert!(matches!(
            graph.set_param(blends, "opacity", 0.5),
            Err(GraphError::UnknownParameter { node, .. }) if node == blends
        ));
        assert!(matches!(
            graph.set_param(blends, "blendMode", "screen"),
            Err(GraphError::InvalidParameter { node, .. }) if node == blends
        ));
    }
}
