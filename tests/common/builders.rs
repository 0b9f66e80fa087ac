//! Test data builders for graphs and frames

use pixgraph::{
    capture::FrameBuffer,
    config::EngineConfig,
    gpu::SoftwareBackend,
    graph::{
        nodes::{BlendsNode, LevelsNode, NoiseNode, OutputNode},
        NodeId, RenderGraph,
    },
    types::{PixelFormat, Resolution},
};

/// Small textures keep software rendering fast
pub const TEST_RESOLUTION: Resolution = Resolution::new(8, 8);

/// Engine config sized for tests
pub fn test_config() -> EngineConfig {
    EngineConfig {
        default_resolution: TEST_RESOLUTION,
        pixel_format: PixelFormat::Rgba32Float,
        fps_max: 100,
        event_queue_capacity: 64,
        ..Default::default()
    }
}

/// An empty graph on the software backend
pub fn software_graph() -> RenderGraph<SoftwareBackend> {
    RenderGraph::new(test_config(), SoftwareBackend::new())
}

/// Ids of a noise → levels → output chain
#[derive(Debug, Clone, Copy)]
pub struct Chain {
    pub noise: NodeId,
    pub levels: NodeId,
    pub output: NodeId,
}

/// Builder for linear test graphs
pub struct ChainBuilder {
    graph: RenderGraph<SoftwareBackend>,
    seed: i64,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            graph: software_graph(),
            seed: 0,
        }
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(mut self) -> (RenderGraph<SoftwareBackend>, Chain) {
        let noise = self.graph.add_node(NoiseNode::new(TEST_RESOLUTION));
        let levels = self.graph.add_node(LevelsNode::new());
        let output = self.graph.add_node(OutputNode::new());
        self.graph
            .set_param(noise, "seed", self.seed)
            .expect("seed is a valid parameter");
        self.graph.connect(noise, levels, 0).expect("acyclic");
        self.graph.connect(levels, output, 0).expect("acyclic");
        (
            self.graph,
            Chain {
                noise,
                levels,
                output,
            },
        )
    }
}

/// Add a blends node with `slots` inputs
pub fn add_blends(graph: &mut RenderGraph<SoftwareBackend>, slots: usize) -> NodeId {
    graph.add_node(BlendsNode::new(slots))
}

/// A solid-color camera frame
pub fn solid_frame(width: u32, height: u32, rgba: [f32; 4]) -> FrameBuffer {
    FrameBuffer::solid(width, height, rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder() {
        let (graph, chain) = ChainBuilder::new().seed(3).build();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.producers_of(chain.output), &[Some(chain.levels)]);
        assert_eq!(graph.dirty_nodes().len(), 3);
    }
}
