//! Topology operations on a live render graph

mod common;

use common::builders::{add_blends, software_graph, ChainBuilder};
use pixgraph::graph::{
    nodes::{LevelsNode, NoiseNode, OutputNode},
    GraphError, NodeId, NodeKind, NodeOutcome, PixNode,
};
use pixgraph::types::Resolution;
use proptest::prelude::*;

#[test]
fn test_cycle_rejected_graph_unchanged() {
    let (mut graph, chain) = ChainBuilder::new().build();
    let extra = graph.add_node(LevelsNode::new());
    graph.connect(chain.levels, extra, 0).unwrap();
    let edges_before = graph.connections().edges();

    assert_eq!(
        graph.connect(extra, chain.levels, 0),
        Err(GraphError::Cycle {
            producer: extra,
            consumer: chain.levels
        })
    );
    assert_eq!(graph.connections().edges(), edges_before);
    assert_eq!(graph.producers_of(chain.levels), &[Some(chain.noise)]);
}

#[test]
fn test_slot_out_of_range() {
    let mut graph = software_graph();
    let noise = graph.add_node(NoiseNode::new(Resolution::square(4)));
    let blends = add_blends(&mut graph, 2);
    assert_eq!(
        graph.connect(noise, blends, 2),
        Err(GraphError::SlotOutOfRange {
            consumer: blends,
            slot: 2,
            slots: 2
        })
    );
    assert_eq!(graph.connections().edge_count(), 0);
}

#[test]
fn test_generators_have_no_inputs_and_outputs_feed_nothing() {
    let mut graph = software_graph();
    let noise = graph.add_node(NoiseNode::new(Resolution::square(4)));
    let other = graph.add_node(NoiseNode::new(Resolution::square(4)));
    let output = graph.add_node(OutputNode::new());

    assert!(matches!(
        graph.connect(other, noise, 0),
        Err(GraphError::SlotOutOfRange { slots: 0, .. })
    ));
    assert_eq!(
        graph.connect(output, noise, 0),
        Err(GraphError::NotAProducer(output))
    );
}

/// Host-defined node that declares its own slot count
struct Declared {
    kind: NodeKind,
    slots: usize,
}

impl PixNode for Declared {
    fn name(&self) -> &str {
        "Declared"
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn shader(&self) -> &'static str {
        "contentGeneratorColorPIX"
    }

    fn input_slots(&self) -> usize {
        self.slots
    }

    fn uniforms(&self) -> Vec<f32> {
        Vec::new()
    }
}

#[test]
fn test_plugin_slot_count_is_bound_by_kind() {
    let mut graph = software_graph();
    let noise = graph.add_node(NoiseNode::new(Resolution::square(4)));
    let generator = graph.add_node(Box::new(Declared {
        kind: NodeKind::Generator,
        slots: 2,
    }) as Box<dyn PixNode>);
    let effect = graph.add_node(Box::new(Declared {
        kind: NodeKind::SingleInputEffect,
        slots: 3,
    }) as Box<dyn PixNode>);

    assert!(matches!(
        graph.connect(noise, generator, 0),
        Err(GraphError::SlotOutOfRange { slots: 0, .. })
    ));
    assert!(matches!(
        graph.connect(noise, effect, 1),
        Err(GraphError::SlotOutOfRange { slots: 1, .. })
    ));
    graph.connect(noise, effect, 0).unwrap();
    assert!(graph.producers_of(generator).is_empty());
    assert_eq!(graph.producers_of(effect), &[Some(noise)]);
}

#[test]
fn test_connect_replaces_slot_and_marks_consumer_dirty() {
    let (mut graph, chain) = ChainBuilder::new().build();
    graph.tick();
    assert!(graph.dirty_nodes().is_empty());

    let replacement = graph.add_node(NoiseNode::new(Resolution::square(8)));
    graph.tick();
    assert!(graph.dirty_nodes().is_empty());

    graph.connect(replacement, chain.levels, 0).unwrap();
    assert_eq!(graph.producers_of(chain.levels), &[Some(replacement)]);
    assert!(graph.consumers_of(chain.noise).is_empty());
    assert_eq!(graph.dirty_nodes(), vec![chain.levels, chain.output]);
}

#[test]
fn test_disconnect_absent_edge_is_noop() {
    let (mut graph, chain) = ChainBuilder::new().build();
    let blends = add_blends(&mut graph, 2);
    graph.connect(chain.noise, blends, 0).unwrap();
    graph.tick();

    graph.disconnect(blends, 1).unwrap();
    assert_eq!(graph.is_dirty(blends), Some(false));

    graph.disconnect(chain.output, 0).unwrap();
    assert_eq!(graph.is_dirty(chain.output), Some(true));
    assert_eq!(graph.producers_of(chain.output), &[None]);

    // Output now lacks its required input
    let report = graph.tick();
    assert_eq!(report.outcome(chain.output), Some(NodeOutcome::Deferred));
}

#[test]
fn test_remove_node_orphans_consumers() {
    let (mut graph, chain) = ChainBuilder::new().build();
    graph.tick();
    let textures = graph.backend().live_textures();

    graph.remove_node(chain.levels).unwrap();
    assert!(!graph.contains(chain.levels));
    assert_eq!(graph.producers_of(chain.output), &[None]);
    assert_eq!(graph.is_dirty(chain.output), Some(true));
    assert_eq!(graph.backend().live_textures(), textures - 1);

    assert_eq!(
        graph.remove_node(chain.levels),
        Err(GraphError::UnknownNode(chain.levels))
    );
    assert_eq!(
        graph.connect(chain.noise, chain.levels, 0),
        Err(GraphError::UnknownNode(chain.levels))
    );
    assert_eq!(graph.node_ids(), vec![chain.noise, chain.output]);
}

#[test]
fn test_unknown_ids_are_rejected() {
    let mut graph = software_graph();
    let ghost = NodeId(42);
    assert_eq!(graph.disconnect(ghost, 0), Err(GraphError::UnknownNode(ghost)));
    assert_eq!(graph.is_dirty(ghost), None);
    assert!(graph.extract_pixels(ghost).is_none());
}

proptest! {
    /// Any accepted edge sequence stays acyclic; rejected edges change nothing.
    #[test]
    fn prop_connect_keeps_graph_acyclic(
        attempts in prop::collection::vec((0u32..6, 0u32..6, 0usize..2), 1..40)
    ) {
        let mut graph = software_graph();
        let ids: Vec<NodeId> = (0..6).map(|_| add_blends(&mut graph, 2)).collect();

        for (p, c, slot) in attempts {
            let before = graph.connections().edge_count();
            let result = graph.connect(ids[p as usize], ids[c as usize], slot);
            if let Err(e) = result {
                prop_assert!(matches!(e, GraphError::Cycle { .. }), "expected Cycle error, got {:?}", e);
                prop_assert_eq!(graph.connections().edge_count(), before);
            }
        }
        for edge in graph.connections().edges() {
            prop_assert!(!graph.connections().reaches(edge.consumer, edge.producer));
        }
    }
}
