//! Dirty propagation and tick scheduling against the software backend

mod common;

use common::builders::{add_blends, software_graph, ChainBuilder, TEST_RESOLUTION};
use pixgraph::gpu::shaders;
use pixgraph::graph::{
    nodes::{LevelsNode, NoiseNode, OutputNode},
    NodeId, NodeOutcome,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[test]
fn test_noise_seed_change_rerenders_downstream() {
    let mut graph = software_graph();
    let noise = graph.add_node(NoiseNode::new(TEST_RESOLUTION));
    let output = graph.add_node(OutputNode::new());
    graph.connect(noise, output, 0).unwrap();
    assert_eq!(graph.params(noise).unwrap()[1].value.as_int(), Some(7));

    graph.tick();
    assert_eq!(graph.version(output), Some(1));
    let first = graph.extract_pixels(output).unwrap();

    graph.set_param(noise, "seed", 1i64).unwrap();
    assert_eq!(graph.dirty_nodes(), vec![noise, output]);

    let report = graph.tick();
    assert_eq!(report.recomputed(), vec![noise, output]);
    assert_eq!(graph.version(noise), Some(2));
    assert_eq!(graph.version(output), Some(2));
    let second = graph.extract_pixels(output).unwrap();
    assert_ne!(first.rows(), second.rows());

    // Same seed renders the same content
    graph.set_param(noise, "seed", 0i64).unwrap();
    graph.tick();
    assert_eq!(graph.extract_pixels(output).unwrap().rows(), first.rows());
}

#[test]
fn test_multi_input_with_absent_slot() {
    let mut graph = software_graph();
    let noise = graph.add_node(NoiseNode::new(TEST_RESOLUTION));
    let blends = add_blends(&mut graph, 2);
    graph.connect(noise, blends, 0).unwrap();

    let report = graph.tick();
    assert_eq!(report.outcome(blends), Some(NodeOutcome::Recomputed { version: 1 }));
    assert_eq!(graph.is_dirty(blends), Some(false));
    assert_eq!(graph.producers_of(blends), &[Some(noise), None]);

    // A lone layer blends to itself
    let noise_pixels = graph.extract_pixels(noise).unwrap();
    assert_eq!(graph.extract_pixels(blends).unwrap(), noise_pixels);
}

#[test]
fn test_missing_required_producer_defers_until_connected() {
    let mut graph = software_graph();
    let levels = graph.add_node(LevelsNode::new());

    for _ in 0..3 {
        let report = graph.tick();
        assert_eq!(report.outcome(levels), Some(NodeOutcome::Deferred));
        assert_eq!(graph.is_dirty(levels), Some(true));
        assert!(graph.artifact(levels).is_none());
    }

    let noise = graph.add_node(NoiseNode::new(TEST_RESOLUTION));
    graph.connect(noise, levels, 0).unwrap();
    let report = graph.tick();
    assert_eq!(report.recomputed(), vec![noise, levels]);
    assert!(graph.artifact(levels).is_some());
}

#[test]
fn test_backend_failure_is_isolated_and_retried() {
    let (mut graph, chain) = ChainBuilder::new().build();
    let sibling = graph.add_node(NoiseNode::new(TEST_RESOLUTION));
    let sibling_out = graph.add_node(OutputNode::new());
    graph.connect(sibling, sibling_out, 0).unwrap();

    graph.backend_mut().fail_shader(shaders::LEVELS);
    let report = graph.tick();
    assert_eq!(report.failed(), vec![chain.levels]);
    assert_eq!(report.outcome(chain.output), Some(NodeOutcome::Skipped));
    assert_eq!(report.outcome(sibling_out), Some(NodeOutcome::Recomputed { version: 1 }));
    assert_eq!(graph.dirty_nodes(), vec![chain.levels, chain.output]);

    // Still failing: retried every tick, downstream keeps waiting
    let report = graph.tick();
    assert_eq!(report.failed(), vec![chain.levels]);
    assert!(report.outcome(chain.noise).is_none());

    graph.backend_mut().clear_failures();
    let report = graph.tick();
    assert_eq!(report.recomputed(), vec![chain.levels, chain.output]);
    assert!(graph.dirty_nodes().is_empty());
    assert_eq!(graph.version(chain.noise), Some(1));
}

#[test]
fn test_clean_graph_is_idle() {
    let (mut graph, _) = ChainBuilder::new().build();
    graph.tick();
    let renders = graph.backend().total_renders();

    let report = graph.tick();
    assert!(report.is_idle());
    assert_eq!(report.stats.dirty_nodes, 0);
    assert_eq!(graph.backend().total_renders(), renders);
}

#[test]
fn test_parameter_writes_coalesce_within_a_tick() {
    let (mut graph, chain) = ChainBuilder::new().build();
    graph.tick();

    graph.set_param(chain.levels, "brightness", 0.5).unwrap();
    graph.set_param(chain.levels, "contrast", 0.2).unwrap();
    graph.set_param(chain.levels, "inverted", true).unwrap();

    let report = graph.tick();
    assert_eq!(report.recomputed(), vec![chain.levels, chain.output]);
    assert_eq!(graph.backend().render_count(shaders::LEVELS), 2);
}

#[test]
fn test_resolution_mismatch_resamples_inputs() {
    let mut graph = software_graph();
    let small = graph.add_node(NoiseNode::new(pixgraph::types::Resolution::new(4, 2)));
    let large = graph.add_node(NoiseNode::new(pixgraph::types::Resolution::new(16, 16)));
    let blends = add_blends(&mut graph, 2);
    graph.connect(small, blends, 0).unwrap();
    graph.connect(large, blends, 1).unwrap();

    graph.tick();
    // Working resolution comes from slot 0; only slot 1 is resampled
    assert_eq!(
        graph.artifact(blends).map(|a| a.resolution),
        Some(pixgraph::types::Resolution::new(4, 2))
    );
    assert_eq!(graph.backend().render_count(shaders::RESAMPLE), 1);
    // Temporaries are released after the render
    assert_eq!(graph.backend().live_textures(), 3);
}

/// Random DAG over blends nodes: (producer, consumer, slot) with producer < consumer.
fn dag_edges() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0usize..8, 0usize..8, 0usize..2), 0..20).prop_map(|raw| {
        raw.into_iter()
            .filter(|(p, c, _)| p < c)
            .collect()
    })
}

fn build_dag(
    edges: &[(usize, usize, usize)],
) -> (pixgraph::RenderGraph<pixgraph::SoftwareBackend>, Vec<NodeId>) {
    let mut graph = software_graph();
    let ids: Vec<NodeId> = (0..8).map(|_| add_blends(&mut graph, 2)).collect();
    for &(p, c, slot) in edges {
        graph.connect(ids[p], ids[c], slot).unwrap();
    }
    graph.tick();
    (graph, ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Marking a node dirties exactly the node and its descendants.
    #[test]
    fn prop_mark_dirty_closes_downstream(edges in dag_edges(), start in 0usize..8) {
        let (mut graph, ids) = build_dag(&edges);
        prop_assert!(graph.dirty_nodes().is_empty());

        graph.mark_dirty(ids[start]);
        let dirty: BTreeSet<NodeId> = graph.dirty_nodes().into_iter().collect();
        let expected: BTreeSet<NodeId> = ids
            .iter()
            .copied()
            .filter(|&n| n == ids[start] || graph.connections().reaches(ids[start], n))
            .collect();
        prop_assert_eq!(dirty, expected);
    }

    /// A second mark before the next tick changes nothing.
    #[test]
    fn prop_mark_dirty_is_idempotent(edges in dag_edges(), start in 0usize..8) {
        let (mut graph, ids) = build_dag(&edges);
        let first = graph.mark_dirty(ids[start]);
        let after_first = graph.dirty_nodes();

        prop_assert!(first >= 1);
        prop_assert_eq!(graph.mark_dirty(ids[start]), 0);
        prop_assert_eq!(graph.dirty_nodes(), after_first);
    }

    /// Producers render before their consumers, and a tick leaves nothing dirty.
    #[test]
    fn prop_tick_respects_dependencies(
        edges in dag_edges(),
        marks in prop::collection::vec(0usize..8, 1..4),
    ) {
        let (mut graph, ids) = build_dag(&edges);
        for m in marks {
            graph.mark_dirty(ids[m]);
        }
        let dirty = graph.dirty_nodes();

        let report = graph.tick();
        let order = report.recomputed();
        prop_assert_eq!(order.len(), dirty.len());
        for edge in graph.connections().edges() {
            let p = order.iter().position(|&n| n == edge.producer);
            let c = order.iter().position(|&n| n == edge.consumer);
            if let (Some(p), Some(c)) = (p, c) {
                prop_assert!(p < c);
            }
        }
        prop_assert!(graph.dirty_nodes().is_empty());
    }
}
