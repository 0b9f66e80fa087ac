//! Recompute ordering for one tick.
//!
//! The plan covers only dirty, live nodes and lists every producer before
//! its consumers. Clean producers are never revisited; their cached
//! artifacts feed the planned nodes directly.

use super::connections::ConnectionGraph;
use super::executor::NodeSlot;
use super::id::NodeId;
use super::plan::{PlanStats, RecomputePlan};

/// Orders the dirty subgraph for one tick
pub struct RecomputeScheduler;

impl RecomputeScheduler {
    /// Build the recompute plan for the current dirty set.
    ///
    /// Only dirty, non-deleted nodes are scheduled. The order is a reverse
    /// DFS postorder over the dirty subgraph, started from the dirty roots
    /// (generators and resources first, then by id), so every producer
    /// precedes its consumers.
    ///
    /// # Arguments
    /// * `nodes` - All node slots (including deleted)
    /// * `connections` - Current edges
    /// * `tick` - Tick counter the plan belongs to
    pub fn plan(nodes: &[NodeSlot], connections: &ConnectionGraph, tick: u64) -> RecomputePlan {
        let start_time = std::time::Instant::now();

        let dirty: Vec<bool> = nodes.iter().map(|s| !s.deleted && s.dirty).collect();
        let roots = Self::dirty_roots(nodes, connections, &dirty);
        let order = Self::reverse_postorder(connections, &dirty, &roots);

        let stats = PlanStats {
            total_nodes: nodes.iter().filter(|s| !s.deleted).count(),
            dirty_nodes: order.len(),
            root_nodes: roots.len(),
            plan_time_us: start_time.elapsed().as_micros() as u64,
        };

        RecomputePlan { order, tick, stats }
    }

    /// Dirty nodes with no dirty producer, sources first.
    fn dirty_roots(nodes: &[NodeSlot], connections: &ConnectionGraph, dirty: &[bool]) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = (0..nodes.len())
            .filter(|&idx| dirty[idx])
            .map(|idx| NodeId(idx as u32))
            .filter(|&id| {
                connections
                    .producers_of(id)
                    .iter()
                    .flatten()
                    .all(|p| !dirty.get(p.index()).copied().unwrap_or(false))
            })
            .collect();

        roots.sort_by_key(|id| (!nodes[id.index()].node.kind().is_source(), *id));
        roots
    }

    /// Iterative DFS over dirty consumers; reversed finishing order.
    fn reverse_postorder(
        connections: &ConnectionGraph,
        dirty: &[bool],
        roots: &[NodeId],
    ) -> Vec<NodeId> {
        let n = dirty.len();
        let mut visited = vec![false; n];
        let mut finished = Vec::new();

        // Roots are walked last-first so the final reversal keeps their
        // order. Dirty nodes not reachable from a root are walked after.
        let extra = (0..n).filter(|&i| dirty[i]).map(|i| NodeId(i as u32));
        for start in roots.iter().rev().copied().chain(extra) {
            if visited[start.index()] {
                continue;
            }
            visited[start.index()] = true;
            let mut stack: Vec<(NodeId, Vec<NodeId>)> =
                vec![(start, Self::dirty_consumers(connections, dirty, start))];

            while let Some((id, children)) = stack.last_mut() {
                match children.pop() {
                    Some(child) => {
                        if !visited[child.index()] {
                            visited[child.index()] = true;
                            let grandchildren = Self::dirty_consumers(connections, dirty, child);
                            stack.push((child, grandchildren));
                        }
                    }
                    None => {
                        finished.push(*id);
                        stack.pop();
                    }
                }
            }
        }

        finished.reverse();
        finished
    }

    /// Dirty consumers of `id`. Popped last-first, so after the final
    /// reversal siblings keep connection order.
    fn dirty_consumers(connections: &ConnectionGraph, dirty: &[bool], id: NodeId) -> Vec<NodeId> {
        connections
            .consumers_of(id)
            .into_iter()
            .filter(|c| dirty.get(c.index()).copied().unwrap_or(false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::AnyNode;
    use crate::graph::nodes::{BlendsNode, LevelsNode, NoiseNode, OutputNode};
    use crate::types::Resolution;

    /// levels(0) <- noise(1); blends(3) <- [levels, noise(2)]; output(4) <- blends
    fn fan_in() -> (Vec<NodeSlot>, ConnectionGraph) {
        let nodes: Vec<AnyNode> = vec![
            LevelsNode::new().into(),
            NoiseNode::new(Resolution::square(4)).into(),
            NoiseNode::new(Resolution::square(4)).into(),
            BlendsNode::new(2).into(),
            OutputNode::new().into(),
        ];
        let mut connections = ConnectionGraph::new();
        for (i, node) in nodes.iter().enumerate() {
            connections.register(NodeId(i as u32), node.input_slots(), node.kind().can_produce());
        }
        for (producer, consumer, slot) in [(1, 0, 0), (0, 3, 0), (2, 3, 1), (3, 4, 0)] {
            connections
                .connect(NodeId(producer), NodeId(consumer), slot)
                .unwrap();
        }
        (nodes.into_iter().map(NodeSlot::new).collect(), connections)
    }

    fn ids(raw: &[u32]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn test_sources_first_producers_before_consumers() {
        let (nodes, connections) = fan_in();
        let plan = RecomputeScheduler::plan(&nodes, &connections, 3);

        assert_eq!(plan.order, ids(&[1, 0, 2, 3, 4]));
        assert_eq!(plan.tick, 3);
        assert_eq!(plan.stats.total_nodes, 5);
        assert_eq!(plan.stats.dirty_nodes, 5);
        assert_eq!(plan.stats.root_nodes, 2);
    }

    #[test]
    fn test_clean_and_deleted_nodes_are_not_planned() {
        let (mut nodes, connections) = fan_in();
        for idx in [1, 2] {
            nodes[idx].dirty = false;
        }
        nodes[4].deleted = true;

        let plan = RecomputeScheduler::plan(&nodes, &connections, 1);
        assert_eq!(plan.order, ids(&[0, 3]));
        assert_eq!(plan.stats.total_nodes, 4);
        assert_eq!(plan.stats.root_nodes, 1);
    }

    #[test]
    fn test_clean_graph_plans_nothing() {
        let (mut nodes, connections) = fan_in();
        for slot in &mut nodes {
            slot.dirty = false;
        }
        let plan = RecomputeScheduler::plan(&nodes, &connections, 1);
        assert!(plan.order.is_empty());
        assert_eq!(plan.stats.root_nodes, 0);
    }
}
