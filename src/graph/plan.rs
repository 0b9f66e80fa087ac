use crate::graph::id::NodeId;

/// Dirty nodes of one tick in dependency order.
#[derive(Debug, Clone, Default)]
pub struct RecomputePlan {
    /// Every producer precedes its consumers
    pub order: Vec<NodeId>,

    /// Tick the plan was built for
    pub tick: u64,

    /// Planning statistics
    pub stats: PlanStats,
}

/// Statistics about a recompute plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Live (non-deleted) nodes in the graph
    pub total_nodes: usize,

    /// Dirty nodes scheduled this tick
    pub dirty_nodes: usize,

    /// Dirty nodes without a dirty producer
    pub root_nodes: usize,

    /// Planning time in microseconds
    pub plan_time_us: u64,
}

impl RecomputePlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `id` in the plan.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }
}

/// What happened to one scheduled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Rendered; the artifact now has `version`
    Recomputed { version: u64 },
    /// A required input or external frame is missing; stays dirty
    Deferred,
    /// An upstream node in this tick did not produce; stays dirty
    Skipped,
    /// The backend reported an error; stays dirty and retries next tick
    Failed,
}

/// Result of one graph tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,

    /// Events applied before planning
    pub events_processed: usize,

    /// Outcome per scheduled node, in plan order
    pub outcomes: Vec<(NodeId, NodeOutcome)>,

    pub stats: PlanStats,
}

impl TickReport {
    pub fn outcome(&self, id: NodeId) -> Option<NodeOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| *n == id)
            .map(|(_, outcome)| *outcome)
    }

    /// Nodes that rendered this tick, in render order.
    pub fn recomputed(&self) -> Vec<NodeId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, NodeOutcome::Recomputed { .. }))
            .map(|(n, _)| *n)
            .collect()
    }

    pub fn failed(&self) -> Vec<NodeId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == NodeOutcome::Failed)
            .map(|(n, _)| *n)
            .collect()
    }

    /// Nothing was scheduled.
    pub fn is_idle(&self) -> bool {
        self.outcomes.is_empty()
    }
}
