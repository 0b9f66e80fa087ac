//! Downstream invalidation.
//!
//! Marking a node dirty marks every node reachable from it. Propagation
//! stops at nodes that are already dirty: their descendants are dirty too,
//! since every path that dirtied them continued downstream.

use crate::graph::connections::ConnectionGraph;
use crate::graph::id::NodeId;

/// Propagates dirtiness along producer → consumer edges.
pub struct DirtyPropagator;

impl DirtyPropagator {
    /// Mark `start` and its descendants dirty.
    ///
    /// `set_dirty` sets the flag of one node and returns true if it was
    /// clean before. Returns the number of nodes that became dirty.
    pub fn mark<F>(connections: &ConnectionGraph, start: NodeId, mut set_dirty: F) -> usize
    where
        F: FnMut(NodeId) -> bool,
    {
        let mut newly_dirty = 0;
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !set_dirty(id) {
                continue;
            }
            newly_dirty += 1;
            stack.extend(connections.consumers_of(id));
        }
        newly_dirty
    }
}
