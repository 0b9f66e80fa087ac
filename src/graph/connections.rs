//! Directed acyclic graph of producer → (consumer, slot) edges.
//!
//! Each consumer holds one entry per declared input slot; each producer
//! keeps its outgoing `(consumer, slot)` pairs for downstream traversal.
//! Both directions are vectors indexed by [`NodeId`], matching the node
//! slot storage of the render graph.
//!
//! # Invariants
//!
//! - A slot holds at most one producer.
//! - The graph is acyclic: `connect` refuses edges that would close a cycle.
//! - A failing operation leaves the graph unchanged.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::NodeId;

/// One edge of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub producer: NodeId,
    pub consumer: NodeId,
    pub slot: usize,
}

#[derive(Debug, Clone)]
struct NodeLinks {
    /// Whether this node may feed other nodes
    produces: bool,
    /// Producer per input slot
    inputs: Vec<Option<NodeId>>,
    /// Outgoing (consumer, slot) pairs in connection order
    outputs: Vec<(NodeId, usize)>,
}

/// Connection storage and cycle checking.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    links: Vec<Option<NodeLinks>>,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node with `slots` input slots.
    pub fn register(&mut self, id: NodeId, slots: usize, produces: bool) {
        let idx = id.index();
        if self.links.len() <= idx {
            self.links.resize_with(idx + 1, || None);
        }
        self.links[idx] = Some(NodeLinks {
            produces,
            inputs: vec![None; slots],
            outputs: Vec::new(),
        });
    }

    /// Remove a node and every edge touching it.
    ///
    /// Returns the consumers that lost an input, in connection order.
    pub fn unregister(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(links) = self.links.get_mut(id.index()).and_then(Option::take) else {
            return Vec::new();
        };

        for producer in links.inputs.iter().flatten() {
            if let Some(p) = self.node_mut(*producer) {
                p.outputs.retain(|(c, _)| *c != id);
            }
        }

        let mut orphaned = Vec::new();
        for (consumer, slot) in links.outputs {
            if let Some(c) = self.node_mut(consumer) {
                if let Some(entry) = c.inputs.get_mut(slot) {
                    *entry = None;
                }
            }
            if !orphaned.contains(&consumer) {
                orphaned.push(consumer);
            }
        }
        orphaned
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    fn node(&self, id: NodeId) -> Option<&NodeLinks> {
        self.links.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeLinks> {
        self.links.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Connect `producer` into `slot` of `consumer`, replacing any previous
    /// producer of that slot.
    ///
    /// Returns the replaced producer, if any.
    pub fn connect(
        &mut self,
        producer: NodeId,
        consumer: NodeId,
        slot: usize,
    ) -> GraphResult<Option<NodeId>> {
        let p = self.node(producer).ok_or(GraphError::UnknownNode(producer))?;
        if !p.produces {
            return Err(GraphError::NotAProducer(producer));
        }
        let c = self.node(consumer).ok_or(GraphError::UnknownNode(consumer))?;
        if slot >= c.inputs.len() {
            return Err(GraphError::SlotOutOfRange {
                consumer,
                slot,
                slots: c.inputs.len(),
            });
        }
        if producer == consumer || self.reaches(consumer, producer) {
            return Err(GraphError::Cycle { producer, consumer });
        }

        let previous = c.inputs[slot];
        if previous == Some(producer) {
            return Ok(previous);
        }
        if let Some(old) = previous {
            if let Some(o) = self.node_mut(old) {
                o.outputs.retain(|&(c, s)| !(c == consumer && s == slot));
            }
        }
        if let Some(c) = self.node_mut(consumer) {
            c.inputs[slot] = Some(producer);
        }
        if let Some(p) = self.node_mut(producer) {
            p.outputs.push((consumer, slot));
        }
        Ok(previous)
    }

    /// Clear `slot` of `consumer`. Returns the removed producer, if any.
    pub fn disconnect(&mut self, consumer: NodeId, slot: usize) -> GraphResult<Option<NodeId>> {
        let c = self.node_mut(consumer).ok_or(GraphError::UnknownNode(consumer))?;
        let slots = c.inputs.len();
        let Some(entry) = c.inputs.get_mut(slot) else {
            return Err(GraphError::SlotOutOfRange {
                consumer,
                slot,
                slots,
            });
        };
        let Some(producer) = entry.take() else {
            return Ok(None);
        };
        if let Some(p) = self.node_mut(producer) {
            p.outputs.retain(|&(c, s)| !(c == consumer && s == slot));
        }
        Ok(Some(producer))
    }

    /// Whether a directed path leads from `from` to `to`.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.links.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            let idx = id.index();
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            if let Some(links) = self.node(id) {
                stack.extend(links.outputs.iter().map(|&(c, _)| c));
            }
        }
        false
    }

    /// Producer per input slot of `consumer`; empty for unknown nodes.
    pub fn producers_of(&self, consumer: NodeId) -> &[Option<NodeId>] {
        self.node(consumer).map(|l| l.inputs.as_slice()).unwrap_or(&[])
    }

    /// Distinct consumers fed by `producer`, in connection order.
    pub fn consumers_of(&self, producer: NodeId) -> Vec<NodeId> {
        let mut consumers = Vec::new();
        if let Some(links) = self.node(producer) {
            for &(c, _) in &links.outputs {
                if !consumers.contains(&c) {
                    consumers.push(c);
                }
            }
        }
        consumers
    }

    pub fn slot_count(&self, consumer: NodeId) -> usize {
        self.producers_of(consumer).len()
    }

    /// All edges, ordered by consumer then slot.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (idx, links) in self.links.iter().enumerate() {
            let Some(links) = links else { continue };
            for (slot, producer) in links.inputs.iter().enumerate() {
                if let Some(producer) = producer {
                    edges.push(Edge {
                        producer: *producer,
                        consumer: NodeId(idx as u32),
                        slot,
                    });
                }
            }
        }
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.links
            .iter()
            .flatten()
            .map(|l| l.inputs.iter().flatten().count())
            .sum()
    }
}
