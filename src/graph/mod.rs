//! Node graph with dirty tracking and demand-driven recompute.
//!
//! Nodes are generators (noise), resources (camera), single- and
//! multi-input effects (levels, blends) and the output sink. Each node owns
//! a cached GPU artifact that stays valid until the node, or anything
//! upstream of it, changes.
//!
//! # Architecture
//!
//! ```text
//! capture threads ──GraphEvent──▶ EventSender ──▶ RenderGraph::tick
//!                                                   ├─ process events
//!                                                   ├─ RecomputeScheduler::plan
//!                                                   └─ GpuBackend::render per node
//! ```
//!
//! Mutations (`connect`, `set_param`, accepted camera frames) mark the
//! affected node and all of its descendants dirty in one pass, so the set of
//! dirty nodes is always closed downstream. A tick recomputes exactly the
//! dirty nodes, producers before consumers.

pub mod bridge;
pub mod clock;
pub mod connections;
pub mod dirty;
pub mod error;
pub mod executor;
pub mod extract;
pub mod id;
pub mod modes;
pub mod node;
pub mod nodes;
pub mod param;
pub mod persist;
pub mod plan;
pub mod scheduler;

pub use bridge::{EventSender, GraphEvent};
pub use clock::FrameClock;
pub use connections::{ConnectionGraph, Edge};
pub use dirty::DirtyPropagator;
pub use error::{GraphError, GraphResult};
pub use executor::{NodeSlot, RenderGraph};
pub use extract::PixelPack;
pub use id::NodeId;
pub use modes::{BlendingMode, ExtendMode, FillMode};
pub use node::{AnyNode, BuiltinNode, NodeContext, NodeKind, PixNode};
pub use param::{Param, ParamError, ParamValue};
pub use persist::NodeState;
pub use plan::{NodeOutcome, PlanStats, RecomputePlan, TickReport};
pub use scheduler::RecomputeScheduler;
