//! # pixgraph: node-graph pixel engine
//!
//! A render graph of image-producing nodes (generators, camera resources,
//! effects and an output sink) connected producer → consumer. Each node
//! caches its last GPU artifact; edits mark the node and everything
//! downstream dirty, and the next tick recomputes exactly the dirty nodes in
//! dependency order.
//!
//! ## Architecture
//!
//! - **Graph**: topology, dirty propagation, scheduling and the tick loop
//! - **GPU**: the [`gpu::GpuBackend`] boundary plus a deterministic CPU backend
//! - **Capture**: camera permission, session and orientation handling behind
//!   the [`capture::CaptureDevice`] trait
//! - **Communication**: a bounded crossbeam queue carries capture callbacks
//!   onto the graph thread
//!
//! ## Example
//!
//! ```ignore
//! use pixgraph::{
//!     config::EngineConfig,
//!     gpu::SoftwareBackend,
//!     graph::{nodes::{LevelsNode, NoiseNode, OutputNode}, RenderGraph},
//!     types::Resolution,
//! };
//!
//! let mut graph = RenderGraph::new(EngineConfig::default(), SoftwareBackend::new());
//! let noise = graph.add_node(NoiseNode::new(Resolution::square(256)));
//! let levels = graph.add_node(LevelsNode::new());
//! let out = graph.add_node(OutputNode::new());
//! graph.connect(noise, levels, 0)?;
//! graph.connect(levels, out, 0)?;
//!
//! graph.tick();
//! let pixels = graph.extract_pixels(out).unwrap();
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod gpu;
pub mod graph;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{PixError, Result};
pub use gpu::{GpuBackend, SoftwareBackend};
pub use graph::{GraphError, NodeId, PixelPack, RenderGraph, TickReport};
pub use types::{Color, PixelFormat, Point2, Resolution};
