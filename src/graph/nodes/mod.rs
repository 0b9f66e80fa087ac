//! Built-in render node implementations.

pub mod blends;
pub mod camera;
pub mod levels;
pub mod noise;
pub mod output;

pub use blends::{BlendsNode, BlendsParams};
pub use camera::{CameraNode, CameraParams};
pub use levels::{LevelsNode, LevelsParams};
pub use noise::{NoiseNode, NoiseParams};
pub use output::{OutputNode, OutputParams};
