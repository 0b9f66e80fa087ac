//! CPU-side pixel access to rendered artifacts.
//!
//! A [`PixelPack`] is a row-major grid of [`Color`]s read back from a
//! texture. Lookups clamp to the edge instead of failing.

use crate::gpu::{Artifact, GpuBackend};
use crate::types::{Color, Point2, Resolution};

/// Rows of pixels of one artifact; `rows[y][x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPack {
    resolution: Resolution,
    rows: Vec<Vec<Color>>,
}

impl PixelPack {
    /// Reshape normalized RGBA channels (row-major, four per pixel).
    ///
    /// Returns `None` for an empty resolution or a buffer shorter than the
    /// resolution requires. Trailing channels beyond that are ignored.
    pub fn from_normalized(resolution: Resolution, channels: &[f32]) -> Option<Self> {
        if resolution.is_empty() || channels.len() < resolution.channel_count() {
            return None;
        }
        let width = resolution.width as usize;
        let rows = channels[..resolution.channel_count()]
            .chunks_exact(width * 4)
            .map(|row| {
                row.chunks_exact(4)
                    .filter_map(Color::from_channels)
                    .collect::<Vec<Color>>()
            })
            .collect();
        Some(Self { resolution, rows })
    }

    /// Read back `artifact` through `backend`.
    pub fn read<B: GpuBackend + ?Sized>(backend: &B, artifact: &Artifact) -> Option<Self> {
        let channels = backend.read_normalized(artifact)?;
        Self::from_normalized(artifact.resolution, &channels)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn rows(&self) -> &[Vec<Color>] {
        &self.rows
    }

    /// Exact lookup; `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Pixel at integer-rounded position, clamped to the grid.
    pub fn pixel(&self, pos: Point2) -> Color {
        let x = Self::clamp_index(pos.x.round(), self.resolution.width);
        let y = Self::clamp_index(pos.y.round(), self.resolution.height);
        self.rows[y][x]
    }

    /// Pixel at normalized coordinates (0..1 spans the grid), clamped.
    pub fn pixel_uv(&self, uv: Point2) -> Color {
        let x_max = (self.resolution.width - 1) as f64;
        let y_max = (self.resolution.height - 1) as f64;
        let x = Self::clamp_index((uv.x * x_max + 0.5).round(), self.resolution.width);
        let y = Self::clamp_index((uv.y * y_max + 0.5).round(), self.resolution.height);
        self.rows[y][x]
    }

    /// Mean of all pixels.
    pub fn average(&self) -> Color {
        let count = self.resolution.pixel_count() as f32;
        let mut sum = [0.0f32; 4];
        for color in self.rows.iter().flatten() {
            for (acc, c) in sum.iter_mut().zip(color.to_array()) {
                *acc += c;
            }
        }
        Color::new(sum[0] / count, sum[1] / count, sum[2] / count, sum[3] / count)
    }

    fn clamp_index(value: f64, dim: u32) -> usize {
        let max = dim.saturating_sub(1) as i64;
        // NaN casts to 0
        (value as i64).clamp(0, max) as usize
    }
}
