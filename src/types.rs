//! Core value types shared across the engine
//!
//! This module contains the small, copyable types that flow between the
//! graph, the GPU backend and the capture adapters.
//!
//! # Main Types
//!
//! - [`Resolution`] - Pixel dimensions of an artifact
//! - [`PixelFormat`] - Channel depth of GPU textures (the engine-wide color format)
//! - [`Color`] - Four normalized channels as read back from a texture
//! - [`Point2`] - 2D point used for parameters and pixel sampling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an artifact in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square resolution, e.g. `Resolution::square(128)`.
    pub const fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of normalized channel values for an RGBA buffer of this size.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.pixel_count() * 4
    }

    /// Same resolution with width and height swapped.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height; zero for an empty resolution.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Channel depth of the textures the backend produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8 bits per channel
    #[default]
    Rgba8,
    /// 16-bit float per channel
    Rgba16Float,
    /// 32-bit float per channel
    Rgba32Float,
}

impl PixelFormat {
    /// Bits per channel.
    pub fn bits(&self) -> u32 {
        match self {
            PixelFormat::Rgba8 => 8,
            PixelFormat::Rgba16Float => 16,
            PixelFormat::Rgba32Float => 32,
        }
    }
}

/// An RGBA color with normalized channels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const CLEAR: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from the first four values of a channel slice.
    pub fn from_channels(channels: &[f32]) -> Option<Self> {
        match channels {
            [r, g, b, a, ..] => Some(Self::new(*r, *g, *b, *a)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A 2D point with real coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ZERO: Point2 = Point2::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
