//! NoiseNode: procedural fractal noise generator.
//!
//! Uniform layout (8 values):
//! `[seed, octaves, position.x, position.y, zPosition, zoom, colored, random]`
//! with booleans encoded as 0/1.

use crate::gpu::shaders;
use crate::graph::param::{
    expect_bool, expect_int, expect_point, expect_real, Param, ParamError, ParamValue,
};
use crate::types::{Point2, Resolution};
use serde::{Deserialize, Serialize};

/// Persisted and host-visible noise parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NoiseParams {
    pub seed: i64,
    /// Fractal detail levels, at least 1
    pub octaves: i64,
    pub position: Point2,
    /// Depth coordinate; animating it evolves the noise
    pub z_position: f64,
    pub zoom: f64,
    /// Independent noise per color channel
    pub colored: bool,
    /// Per-pixel white noise instead of smooth noise
    pub random: bool,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 7,
            position: Point2::ZERO,
            z_position: 0.0,
            zoom: 1.0,
            colored: false,
            random: false,
        }
    }
}

impl NoiseParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.octaves < 1 {
            return Err(ParamError::invalid("octaves", "must be at least 1"));
        }
        if !self.zoom.is_finite() || self.zoom == 0.0 {
            return Err(ParamError::invalid("zoom", "must be finite and non-zero"));
        }
        if !self.z_position.is_finite() {
            return Err(ParamError::invalid("zPosition", "must be finite"));
        }
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(ParamError::invalid("position", "coordinates must be finite"));
        }
        Ok(())
    }
}

/// Noise generator node.
pub struct NoiseNode {
    params: NoiseParams,
    resolution: Resolution,
}

impl NoiseNode {
    pub fn new(resolution: Resolution) -> Self {
        Self::with_params(NoiseParams::default(), resolution)
    }

    pub fn with_params(params: NoiseParams, resolution: Resolution) -> Self {
        Self { params, resolution }
    }

    pub fn name(&self) -> &str {
        "Noise"
    }

    pub fn shader(&self) -> &'static str {
        shaders::NOISE
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn noise_params(&self) -> &NoiseParams {
        &self.params
    }

    pub fn params(&self) -> Vec<Param> {
        let p = &self.params;
        vec![
            Param::new("seed", p.seed),
            Param::new("octaves", p.octaves),
            Param::new("position", p.position),
            Param::new("zPosition", p.z_position),
            Param::new("zoom", p.zoom),
            Param::new("colored", p.colored),
            Param::new("random", p.random),
        ]
    }

    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        let mut next = self.params.clone();
        match key {
            "seed" => next.seed = expect_int(key, value)?,
            "octaves" => next.octaves = expect_int(key, value)?,
            "position" => next.position = expect_point(key, value)?,
            "zPosition" => next.z_position = expect_real(key, value)?,
            "zoom" => next.zoom = expect_real(key, value)?,
            "colored" => next.colored = expect_bool(key, value)?,
            "random" => next.random = expect_bool(key, value)?,
            _ => return Err(ParamError::Unknown(key.to_string())),
        }
        next.validate()?;
        self.params = next;
        Ok(())
    }

    pub fn uniforms(&self) -> Vec<f32> {
        let p = &self.params;
        vec![
            p.seed as f32,
            p.octaves as f32,
            p.position.x as f32,
            p.position.y as f32,
            p.z_position as f32,
            p.zoom as f32,
            if p.colored { 1.0 } else { 0.0 },
            if p.random { 1.0 } else { 0.0 },
        ]
    }
}
