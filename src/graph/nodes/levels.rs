//! LevelsNode: single-input tonal adjustment.
//!
//! Uniform layout (6 values):
//! `[brightness, darkness, contrast, gamma, inverted, opacity]`.

use crate::gpu::shaders;
use crate::graph::param::{expect_bool, expect_real, Param, ParamError, ParamValue};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LevelsParams {
    pub brightness: f64,
    pub darkness: f64,
    pub contrast: f64,
    /// Must be positive
    pub gamma: f64,
    pub inverted: bool,
    pub opacity: f64,
}

impl Default for LevelsParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            darkness: 0.0,
            contrast: 0.0,
            gamma: 1.0,
            inverted: false,
            opacity: 1.0,
        }
    }
}

impl LevelsParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        for (key, v) in [
            ("brightness", self.brightness),
            ("darkness", self.darkness),
            ("contrast", self.contrast),
            ("opacity", self.opacity),
        ] {
            if !v.is_finite() {
                return Err(ParamError::invalid(key, "must be finite"));
            }
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(ParamError::invalid("gamma", "must be positive"));
        }
        Ok(())
    }
}

/// Levels effect node.
pub struct LevelsNode {
    params: LevelsParams,
    resolution: Option<Resolution>,
}

impl LevelsNode {
    pub fn new() -> Self {
        Self::with_params(LevelsParams::default())
    }

    pub fn with_params(params: LevelsParams) -> Self {
        Self {
            params,
            resolution: None,
        }
    }

    /// Render at a fixed resolution instead of following the input.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn name(&self) -> &str {
        "Levels"
    }

    pub fn shader(&self) -> &'static str {
        shaders::LEVELS
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn levels_params(&self) -> &LevelsParams {
        &self.params
    }

    pub fn params(&self) -> Vec<Param> {
        let p = &self.params;
        vec![
            Param::new("brightness", p.brightness),
            Param::new("darkness", p.darkness),
            Param::new("contrast", p.contrast),
            Param::new("gamma", p.gamma),
            Param::new("inverted", p.inverted),
            Param::new("opacity", p.opacity),
        ]
    }

    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        let mut next = self.params.clone();
        match key {
            "brightness" => next.brightness = expect_real(key, value)?,
            "darkness" => next.darkness = expect_real(key, value)?,
            "contrast" => next.contrast = expect_real(key, value)?,
            "gamma" => next.gamma = expect_real(key, value)?,
            "inverted" => next.inverted = expect_bool(key, value)?,
            "opacity" => next.opacity = expect_real(key, value)?,
            _ => return Err(ParamError::Unknown(key.to_string())),
        }
        next.validate()?;
        self.params = next;
        Ok(())
    }

    pub fn uniforms(&self) -> Vec<f32> {
        let p = &self.params;
        vec![
            p.brightness as f32,
            p.darkness as f32,
            p.contrast as f32,
            p.gamma as f32,
            if p.inverted { 1.0 } else { 0.0 },
            p.opacity as f32,
        ]
    }
}

impl Default for LevelsNode {
    fn default() -> Self {
        Self::new()
    }
}
