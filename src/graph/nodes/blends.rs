//! BlendsNode: combines N optional layers with a blending mode.
//!
//! Uniform layout (1 value): `[blendMode index]`. Slot order is layer
//! order: slot 0 is the bottom layer. Empty slots are skipped.

use crate::gpu::shaders;
use crate::graph::modes::{BlendingMode, ExtendMode, FillMode};
use crate::graph::param::{expect_mode, Param, ParamError, ParamValue};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BLEND_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BlendsParams {
    pub blend_mode: BlendingMode,
    /// How inputs of a different size are fitted
    pub fill_mode: FillMode,
    pub extend_mode: ExtendMode,
    /// Declared number of input slots
    pub slots: usize,
}

impl Default for BlendsParams {
    fn default() -> Self {
        Self {
            blend_mode: BlendingMode::default(),
            fill_mode: FillMode::default(),
            extend_mode: ExtendMode::default(),
            slots: DEFAULT_BLEND_SLOTS,
        }
    }
}

impl BlendsParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.slots == 0 {
            return Err(ParamError::invalid("slots", "must be at least 1"));
        }
        Ok(())
    }
}

/// Multi-input blend node.
pub struct BlendsNode {
    params: BlendsParams,
    resolution: Option<Resolution>,
}

impl BlendsNode {
    /// Blend node with `slots` input slots, clamped to at least one.
    pub fn new(slots: usize) -> Self {
        Self::with_params(BlendsParams {
            slots: slots.max(1),
            ..Default::default()
        })
    }

    pub fn with_params(params: BlendsParams) -> Self {
        Self {
            params,
            resolution: None,
        }
    }

    pub fn with_mode(mut self, mode: BlendingMode) -> Self {
        self.params.blend_mode = mode;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn name(&self) -> &str {
        "Blends"
    }

    pub fn shader(&self) -> &'static str {
        shaders::BLENDS
    }

    pub fn input_slots(&self) -> usize {
        self.params.slots
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn blend_mode(&self) -> BlendingMode {
        self.params.blend_mode
    }

    pub fn fill_mode(&self) -> FillMode {
        self.params.fill_mode
    }

    pub fn extend_mode(&self) -> ExtendMode {
        self.params.extend_mode
    }

    pub fn blends_params(&self) -> &BlendsParams {
        &self.params
    }

    pub fn params(&self) -> Vec<Param> {
        vec![
            Param::new("blendMode", self.params.blend_mode.key()),
            Param::new("fillMode", self.params.fill_mode.key()),
            Param::new("extendMode", self.params.extend_mode.key()),
        ]
    }

    /// Slot count is fixed at construction and not settable.
    pub fn set_param(&mut self, key: &str, value: &ParamValue) -> Result<(), ParamError> {
        match key {
            "blendMode" => self.params.blend_mode = expect_mode(key, value)?,
            "fillMode" => self.params.fill_mode = expect_mode(key, value)?,
            "extendMode" => self.params.extend_mode = expect_mode(key, value)?,
            _ => return Err(ParamError::Unknown(key.to_string())),
        }
        Ok(())
    }

    pub fn uniforms(&self) -> Vec<f32> {
        vec![self.params.blend_mode.index() as f32]
    }
}
