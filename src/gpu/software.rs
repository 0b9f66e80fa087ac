//! Deterministic CPU implementation of the built-in shaders.
//!
//! Textures live in a map keyed by handle. Every shader samples its inputs
//! with nearest-neighbour lookups in normalized coordinates, so inputs of a
//! different size than the output are still well-defined. `Rgba8` output is
//! quantized to 8-bit steps and clamped; float formats are kept as is.
//!
//! The backend counts renders per shader and can be told to fail a shader,
//! which is how tests exercise the graph's failure policy.

use super::{shaders, Artifact, BackendError, GpuBackend, RenderRequest, TextureHandle};
use crate::capture::FrameBuffer;
use crate::graph::modes::{BlendingMode, ExtendMode, FillMode};
use crate::types::{PixelFormat, Resolution};
use std::collections::{HashMap, HashSet};

type Rgba = [f32; 4];

const CLEAR: Rgba = [0.0; 4];

/// Lattice frequency of noise at zoom 1
const NOISE_BASE_FREQUENCY: f64 = 4.0;

/// Octaves beyond this add no visible detail at texture resolutions
const MAX_OCTAVES: usize = 16;

struct Texture {
    resolution: Resolution,
    data: Vec<f32>,
}

impl Texture {
    fn pixel(&self, x: u32, y: u32) -> Rgba {
        let i = (y as usize * self.resolution.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Nearest-neighbour sample at normalized `(u, v)`.
    fn sample(&self, u: f64, v: f64, extend: ExtendMode) -> Rgba {
        let (Some(u), Some(v)) = (extend_coord(u, extend), extend_coord(v, extend)) else {
            return CLEAR;
        };
        let w = self.resolution.width;
        let h = self.resolution.height;
        let x = ((u * w as f64).floor() as i64).clamp(0, w as i64 - 1) as u32;
        let y = ((v * h as f64).floor() as i64).clamp(0, h as i64 - 1) as u32;
        self.pixel(x, y)
    }
}

/// Map a coordinate into `[0, 1]`; `None` means transparent.
fn extend_coord(c: f64, extend: ExtendMode) -> Option<f64> {
    if (0.0..=1.0).contains(&c) {
        return Some(c);
    }
    match extend {
        ExtendMode::Hold => Some(c.clamp(0.0, 1.0)),
        ExtendMode::Zero => None,
        ExtendMode::Repeat => Some(c.rem_euclid(1.0)),
        ExtendMode::Mirror => {
            let t = c.rem_euclid(2.0);
            Some(if t > 1.0 { 2.0 - t } else { t })
        }
    }
}

/// CPU backend for tests, benches and the headless host.
#[derive(Default)]
pub struct SoftwareBackend {
    textures: HashMap<TextureHandle, Texture>,
    next_handle: u64,
    failing: HashSet<String>,
    render_counts: HashMap<String, usize>,
    uploads: usize,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every render of `shader` fail until cleared.
    pub fn fail_shader(&mut self, shader: &str) {
        self.failing.insert(shader.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Successful renders of `shader` so far.
    pub fn render_count(&self, shader: &str) -> usize {
        self.render_counts.get(shader).copied().unwrap_or(0)
    }

    pub fn total_renders(&self) -> usize {
        self.render_counts.values().sum()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Textures not yet released.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn store(&mut self, resolution: Resolution, format: PixelFormat, mut data: Vec<f32>) -> Artifact {
        if format == PixelFormat::Rgba8 {
            for v in data.iter_mut() {
                *v = (v.clamp(0.0, 1.0) * 255.0).round() / 255.0;
            }
        }
        self.next_handle += 1;
        let texture = TextureHandle(self.next_handle);
        self.textures.insert(texture, Texture { resolution, data });
        Artifact {
            texture,
            resolution,
            format,
        }
    }

    fn texture(&self, artifact: &Artifact) -> Result<&Texture, BackendError> {
        self.textures
            .get(&artifact.texture)
            .ok_or(BackendError::UnknownTexture(artifact.texture))
    }

    fn inputs(&self, request: &RenderRequest) -> Result<Vec<Option<&Texture>>, BackendError> {
        request
            .inputs
            .iter()
            .map(|input| input.as_ref().map(|a| self.texture(a)).transpose())
            .collect()
    }
}

/// Evaluate `f` at every pixel center in normalized coordinates.
fn shade(resolution: Resolution, mut f: impl FnMut(u32, u32, f64, f64) -> Rgba) -> Vec<f32> {
    let mut data = Vec::with_capacity(resolution.channel_count());
    for y in 0..resolution.height {
        let v = (y as f64 + 0.5) / resolution.height as f64;
        for x in 0..resolution.width {
            let u = (x as f64 + 0.5) / resolution.width as f64;
            data.extend_from_slice(&f(x, y, u, v));
        }
    }
    data
}

fn uniform(request: &RenderRequest, index: usize) -> f32 {
    request.uniforms.get(index).copied().unwrap_or(0.0)
}

// ── Noise ──

fn hash(seed: i64, x: i64, y: i64, z: i64) -> f32 {
    let mut h = (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (x as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
        ^ (y as u64).wrapping_mul(0x94D0_49BB_1331_11EB)
        ^ (z as u64).wrapping_mul(0xD6E8_FEB8_6659_FD93);
    h ^= h >> 30;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    (h >> 40) as f32 / (1u64 << 24) as f32
}

fn smooth(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Trilinearly interpolated lattice noise in `[0, 1)`.
fn value_noise(seed: i64, x: f64, y: f64, z: f64) -> f64 {
    let (x0, y0, z0) = (x.floor(), y.floor(), z.floor());
    let (tx, ty, tz) = (smooth(x - x0), smooth(y - y0), smooth(z - z0));
    let (ix, iy, iz) = (x0 as i64, y0 as i64, z0 as i64);
    let corner = |dx: i64, dy: i64, dz: i64| hash(seed, ix + dx, iy + dy, iz + dz) as f64;

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), tx);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), tx);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), tx);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), tx);
    lerp(lerp(x00, x10, ty), lerp(x01, x11, ty), tz)
}

fn fractal_noise(seed: i64, octaves: usize, x: f64, y: f64, z: f64) -> f64 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for octave in 0..octaves {
        let octave_seed = seed.wrapping_add(octave as i64 * 1013);
        sum += amplitude * value_noise(octave_seed, x * frequency, y * frequency, z * frequency);
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    sum / norm
}

fn render_noise(request: &RenderRequest) -> Vec<f32> {
    let seed = uniform(request, 0) as i64;
    let octaves = (uniform(request, 1).max(1.0) as usize).min(MAX_OCTAVES);
    let (px, py) = (uniform(request, 2) as f64, uniform(request, 3) as f64);
    let z = uniform(request, 4) as f64;
    let zoom = uniform(request, 5) as f64;
    let zoom = if zoom == 0.0 { 1.0 } else { zoom };
    let colored = uniform(request, 6) > 0.5;
    let random = uniform(request, 7) > 0.5;
    let aspect = request.resolution.aspect();
    let z_cell = (z * 1000.0).round() as i64;

    let channel = |channel_seed: i64, x: u32, y: u32, u: f64, v: f64| -> f32 {
        if random {
            hash(channel_seed, x as i64, y as i64, z_cell)
        } else {
            let nx = (u - 0.5) * aspect * NOISE_BASE_FREQUENCY / zoom + px;
            let ny = (v - 0.5) * NOISE_BASE_FREQUENCY / zoom + py;
            fractal_noise(channel_seed, octaves, nx, ny, z) as f32
        }
    };

    shade(request.resolution, |x, y, u, v| {
        if colored {
            [
                channel(seed, x, y, u, v),
                channel(seed.wrapping_add(1), x, y, u, v),
                channel(seed.wrapping_add(2), x, y, u, v),
                1.0,
            ]
        } else {
            let l = channel(seed, x, y, u, v);
            [l, l, l, 1.0]
        }
    })
}

// ── Camera ──

fn render_camera(request: &RenderRequest, input: Option<&Texture>) -> Vec<f32> {
    let orientation = uniform(request, 0).round() as u32;
    let mirrored = uniform(request, 1) > 0.5;
    shade(request.resolution, |_, _, u, v| {
        let Some(input) = input else {
            return CLEAR;
        };
        let u = if mirrored { 1.0 - u } else { u };
        // Output space -> sensor space
        let (su, sv) = match orientation {
            1 => (v, 1.0 - u),
            2 => (1.0 - v, u),
            4 => (1.0 - u, 1.0 - v),
            _ => (u, v),
        };
        input.sample(su, sv, ExtendMode::Hold)
    })
}

// ── Levels ──

fn render_levels(request: &RenderRequest, input: Option<&Texture>) -> Vec<f32> {
    let brightness = uniform(request, 0);
    let darkness = uniform(request, 1);
    let contrast = uniform(request, 2);
    let gamma = uniform(request, 3);
    let inverted = uniform(request, 4) > 0.5;
    let opacity = uniform(request, 5);
    let gamma = if gamma > 0.0 { gamma } else { 1.0 };

    shade(request.resolution, |_, _, u, v| {
        let Some(input) = input else {
            return CLEAR;
        };
        let c = input.sample(u, v, ExtendMode::Hold);
        let mut out = [0.0; 4];
        for i in 0..3 {
            let mut x = c[i];
            if darkness < 1.0 {
                x = (x - darkness) / (1.0 - darkness);
            }
            x *= brightness;
            x = (x - 0.5) * (1.0 + contrast) + 0.5;
            x = x.max(0.0).powf(1.0 / gamma);
            if inverted {
                x = 1.0 - x;
            }
            out[i] = x;
        }
        out[3] = c[3] * opacity;
        out
    })
}

// ── Blends ──

fn blend(mode: BlendingMode, bottom: Rgba, top: Rgba) -> Rgba {
    let over = |top: Rgba, bottom: Rgba| -> Rgba {
        let a = top[3] + bottom[3] * (1.0 - top[3]);
        let mut out = [0.0, 0.0, 0.0, a];
        for i in 0..3 {
            out[i] = top[i] * top[3] + bottom[i] * (1.0 - top[3]);
        }
        out
    };
    let per_channel = |f: fn(f32, f32) -> f32| -> Rgba {
        [
            f(bottom[0], top[0]),
            f(bottom[1], top[1]),
            f(bottom[2], top[2]),
            bottom[3].max(top[3]),
        ]
    };
    match mode {
        BlendingMode::Over => over(top, bottom),
        BlendingMode::Under => over(bottom, top),
        BlendingMode::Add => per_channel(|b, t| b + t),
        BlendingMode::Multiply => per_channel(|b, t| b * t),
        BlendingMode::Difference => per_channel(|b, t| (b - t).abs()),
        BlendingMode::Subtract => per_channel(|b, t| b - t),
        BlendingMode::Maximum => per_channel(f32::max),
        BlendingMode::Minimum => per_channel(f32::min),
    }
}

fn render_blends(request: &RenderRequest, inputs: &[Option<&Texture>]) -> Vec<f32> {
    let index = uniform(request, 0).round().max(0.0) as u32;
    let mode = BlendingMode::ALL
        .iter()
        .copied()
        .find(|m| m.index() == index)
        .unwrap_or_default();
    let layers: Vec<&Texture> = inputs.iter().flatten().copied().collect();

    shade(request.resolution, |_, _, u, v| {
        let mut layers = layers.iter();
        let Some(first) = layers.next() else {
            return CLEAR;
        };
        let mut acc = first.sample(u, v, ExtendMode::Zero);
        for layer in layers {
            acc = blend(mode, acc, layer.sample(u, v, ExtendMode::Zero));
        }
        acc
    })
}

// ── Resample ──

fn fill_mode(index: f32) -> FillMode {
    let index = index.round().max(0.0) as u32;
    FillMode::ALL
        .iter()
        .copied()
        .find(|m| m.index() == index)
        .unwrap_or_default()
}

fn extend_mode(index: f32) -> ExtendMode {
    let index = index.round().max(0.0) as u32;
    ExtendMode::ALL
        .iter()
        .copied()
        .find(|m| m.index() == index)
        .unwrap_or_default()
}

fn render_resample(request: &RenderRequest, input: Option<&Texture>) -> Vec<f32> {
    let fill = fill_mode(uniform(request, 0));
    let extend = extend_mode(uniform(request, 1));
    let out = request.resolution;

    shade(out, |_, _, u, v| {
        let Some(input) = input else {
            return CLEAR;
        };
        let (iw, ih) = (input.resolution.width as f64, input.resolution.height as f64);
        let (ow, oh) = (out.width as f64, out.height as f64);
        let scale = match fill {
            FillMode::Fill => return input.sample(u, v, extend),
            FillMode::AspectFit => (ow / iw).min(oh / ih),
            FillMode::AspectFill => (ow / iw).max(oh / ih),
        };
        // Content rectangle centered in the output
        let (cw, ch) = (iw * scale, ih * scale);
        let su = (u * ow - (ow - cw) / 2.0) / cw;
        let sv = (v * oh - (oh - ch) / 2.0) / ch;
        input.sample(su, sv, extend)
    })
}

impl GpuBackend for SoftwareBackend {
    fn render(&mut self, request: &RenderRequest) -> Result<Artifact, BackendError> {
        if self.failing.contains(request.shader) {
            return Err(BackendError::Render {
                shader: request.shader,
                message: "injected failure".to_string(),
            });
        }
        if request.resolution.is_empty() {
            return Err(BackendError::Render {
                shader: request.shader,
                message: format!("empty resolution {}", request.resolution),
            });
        }

        let data = {
            let inputs = self.inputs(request)?;
            let first = inputs.first().copied().flatten();
            match request.shader {
                shaders::NOISE => render_noise(request),
                shaders::CAMERA => render_camera(request, first),
                shaders::LEVELS => render_levels(request, first),
                shaders::BLENDS => render_blends(request, &inputs),
                shaders::OUTPUT => shade(request.resolution, |_, _, u, v| {
                    first.map_or(CLEAR, |t| t.sample(u, v, ExtendMode::Hold))
                }),
                shaders::RESAMPLE => render_resample(request, first),
                other => return Err(BackendError::UnknownShader(other.to_string())),
            }
        };

        *self
            .render_counts
            .entry(request.shader.to_string())
            .or_insert(0) += 1;
        Ok(self.store(request.resolution, request.format, data))
    }

    fn upload(&mut self, frame: &FrameBuffer, format: PixelFormat) -> Result<Artifact, BackendError> {
        if !frame.is_consistent() {
            return Err(BackendError::Upload(format!(
                "{} channels for a {}x{} frame",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }
        self.uploads += 1;
        Ok(self.store(frame.resolution(), format, frame.data.clone()))
    }

    fn read_normalized(&self, artifact: &Artifact) -> Option<Vec<f32>> {
        self.textures.get(&artifact.texture).map(|t| t.data.clone())
    }

    fn release(&mut self, artifact: &Artifact) {
        self.textures.remove(&artifact.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(shader: &'static str, uniforms: Vec<f32>, inputs: Vec<Option<Artifact>>) -> RenderRequest {
        RenderRequest {
            shader,
            uniforms,
            inputs,
            resolution: Resolution::new(8, 4),
            format: PixelFormat::Rgba32Float,
        }
    }

    fn noise_uniforms(seed: f32) -> Vec<f32> {
        vec![seed, 7.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    }

    #[test]
    fn test_noise_is_deterministic_per_seed() {
        let mut backend = SoftwareBackend::new();
        let a = backend.render(&request(shaders::NOISE, noise_uniforms(0.0), vec![])).unwrap();
        let b = backend.render(&request(shaders::NOISE, noise_uniforms(0.0), vec![])).unwrap();
        let c = backend.render(&request(shaders::NOISE, noise_uniforms(1.0), vec![])).unwrap();

        let (a, b, c) = (
            backend.read_normalized(&a).unwrap(),
            backend.read_normalized(&b).unwrap(),
            backend.read_normalized(&c).unwrap(),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_blend_skips_empty_slots() {
        let mut backend = SoftwareBackend::new();
        let red = backend
            .upload(&FrameBuffer::solid(8, 4, [1.0, 0.0, 0.0, 1.0]), PixelFormat::Rgba32Float)
            .unwrap();
        let out = backend
            .render(&request(shaders::BLENDS, vec![0.0], vec![Some(red), None]))
            .unwrap();
        let data = backend.read_normalized(&out).unwrap();
        assert_eq!(&data[..4], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_blend_modes() {
        let bottom = [0.5, 0.2, 1.0, 1.0];
        let top = [0.25, 0.4, 0.5, 1.0];
        assert_eq!(blend(BlendingMode::Over, bottom, top), top);
        assert_eq!(blend(BlendingMode::Under, bottom, top), bottom);
        let product = blend(BlendingMode::Multiply, bottom, top);
        assert_eq!((product[0], product[2], product[3]), (0.125, 0.5, 1.0));
        assert_eq!(blend(BlendingMode::Maximum, bottom, top), [0.5, 0.4, 1.0, 1.0]);
        assert_eq!(blend(BlendingMode::Difference, bottom, top)[0], 0.25);
    }

    #[test]
    fn test_levels_default_is_identity() {
        let mut backend = SoftwareBackend::new();
        let src = backend
            .upload(&FrameBuffer::solid(8, 4, [0.25, 0.5, 0.75, 1.0]), PixelFormat::Rgba32Float)
            .unwrap();
        let out = backend
            .render(&request(
                shaders::LEVELS,
                vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
                vec![Some(src)],
            ))
            .unwrap();
        assert_eq!(&backend.read_normalized(&out).unwrap()[..4], &[0.25, 0.5, 0.75, 1.0]);

        let inverted = backend
            .render(&request(
                shaders::LEVELS,
                vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.5],
                vec![Some(src)],
            ))
            .unwrap();
        assert_eq!(&backend.read_normalized(&inverted).unwrap()[..4], &[0.75, 0.5, 0.25, 0.5]);
    }

    #[test]
    fn test_resample_aspect_fit_letterboxes() {
        let mut backend = SoftwareBackend::new();
        // 2x2 white into 8x4: content is 4x4 in the middle
        let src = backend
            .upload(&FrameBuffer::solid(2, 2, [1.0; 4]), PixelFormat::Rgba32Float)
            .unwrap();
        let out = backend
            .resample(&src, Resolution::new(8, 4), FillMode::AspectFit, ExtendMode::Zero)
            .unwrap();
        assert_eq!(out.resolution, Resolution::new(8, 4));
        let data = backend.read_normalized(&out).unwrap();
        // Column 0 is outside the content, column 4 inside
        assert_eq!(&data[0..4], &[0.0; 4]);
        assert_eq!(&data[16..20], &[1.0; 4]);
    }

    #[test]
    fn test_camera_portrait_rotates() {
        let mut backend = SoftwareBackend::new();
        // 2x1 sensor frame: left red, right blue
        let frame = FrameBuffer::new(2, 1, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
        let src = backend.upload(&frame, PixelFormat::Rgba32Float).unwrap();
        let out = backend
            .render(&RenderRequest {
                shader: shaders::CAMERA,
                uniforms: vec![1.0, 0.0],
                inputs: vec![Some(src)],
                resolution: Resolution::new(1, 2),
                format: PixelFormat::Rgba32Float,
            })
            .unwrap();
        let data = backend.read_normalized(&out).unwrap();
        // Top row samples the left of the sensor
        assert_eq!(&data[0..4], &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(&data[4..8], &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_failure_injection_and_counts() {
        let mut backend = SoftwareBackend::new();
        backend.fail_shader(shaders::NOISE);
        assert!(matches!(
            backend.render(&request(shaders::NOISE, noise_uniforms(0.0), vec![])),
            Err(BackendError::Render { .. })
        ));
        assert_eq!(backend.render_count(shaders::NOISE), 0);

        backend.clear_failures();
        backend.render(&request(shaders::NOISE, noise_uniforms(0.0), vec![])).unwrap();
        assert_eq!(backend.render_count(shaders::NOISE), 1);
        assert!(matches!(
            backend.render(&request("contentGeneratorSparklePIX", vec![], vec![])),
            Err(BackendError::UnknownShader(_))
        ));
    }

    #[test]
    fn test_release_and_unknown_texture() {
        let mut backend = SoftwareBackend::new();
        let src = backend
            .upload(&FrameBuffer::solid(2, 2, [1.0; 4]), PixelFormat::Rgba8)
            .unwrap();
        assert_eq!(backend.live_textures(), 1);
        backend.release(&src);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(
            backend.render(&request(shaders::OUTPUT, vec![], vec![Some(src)])),
            Err(BackendError::UnknownTexture(src.texture))
        );
    }

    #[test]
    fn test_upload_rejects_inconsistent_frame() {
        let mut backend = SoftwareBackend::new();
        let frame = FrameBuffer::new(2, 2, vec![0.0; 3]);
        assert!(matches!(
            backend.upload(&frame, PixelFormat::Rgba8),
            Err(BackendError::Upload(_))
        ));
    }
}
