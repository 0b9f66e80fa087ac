//! Headless pixgraph host
//!
//! Builds a small demo graph on the software backend, feeds it from a mock
//! camera and drives it with the frame clock for a few seconds, logging what
//! each tick recomputed.

use anyhow::Context;
use pixgraph::{
    capture::{CaptureDevice, FrameBuffer, MockCaptureDevice, MockPermission},
    config::EngineConfig,
    graph::{
        nodes::{BlendsNode, CameraNode, LevelsNode, NoiseNode, OutputNode},
        BlendingMode, FrameClock, RenderGraph,
    },
    types::{Point2, Resolution},
    SoftwareBackend,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long the demo runs
const RUN_TIME: Duration = Duration::from_secs(3);

/// Noise seed advances this often
const SEED_PERIOD: u64 = 30;

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load_or_default();
    config.validate().context("invalid engine config")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting pixgraph host at {} fps, {} textures",
        config.fps_max,
        config.default_resolution
    );

    let camera_frame = FrameBuffer::solid(64, 48, [0.2, 0.6, 0.9, 1.0]);
    let device: Arc<dyn CaptureDevice> = Arc::new(
        MockCaptureDevice::with_permission(MockPermission::Grant)
            .with_streaming(camera_frame, config.frame_interval()),
    );

    let mut clock = FrameClock::new(config.fps_max);
    let mut graph = RenderGraph::new(config.clone(), SoftwareBackend::new())
        .with_capture_device(device.clone());

    // noise → levels ─┐
    //                 ├→ blends → output
    //          camera ┘
    let noise = graph.add_node(NoiseNode::new(config.default_resolution));
    let levels = graph.add_node(LevelsNode::new());
    let camera = graph.add_node(CameraNode::new(device));
    let blends = graph.add_node(BlendsNode::new(2).with_mode(BlendingMode::Multiply));
    let output = graph.add_node(OutputNode::new());

    graph.connect(noise, levels, 0)?;
    graph.connect(levels, blends, 0)?;
    graph.connect(camera, blends, 1)?;
    graph.connect(blends, output, 0)?;
    graph.set_param(levels, "contrast", 0.25)?;

    let started = Instant::now();
    while started.elapsed() < RUN_TIME {
        let now = clock.wait();
        let frame = clock.frames();
        if frame % SEED_PERIOD == 0 {
            graph.set_param(noise, "seed", (frame / SEED_PERIOD) as i64)?;
        }

        let report = graph.tick_at(now);
        if !report.is_idle() {
            tracing::debug!(
                "Tick {}: recomputed {:?}, {} events",
                report.tick,
                report.recomputed(),
                report.events_processed
            );
        }
        if !report.failed().is_empty() {
            tracing::warn!("Tick {}: failed {:?}", report.tick, report.failed());
        }
    }

    match graph.extract_pixels(output) {
        Some(pixels) => {
            let center = pixels.pixel_uv(Point2::new(0.5, 0.5));
            tracing::info!(
                "Output {}: center {:?}, average {:?}",
                pixels.resolution(),
                center,
                pixels.average()
            );
        }
        None => tracing::warn!("Output has not resolved (camera state {:?})", graph.camera_state(camera)),
    }

    tracing::info!(
        "Ran {} ticks, {} renders, camera at {}",
        graph.tick_count(),
        graph.backend().total_renders(),
        graph
            .camera(camera)
            .and_then(|c| c.resolution())
            .unwrap_or(Resolution::new(0, 0))
    );
    Ok(())
}
