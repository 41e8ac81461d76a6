// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrolling-text demo.
//!
//! The caller thread animates a banner's `offset` property with an eased
//! ramp while the render thread runs a headless engine at 60 Hz. At the
//! end it prints the run summary and, with a path argument, writes a
//! Chrome trace of the run.
//!
//! ```text
//! RUST_LOG=basalt_core=debug cargo run -p marquee -- /tmp/marquee-trace.json
//! ```

use std::error::Error;
use std::time::{Duration, Instant};

use basalt_backend_headless::{HeadlessBackend, HeadlessConfig, HeadlessGpu, Timeline};
use basalt_core::ledger::{ResourceDescriptor, ResourceKind};
use basalt_core::mode::ModeRequest;
use basalt_core::runloop::RenderLoop;
use basalt_debug::FrameRecorder;
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

const BANNER: &str = "ALL ABOARD THE BASALT EXPRESS ... ";
const RUN_DURATION: Duration = Duration::from_secs(3);

/// Smoothstep ramp, flat at both ends.
fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let timeline = Timeline::new();
    let backend = HeadlessBackend::new(
        HeadlessConfig {
            attach_latency: Duration::from_millis(5),
            vsync_period: Duration::from_millis(16),
            ..HeadlessConfig::default()
        },
        timeline.clone(),
    );
    let gpu = HeadlessGpu::new(timeline);
    let mut engine = RenderLoop::new(backend, gpu);

    let recorder = FrameRecorder::new();
    engine.set_frame_observer(recorder.observer());

    let banner = engine.store_mut().create_object("banner");
    let _text = engine
        .store_mut()
        .register_property(banner, "text", BANNER.into());
    let offset = engine
        .store_mut()
        .register_property(banner, "offset", 0.0_f32.into());
    let offset_id = offset.property();

    // The glyph atlas a real renderer would sample the banner from.
    let _atlas = engine
        .ledger_mut()
        .allocate(ResourceKind::TextureAtlas, ResourceDescriptor::new(512, 512, 1))?;

    let handle = engine.spawn(
        ModeRequest {
            width: 1920,
            height: 1080,
            refresh_hz: 60,
            fullscreen: true,
        },
        move |store, frame| {
            let x = store.float(banner, offset_id).unwrap_or(0.0);
            trace!(frame = frame.frame_index, x, "drew banner");
        },
    )?;
    let mode = handle.mode();
    info!(?mode, "engine running");

    // Animate on the caller thread; writes are collapsed per frame by the
    // render side, so the step rate here does not need to match vsync.
    let started = Instant::now();
    let travel = mode.width as f32;
    loop {
        let elapsed = started.elapsed();
        if elapsed >= RUN_DURATION {
            break;
        }
        let t = elapsed.as_secs_f32() / RUN_DURATION.as_secs_f32();
        offset.set_float(ease_in_out(t) * travel);
        std::thread::sleep(Duration::from_millis(8));
    }

    handle.stop_and_join()?;

    println!("{}", recorder.summary());

    if let Some(path) = std::env::args().nth(1) {
        let mut file = std::fs::File::create(&path)?;
        basalt_debug::chrome::export(&recorder, &mut file)?;
        println!("trace written to {path}");
    }
    Ok(())
}
