// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole-engine tests over the headless backend: two-thread property flow,
//! retirement-gated resource frees, and fatal-before-first-frame startup
//! errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use basalt_backend_headless::{
    HeadlessBackend, HeadlessConfig, HeadlessGpu, Timeline, TimelineEvent,
};
use basalt_core::error::{InitError, InputError};
use basalt_core::events::CallerEvent;
use basalt_core::input::{InputEvent, InputSource, RawEvent, RawEventKind, codes};
use basalt_core::ledger::{ResourceDescriptor, ResourceKind};
use basalt_core::mode::{DisplayMode, ModeRequest};
use basalt_core::runloop::RenderLoop;
use parking_lot::Mutex;

fn engine() -> (RenderLoop<HeadlessBackend, HeadlessGpu>, Timeline) {
    engine_with(HeadlessConfig {
        attach_latency: Duration::ZERO,
        ..HeadlessConfig::default()
    })
}

fn engine_with(config: HeadlessConfig) -> (RenderLoop<HeadlessBackend, HeadlessGpu>, Timeline) {
    let timeline = Timeline::new();
    let backend = HeadlessBackend::new(config, timeline.clone());
    let gpu = HeadlessGpu::new(timeline.clone());
    (RenderLoop::new(backend, gpu), timeline)
}

fn request() -> ModeRequest {
    ModeRequest {
        width: 1920,
        height: 1080,
        refresh_hz: 60,
        fullscreen: true,
    }
}

const ATLAS: ResourceDescriptor = ResourceDescriptor::new(256, 256, 4);

#[test]
fn resource_free_happens_after_frame_retirement() {
    let (mut engine, timeline) = engine();
    engine.initialize(&request()).expect("init succeeds");

    let atlas = engine
        .ledger_mut()
        .allocate(ResourceKind::TextureAtlas, ATLAS)
        .expect("allocation succeeds");
    let native = engine
        .ledger_mut()
        .native_id(atlas)
        .expect("live resource has a native id");
    engine.ledger_mut().mark_for_destroy(atlas);

    engine.iterate(&mut |_, _| {}).expect("frame 0");
    engine.iterate(&mut |_, _| {}).expect("frame 1");

    let retired = timeline
        .position(TimelineEvent::Retired(0))
        .expect("frame 0 retired");
    let freed = timeline
        .position(TimelineEvent::Freed(native))
        .expect("atlas freed");
    assert!(
        freed > retired,
        "free must come after retirement: {:?}",
        timeline.events()
    );
}

#[test]
fn atlas_growth_keeps_old_texture_sampleable_until_retirement() {
    let (mut engine, timeline) = engine();
    engine.initialize(&request()).expect("init succeeds");

    let atlas = engine
        .ledger_mut()
        .allocate(ResourceKind::TextureAtlas, ATLAS)
        .expect("allocation succeeds");
    let old_native = engine
        .ledger_mut()
        .native_id(atlas)
        .expect("live resource has a native id");

    let grown = engine
        .ledger_mut()
        .grow(atlas, ResourceDescriptor::new(512, 512, 4))
        .expect("growth succeeds");

    // The frame in between still references the old texture.
    assert!(engine.ledger_mut().native_id(atlas).is_some());

    engine.iterate(&mut |_, _| {}).expect("frame 0");
    engine.iterate(&mut |_, _| {}).expect("frame 1");

    assert!(engine.ledger_mut().is_live(grown));
    assert!(engine.ledger_mut().native_id(atlas).is_none());
    let retired = timeline
        .position(TimelineEvent::Retired(0))
        .expect("frame 0 retired");
    let freed = timeline
        .position(TimelineEvent::Freed(old_native))
        .expect("old atlas freed");
    assert!(freed > retired, "old atlas outlives the frame that used it");
}

#[test]
fn caller_thread_writes_reach_the_render_thread() {
    let (mut engine, _timeline) = engine();
    let object = engine.store_mut().create_object("marquee");
    let offset = engine
        .store_mut()
        .register_property(object, "offset", 0.0_f32.into());

    let offset_id = offset.property();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let handle = engine
        .spawn(request(), move |store, _info| {
            *sink.lock() = store.float(object, offset_id);
        })
        .expect("spawn succeeds");

    // Caller-side writes go through the queue, not the store.
    for step in 0..=10_u8 {
        assert!(offset.set_float(f32::from(step)), "binding is connected");
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if *seen.lock() == Some(10.0) {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "render thread never observed the final write"
        );
        std::thread::yield_now();
    }

    handle.stop_and_join().expect("loop exits cleanly");
}

#[test]
fn attach_timeout_is_fatal_before_the_first_frame() {
    let (engine, timeline) = engine_with(HeadlessConfig {
        never_attach: true,
        ..HeadlessConfig::default()
    });

    let err = engine
        .spawn(request(), |_, _| {})
        .expect_err("attach never confirms");
    assert!(matches!(err, InitError::ModeAttachTimeout { .. }));
    assert_eq!(
        timeline.count(|e| matches!(e, TimelineEvent::Submitted(_))),
        0,
        "no frame may be produced after a fatal init error"
    );
}

#[test]
fn shutdown_frees_every_allocation() {
    let (mut engine, timeline) = engine();
    engine.initialize(&request()).expect("init succeeds");

    for _ in 0..4 {
        let _ = engine
            .ledger_mut()
            .allocate(ResourceKind::GlyphCache, ResourceDescriptor::new(64, 64, 1))
            .expect("allocation succeeds");
    }
    engine.iterate(&mut |_, _| {}).expect("frame 0");
    engine.shutdown();

    let allocated = timeline.count(|e| matches!(e, TimelineEvent::Allocated(_)));
    let freed = timeline.count(|e| matches!(e, TimelineEvent::Freed(_)));
    assert_eq!(allocated, 4, "all four allocations recorded");
    assert_eq!(freed, allocated, "every allocation has a matching free");
}

#[test]
fn spawned_engine_reports_the_attached_mode() {
    let (engine, _timeline) = engine_with(HeadlessConfig {
        modes: vec![DisplayMode::new(1920, 1080, 50)],
        attach_latency: Duration::ZERO,
        ..HeadlessConfig::default()
    });
    let handle = engine.spawn(request(), |_, _| {}).expect("spawn succeeds");
    assert_eq!(
        handle.mode(),
        DisplayMode::new(1920, 1080, 50),
        "nearest-fit mode is reported to the caller"
    );
    handle.stop_and_join().expect("loop exits cleanly");
}

/// Input source replaying a fixed script once.
#[derive(Debug)]
struct ScriptedSource {
    script: Vec<RawEvent>,
}

impl InputSource for ScriptedSource {
    fn poll(&mut self, out: &mut Vec<RawEvent>) -> Result<(), InputError> {
        out.append(&mut self.script);
        Ok(())
    }
}

#[test]
fn pointer_input_flows_back_to_the_caller() {
    let (mut engine, _timeline) = engine();
    engine.set_input_source(Box::new(ScriptedSource {
        script: vec![
            RawEvent {
                kind: RawEventKind::Relative,
                code: codes::AXIS_X,
                value: 40,
            },
            RawEvent {
                kind: RawEventKind::Relative,
                code: codes::AXIS_Y,
                value: -25,
            },
            RawEvent {
                kind: RawEventKind::Sync,
                code: 0,
                value: 0,
            },
        ],
    }));
    let events = engine.events();
    engine.initialize(&request()).expect("init succeeds");
    engine.iterate(&mut |_, _| {}).expect("frame 0");

    let drained = events.drain();
    assert_eq!(drained.len(), 1, "moves coalesce into one event per frame");
    match &drained[0] {
        CallerEvent::Input(InputEvent::PointerMoved { x, y, dx, dy }) => {
            // The pointer starts centered in 1920x1080.
            assert_eq!((*x, *y), (1000, 515));
            assert_eq!((*dx, *dy), (40, -25));
        }
        other => panic!("expected a pointer move, got {other:?}"),
    }
}
