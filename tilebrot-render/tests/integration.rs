use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tilebrot_core::{Complex, EscapeFunction, EscapeParams, EscapeResult, Mandelbrot, RenderConfig};
use tilebrot_render::{
    partition, ChannelListener, ClassicPalette, ColorMapper, Engine, Framebuffer, Intent,
    PassState, TileBlit,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn scenario_config() -> RenderConfig {
    RenderConfig::from_json_str(
        r#"{
            "width": 200,
            "height": 200,
            "tile_size": 50,
            "max_iterations": 50,
            "bound_squared": 4.0,
            "center_re": 0.0,
            "center_im": 0.0,
            "plane_height": 4.0,
            "threads": 4
        }"#,
    )
    .unwrap()
}

fn engine_with<E, C>(config: RenderConfig, escape: E, colors: C) -> Engine<E, C>
where
    E: EscapeFunction + 'static,
    C: ColorMapper + 'static,
{
    init_tracing();
    Engine::new(config, escape, colors).unwrap()
}

#[test]
fn end_to_end_scenario() {
    use EscapeResult::{Bounded, Escaped};

    let config = scenario_config();
    let params = config.escape_params().unwrap();
    let mut engine = engine_with(config, Mandelbrot, ClassicPalette::default());

    let tiles = partition(engine.viewport(), engine.config().tile_size);
    assert_eq!(tiles.len(), 16);
    let first = tiles.iter().find(|t| t.x == 0 && t.y == 0).unwrap();
    assert_eq!(first.plane_origin, Complex::new(-2.0, -2.0));
    let corner = first.plane_origin;
    assert_eq!(Mandelbrot.evaluate(corner, &params), Escaped(0));

    let handle = engine.draw();
    assert_eq!(handle.tiles_total(), 16);
    assert_eq!(handle.wait(), PassState::Completed);
    assert_eq!(engine.progress(), (16, 16));

    let fb = engine.framebuffer().snapshot();
    let palette = ClassicPalette::default();
    assert_eq!(fb.pixel(0, 0), Some(palette.color_of(Escaped(0))));
    assert_eq!(fb.pixel(100, 100), Some(palette.color_of(Bounded)));
    // Every pixel of a 200 / 50 grid is covered, so nothing stays transparent.
    assert!(fb.pixels.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn draw_is_idempotent() {
    let config = RenderConfig {
        tile_size: 32,
        max_iterations: 100,
        ..RenderConfig::with_size(160, 96)
    };
    let mut engine = engine_with(config, Mandelbrot::default(), ClassicPalette::default());

    engine.draw().wait();
    let first = engine.framebuffer().snapshot();
    engine.draw().wait();
    let second = engine.framebuffer().snapshot();
    assert_eq!(first, second, "renders must be deterministic");
}

#[test]
fn remainder_strip_is_left_untouched() {
    let config = RenderConfig {
        tile_size: 32,
        ..RenderConfig::with_size(100, 70)
    };
    let mut engine = engine_with(config, Mandelbrot::default(), ClassicPalette::default());
    assert_eq!(engine.draw().wait(), PassState::Completed);

    // 3 × 2 tiles cover [0, 96) × [0, 64); the strips beyond stay transparent.
    let fb = engine.framebuffer().snapshot();
    for (x, y) in [(96, 0), (99, 40), (0, 64), (50, 69), (99, 69)] {
        assert_eq!(fb.pixel(x, y), Some([0, 0, 0, 0]), "pixel ({x}, {y})");
    }
    for (x, y) in [(0, 0), (95, 63), (95, 0), (0, 63)] {
        let alpha = fb.pixel(x, y).map(|px| px[3]);
        assert_eq!(alpha, Some(255), "pixel ({x}, {y})");
    }
}

#[test]
fn accelerator_matches_brute_force_on_uniform_input() {
    let constant = |_: Complex, _: &EscapeParams| EscapeResult::Escaped(5);
    let accelerated_config = RenderConfig {
        tile_size: 25,
        ..RenderConfig::with_size(100, 100)
    };
    let brute_config = RenderConfig {
        accelerate: false,
        ..accelerated_config.clone()
    };

    let mut accelerated = engine_with(accelerated_config, constant, ClassicPalette::default());
    let mut brute = engine_with(brute_config, constant, ClassicPalette::default());

    let fast = accelerated.draw();
    let slow = brute.draw();
    fast.wait();
    slow.wait();

    assert_eq!(fast.summary().unwrap().tiles_accelerated, 16);
    assert_eq!(slow.summary().unwrap().tiles_accelerated, 0);
    assert_eq!(
        accelerated.framebuffer().snapshot(),
        brute.framebuffer().snapshot()
    );
}

#[test]
fn superseded_writes_never_follow_newer_ones() {
    let slow = |c: Complex, params: &EscapeParams| {
        std::thread::sleep(Duration::from_micros(20));
        Mandelbrot.evaluate(c, params)
    };
    let config = RenderConfig {
        tile_size: 16,
        max_iterations: 64,
        accelerate: false,
        threads: 4,
        ..RenderConfig::with_size(64, 64)
    };
    let mut engine = engine_with(config, slow, ClassicPalette::default());

    let writes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&writes);
    engine.set_tile_listener(Some(Arc::new(move |blit: &TileBlit<'_>| {
        sink.lock().unwrap().push((blit.generation, blit.x, blit.y));
    })));

    let first = engine.draw();
    std::thread::sleep(Duration::from_millis(2));
    let second = engine.pan(40.0, 24.0).unwrap();
    let third = engine.zoom_in(2.0).unwrap();

    assert_eq!(third.wait(), PassState::Completed);
    assert_eq!(first.wait(), PassState::Superseded);
    assert_eq!(second.wait(), PassState::Superseded);

    let writes = writes.lock().unwrap();
    let mut newest = HashMap::new();
    for &(generation, x, y) in writes.iter() {
        let seen = newest.entry((x, y)).or_insert(generation);
        assert!(
            generation >= *seen,
            "{generation} landed after {seen} at ({x}, {y})"
        );
        *seen = generation;
    }

    let final_writes = writes
        .iter()
        .filter(|(generation, _, _)| *generation == third.generation())
        .count();
    assert_eq!(final_writes, 16);
}

#[test]
fn zoom_round_trip_restores_plane_height() {
    let config = RenderConfig {
        tile_size: 20,
        ..RenderConfig::with_size(80, 60)
    };
    let mut engine = engine_with(config, Mandelbrot::default(), ClassicPalette::default());
    let original = engine.viewport().plane_height;

    for factor in [1.5, 2.0, 7.25] {
        engine.zoom_in(factor).unwrap();
        engine.zoom_out(factor).unwrap();
        let h = engine.viewport().plane_height;
        assert!((h - original).abs() < 1e-12, "factor {factor}: {h}");
    }

    let handle = engine.draw();
    handle.wait();
    let finished = handle.summary().unwrap();
    assert!((finished.plane_height - original).abs() < 1e-12);
}

#[test]
fn faulting_tiles_keep_previous_contents() {
    let faulty = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&faulty);
    let escape = move |c: Complex, params: &EscapeParams| {
        if flag.load(Ordering::Relaxed) && c.re < 0.0 && c.im < 0.0 {
            panic!("synthetic evaluation fault");
        }
        Mandelbrot.evaluate(c, params)
    };
    let config = RenderConfig {
        tile_size: 16,
        max_iterations: 64,
        ..RenderConfig::with_size(64, 64)
    };
    let mut engine = engine_with(config, escape, ClassicPalette::default());

    engine.draw().wait();
    let before = engine.framebuffer().snapshot();

    // Paint over everything so we can tell which tiles were rewritten.
    engine.framebuffer().lock().fill([1, 2, 3, 4]);
    faulty.store(true, Ordering::Relaxed);
    let handle = engine.draw();
    assert_eq!(handle.wait(), PassState::Completed);
    assert_eq!(handle.summary().unwrap().tiles_faulted, 4);

    let after = engine.framebuffer().snapshot();
    // The upper-left quadrant faulted and kept the fill.
    assert_eq!(after.pixel(5, 5), Some([1, 2, 3, 4]));
    assert_eq!(after.pixel(31, 31), Some([1, 2, 3, 4]));
    // The other quadrants were rendered normally.
    for (x, y) in [(40, 5), (5, 40), (40, 40), (63, 63)] {
        assert_eq!(after.pixel(x, y), before.pixel(x, y), "pixel ({x}, {y})");
    }
}

#[test]
fn host_buffer_tracks_engine_via_channel() {
    let config = RenderConfig {
        tile_size: 16,
        max_iterations: 64,
        ..RenderConfig::with_size(96, 64)
    };
    let mut engine = engine_with(config, Mandelbrot::default(), ClassicPalette::default());
    let (listener, rx) = ChannelListener::new();
    engine.set_tile_listener(Some(Arc::new(listener)));

    let mut host = Framebuffer::new(96, 64);
    for intent in [
        Intent::ZoomStep,
        Intent::Click { x: 20.0, y: 50.0 },
        Intent::Wheel { delta: -120.0 },
    ] {
        let handle = engine.apply_intent(intent).unwrap().unwrap();
        assert_eq!(handle.wait(), PassState::Completed);
        for update in rx.try_iter() {
            if engine.generations().is_current(update.generation) {
                assert!(update.apply_to(&mut host));
            }
        }
        assert_eq!(host, engine.framebuffer().snapshot(), "after {intent:?}");
    }
}

#[test]
fn summary_listener_reports_each_pass() {
    let config = RenderConfig {
        tile_size: 16,
        ..RenderConfig::with_size(48, 32)
    };
    let mut engine = engine_with(config, Mandelbrot::default(), ClassicPalette::default());
    let heights = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heights);
    engine.set_summary_listener(Some(Arc::new(move |summary: &tilebrot_render::RenderSummary| {
        let entry = (summary.tiles_total, summary.plane_height);
        sink.lock().unwrap().push(entry);
    })));

    engine.draw().wait();
    engine.zoom_in(2.0).unwrap().wait();

    assert_eq!(*heights.lock().unwrap(), vec![(6, 4.0), (6, 2.0)]);
}

#[test]
fn reconfigured_bound_changes_the_image() {
    let config = RenderConfig {
        tile_size: 25,
        max_iterations: 64,
        ..RenderConfig::with_size(100, 100)
    };
    let mut engine = engine_with(config, Mandelbrot, ClassicPalette::default());
    engine.draw().wait();
    let narrow = engine.framebuffer().snapshot();

    let mut config = engine.config().clone();
    config.bound_squared = 100.0;
    engine.configure(config).unwrap();
    engine.draw().wait();
    let wide = engine.framebuffer().snapshot();
    assert_ne!(narrow, wide);

    // Matches a fresh engine built with the wide bound from the start.
    let fresh_config = engine.config().clone();
    let mut fresh = engine_with(fresh_config, Mandelbrot, ClassicPalette::default());
    fresh.draw().wait();
    assert_eq!(fresh.framebuffer().snapshot(), wide);
}
