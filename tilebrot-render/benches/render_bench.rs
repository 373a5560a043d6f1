use criterion::{criterion_group, criterion_main, Criterion};

use tilebrot_core::{Complex, EscapeFunction, EscapeParams, Mandelbrot, RenderConfig};
use tilebrot_render::{resample_for_zoom, ClassicPalette, Engine, Framebuffer};

fn bench_full_frame_draw(c: &mut Criterion) {
    let mut engine = Engine::new(
        RenderConfig::with_size(640, 480),
        Mandelbrot::default(),
        ClassicPalette::default(),
    )
    .unwrap();

    c.bench_function("draw_640x480", |b| {
        b.iter(|| engine.draw().wait());
    });
}

fn bench_acceleration(c: &mut Criterion) {
    // Mostly exterior: large uniform tiles the accelerator can skip.
    let config = RenderConfig {
        center_re: -1.5,
        center_im: 1.5,
        plane_height: 1.0,
        tile_size: 32,
        ..RenderConfig::with_size(512, 512)
    };
    let mut group = c.benchmark_group("exterior_512x512");
    for accelerate in [true, false] {
        let config = RenderConfig {
            accelerate,
            ..config.clone()
        };
        let mut engine =
            Engine::new(config, Mandelbrot::default(), ClassicPalette::default()).unwrap();
        let name = if accelerate {
            "accelerated"
        } else {
            "brute_force"
        };
        group.bench_function(name, |b| b.iter(|| engine.draw().wait()));
    }
    group.finish();
}

fn bench_escape_throughput(c: &mut Criterion) {
    let params = EscapeParams::new(1000, 4.0).unwrap();
    let points: Vec<Complex> = (0..256)
        .map(|i| Complex::new(-0.75 + i as f64 * 1e-4, 0.1))
        .collect();

    c.bench_function("evaluate_256_points_1000iter", |b| {
        b.iter(|| {
            points
                .iter()
                .filter(|&&p| Mandelbrot.evaluate(p, &params).is_bounded())
                .count()
        });
    });
}

fn bench_zoom_preview(c: &mut Criterion) {
    let mut source = Framebuffer::new(640, 480);
    source.fill([200, 40, 90, 255]);

    let mut group = c.benchmark_group("zoom_preview_640x480");
    for (name, scale) in [("in_1.5", 1.5), ("out_1.5", 1.0 / 1.5)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut fb = source.clone();
                resample_for_zoom(&mut fb, scale);
                fb
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_full_frame_draw,
    bench_acceleration,
    bench_escape_throughput,
    bench_zoom_preview
);
criterion_main!(benches);
