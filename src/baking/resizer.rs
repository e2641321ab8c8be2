use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use tracing::debug;

/// Sampling filter for [`resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Point,
    Bilinear,
}

/// Per-invocation resampling context shared read-only by all workers.
///
/// Everything a worker needs lives here; there is no cross-invocation
/// state, so independent resizes can run concurrently.
struct ResizeContext<'a> {
    src: &'a RgbaImage,
    ratio_x: f32,
    ratio_y: f32,
    new_w: u32,
    mode: FilterMode,
}

/// Resample `src` to `new_w` x `new_h`.
///
/// The output row range is partitioned across
/// `min(available_parallelism, new_h)` workers, each writing a disjoint
/// row chunk of the shared output buffer. Workers report through a
/// mutex-guarded completion counter; the calling thread sleeps in a short
/// loop until the counter reaches the worker count.
///
/// Bilinear sampling lerps each channel independently with no gamma
/// correction, so resizing to the source dimensions reproduces the input
/// exactly.
pub fn resize(src: &RgbaImage, new_w: u32, new_h: u32, mode: FilterMode) -> RgbaImage {
    assert!(new_w > 0 && new_h > 0, "resize target must be non-empty");

    let ctx = ResizeContext {
        src,
        ratio_x: src.width() as f32 / new_w as f32,
        ratio_y: src.height() as f32 / new_h as f32,
        new_w,
        mode,
    };

    let row_stride = new_w as usize * 4;
    let mut out = vec![0u8; row_stride * new_h as usize];

    let parallelism = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let workers = parallelism.min(new_h as usize).max(1);
    let rows_per_worker = (new_h as usize).div_ceil(workers);
    let spawned = (new_h as usize).div_ceil(rows_per_worker);

    debug!(new_w, new_h, workers = spawned, ?mode, "Resizing texture");

    let completed = Mutex::new(0usize);

    thread::scope(|s| {
        for (worker, chunk) in out.chunks_mut(rows_per_worker * row_stride).enumerate() {
            let ctx = &ctx;
            let completed = &completed;
            s.spawn(move || {
                let first_row = worker * rows_per_worker;
                for (i, row) in chunk.chunks_exact_mut(row_stride).enumerate() {
                    fill_row(ctx, (first_row + i) as u32, row);
                }
                *completed.lock().expect("completion counter poisoned") += 1;
            });
        }

        // Block until every worker has checked in.
        loop {
            let done = *completed.lock().expect("completion counter poisoned");
            if done == spawned {
                break;
            }
            thread::sleep(Duration::from_micros(100));
        }
    });

    RgbaImage::from_raw(new_w, new_h, out).expect("output buffer sized to dimensions")
}

fn fill_row(ctx: &ResizeContext<'_>, y: u32, row: &mut [u8]) {
    let fy = y as f32 * ctx.ratio_y;
    for x in 0..ctx.new_w {
        let fx = x as f32 * ctx.ratio_x;
        let pixel = match ctx.mode {
            FilterMode::Point => sample_point(ctx.src, fx, fy),
            FilterMode::Bilinear => sample_bilinear(ctx.src, fx, fy),
        };
        let offset = x as usize * 4;
        row[offset..offset + 4].copy_from_slice(&pixel);
    }
}

fn sample_point(src: &RgbaImage, fx: f32, fy: f32) -> [u8; 4] {
    let x = (fx as u32).min(src.width() - 1);
    let y = (fy as u32).min(src.height() - 1);
    src.get_pixel(x, y).0
}

fn sample_bilinear(src: &RgbaImage, fx: f32, fy: f32) -> [u8; 4] {
    let x0 = (fx.floor() as u32).min(src.width() - 1);
    let y0 = (fy.floor() as u32).min(src.height() - 1);
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(p00[c] as f32, p10[c] as f32, tx);
        let bottom = lerp(p01[c] as f32, p11[c] as f32, tx);
        out[c] = lerp(top, bottom, ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
