use glam::Vec2;
use image::RgbaImage;
use tracing::debug;

use crate::error::{BakeError, Result};

/// Normalized placement rectangle inside an atlas, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl AtlasRect {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn overlaps(&self, other: &AtlasRect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Cell placements for one atlas.
///
/// `rects[i]` is the placement of input `i` -- the index alignment with the
/// bitmap list handed to [`pack_layout`] is the contract the UV remapper
/// depends on. The layout is computed once (from the albedo cells) and
/// reused to composite every other channel.
#[derive(Debug, Clone)]
pub struct AtlasLayout {
    /// Square canvas side in pixels.
    pub size: u32,
    pub rects: Vec<AtlasRect>,
}

/// Free region of the canvas during packing, in pixels.
#[derive(Clone)]
struct FreeRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Pixel-space placement before normalization.
struct Placement {
    input_idx: usize,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Pack `sizes` (width, height per input) onto the smallest power-of-two
/// square canvas that fits, keeping at least `padding` pixels between any
/// two cells.
///
/// Guillotine best-short-side-fit, inputs placed in decreasing size order
/// but reported at their original indices. The canvas doubles until
/// everything fits; exceeding `max_size` is a fatal
/// [`BakeError::PackingOverflow`] -- a partial atlas is never returned.
pub fn pack_layout(sizes: &[(u32, u32)], padding: u32, max_size: u32) -> Result<AtlasLayout> {
    if sizes.is_empty() {
        return Err(BakeError::Configuration(
            "atlas packer called with no input textures".into(),
        ));
    }

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let max_a = sizes[a].0.max(sizes[a].1);
        let max_b = sizes[b].0.max(sizes[b].1);
        max_b.cmp(&max_a)
    });

    let largest = sizes[order[0]];
    let mut canvas = largest
        .0
        .max(largest.1)
        .saturating_add(padding)
        .next_power_of_two()
        .max(32);

    loop {
        if canvas > max_size {
            return Err(BakeError::PackingOverflow {
                required: canvas,
                max: max_size,
            });
        }
        if let Some(placements) = try_pack(&order, sizes, padding, canvas) {
            debug!(canvas, inputs = sizes.len(), "Atlas layout packed");
            return Ok(normalize(placements, sizes.len(), canvas));
        }
        canvas *= 2;
    }
}

fn try_pack(
    order: &[usize],
    sizes: &[(u32, u32)],
    padding: u32,
    canvas: u32,
) -> Option<Vec<Placement>> {
    let mut free_rects = vec![FreeRect {
        x: 0,
        y: 0,
        w: canvas,
        h: canvas,
    }];
    let mut placements = Vec::with_capacity(order.len());

    for &idx in order {
        let (w, h) = sizes[idx];
        // Reserve the spacing on the trailing edges; cells at the canvas
        // border need no margin there.
        let occupied_w = w + padding;
        let occupied_h = h + padding;

        let best = best_short_side_fit(&free_rects, occupied_w, occupied_h)?;
        let rect = free_rects.remove(best);

        placements.push(Placement {
            input_idx: idx,
            x: rect.x,
            y: rect.y,
            w,
            h,
        });

        split_free_rect(&mut free_rects, &rect, occupied_w, occupied_h);
    }

    Some(placements)
}

fn best_short_side_fit(free_rects: &[FreeRect], w: u32, h: u32) -> Option<usize> {
    let mut best_idx = None;
    let mut best_short_side = u32::MAX;

    for (i, rect) in free_rects.iter().enumerate() {
        if rect.w >= w && rect.h >= h {
            let short_side = (rect.w - w).min(rect.h - h);
            if short_side < best_short_side {
                best_short_side = short_side;
                best_idx = Some(i);
            }
        }
    }
    best_idx
}

fn split_free_rect(free_rects: &mut Vec<FreeRect>, rect: &FreeRect, w: u32, h: u32) {
    let right_w = rect.w - w;
    let below_h = rect.h - h;

    if right_w > 0 {
        free_rects.push(FreeRect {
            x: rect.x + w,
            y: rect.y,
            w: right_w,
            h,
        });
    }
    if below_h > 0 {
        free_rects.push(FreeRect {
            x: rect.x,
            y: rect.y + h,
            w: rect.w,
            h: below_h,
        });
    }
}

fn normalize(placements: Vec<Placement>, count: usize, canvas: u32) -> AtlasLayout {
    let scale = 1.0 / canvas as f32;
    let mut rects = vec![
        AtlasRect {
            min: Vec2::ZERO,
            max: Vec2::ZERO,
        };
        count
    ];
    for p in placements {
        rects[p.input_idx] = AtlasRect {
            min: Vec2::new(p.x as f32, p.y as f32) * scale,
            max: Vec2::new((p.x + p.w) as f32, (p.y + p.h) as f32) * scale,
        };
    }
    AtlasLayout { size: canvas, rects }
}

/// Composite cell bitmaps onto one atlas canvas according to `layout`.
///
/// `images` must be index-aligned with `layout.rects`; each image is
/// blitted unscaled at its rect's pixel origin (cells were already resized
/// to their rect dimensions upstream).
pub fn composite(images: &[&RgbaImage], layout: &AtlasLayout) -> RgbaImage {
    let size = layout.size;
    let mut atlas = RgbaImage::new(size, size);

    for (img, rect) in images.iter().zip(&layout.rects) {
        let x0 = (rect.min.x * size as f32).round() as u32;
        let y0 = (rect.min.y * size as f32).round() as u32;

        for y in 0..img.height() {
            for x in 0..img.width() {
                let ax = x0 + x;
                let ay = y0 + y;
                if ax < size && ay < size {
                    atlas.put_pixel(ax, ay, *img.get_pixel(x, y));
                }
            }
        }
    }

    atlas
}
