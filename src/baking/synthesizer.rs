use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::baking::resizer::{self, FilterMode};
use crate::baking::uv_bounds::SubmeshUvBounds;
use crate::error::BakeLog;
use crate::types::{ChannelKind, TextureData};

/// Largest dimension a synthesized composite may have on a side.
pub const MAX_TEXTURE_DIM: u32 = 16_384;

/// One channel-synthesis request for a texture group.
pub struct SynthesisRequest<'a> {
    pub kind: ChannelKind,
    /// Encoded source texture, absent when the material lacks the channel.
    pub source: Option<&'a TextureData>,
    pub bounds: &'a SubmeshUvBounds,
    pub is_tiling: bool,
    /// Target cell content size, before edge padding.
    pub cell_w: u32,
    pub cell_h: u32,
    /// Mip-safe border in pixels on each side.
    pub edge_px: u32,
    pub reconstruct_normal_z: bool,
}

impl SynthesisRequest<'_> {
    pub fn padded_w(&self) -> u32 {
        self.cell_w + 2 * self.edge_px
    }

    pub fn padded_h(&self) -> u32 {
        self.cell_h + 2 * self.edge_px
    }
}

/// Produce the working bitmap for one channel of one texture group, sized
/// exactly `cell + 2 * edge_px` per axis.
///
/// Standard groups get the source scaled into the cell; tiling groups get
/// an unwrapped composite that replicates the texture across the group's
/// UV bounds first. Both end with a wrap-around border so mip sampling at
/// cell edges stays seam-free.
///
/// All failure modes degrade to a neutral fill and log a warning; this
/// function never fails the bake.
pub fn synthesize(request: &SynthesisRequest<'_>, logs: &mut Vec<BakeLog>) -> RgbaImage {
    let neutral = request.kind.neutral_color();

    let decoded = match request.source {
        Some(source) => match source.decode() {
            Some(img) => Some(img),
            None => {
                let message = format!(
                    "{} texture is not readable, substituting neutral fill",
                    request.kind
                );
                warn!(channel = %request.kind, "Unreadable source texture");
                logs.push(BakeLog::warning(message));
                None
            }
        },
        None => None,
    };

    let Some(source) = decoded else {
        return neutral_fill(request.padded_w(), request.padded_h(), neutral);
    };

    let content = if request.is_tiling {
        match unwrap_tiling(&source, request.bounds) {
            Ok(composite) => composite,
            Err(required) => {
                let message = format!(
                    "{} composite would be {required}px (max {MAX_TEXTURE_DIM}), \
                     falling back to neutral fill at source resolution",
                    request.kind
                );
                warn!(channel = %request.kind, required, "Oversized tiling composite");
                logs.push(BakeLog::warning(message));
                neutral_fill(source.width(), source.height(), neutral)
            }
        }
    } else {
        source
    };

    // Normalize to the shared cell size before padding so every channel of
    // the group lands on identical dimensions.
    let mut cell = if content.dimensions() == (request.cell_w, request.cell_h) {
        content
    } else {
        resizer::resize(&content, request.cell_w, request.cell_h, FilterMode::Bilinear)
    };

    if request.kind == ChannelKind::Normal
        && request.reconstruct_normal_z
        && looks_two_channel(&cell)
    {
        debug!("Reconstructing Z for two-channel normal encoding");
        reconstruct_normal_z(&mut cell);
    }

    pad_wrap(&cell, request.edge_px)
}

/// Uniform fill at the given size.
pub fn neutral_fill(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(w.max(1), h.max(1), color)
}

/// Build the unwrapped composite for a tiling group: one central copy of
/// the source flanked by partial copies covering the UV overhang, so that
/// sampling the composite across its full extent reproduces the original
/// repetition.
///
/// Phase convention: column 0 of the composite corresponds to source
/// column `round(min_u * src_w)` wrapped, i.e. the composite spans UV
/// `[min, min + factor]` rather than being anchored at the unit square.
/// For bounds that sit entirely past an edge (e.g. `min_u > 0` with
/// `max_u > 1`) the two anchorings differ, but the remap pass shifts UVs
/// by the same `min` before normalizing, so they stay consistent.
///
/// Returns `Err(required_dimension)` when the composite would exceed
/// [`MAX_TEXTURE_DIM`] on a side.
fn unwrap_tiling(source: &RgbaImage, bounds: &SubmeshUvBounds) -> Result<RgbaImage, u32> {
    let (src_w, src_h) = source.dimensions();

    // Overhang in texture widths splits into whole tiles plus a fractional
    // remainder; the composite covers both exactly.
    let out_w = (src_w as f32 * bounds.width_factor()).round().max(1.0) as u32;
    let out_h = (src_h as f32 * bounds.height_factor()).round().max(1.0) as u32;

    let required = out_w.max(out_h);
    if required > MAX_TEXTURE_DIM {
        return Err(required);
    }

    // The composite spans UV [min, max]; pixel column x sits at source
    // column (x + min_u * src_w) wrapped, which lays out the tile copies
    // and fractional edges in one pass.
    let offset_x = (bounds.min_u * src_w as f32).round() as i64;
    let offset_y = (bounds.min_v * src_h as f32).round() as i64;

    Ok(RgbaImage::from_fn(out_w, out_h, |x, y| {
        let sx = wrap_index(x as i64 + offset_x, src_w);
        let sy = wrap_index(y as i64 + offset_y, src_h);
        *source.get_pixel(sx, sy)
    }))
}

/// Surround `content` with `edge_px` pixels of wrap-around border: border
/// pixels copy the opposite edge, keeping bilinear/mip sampling seamless
/// for textures that tile.
fn pad_wrap(content: &RgbaImage, edge_px: u32) -> RgbaImage {
    if edge_px == 0 {
        return content.clone();
    }

    let (w, h) = content.dimensions();
    let e = edge_px as i64;

    RgbaImage::from_fn(w + 2 * edge_px, h + 2 * edge_px, |x, y| {
        let sx = wrap_index(x as i64 - e, w);
        let sy = wrap_index(y as i64 - e, h);
        *content.get_pixel(sx, sy)
    })
}

fn wrap_index(i: i64, len: u32) -> u32 {
    let len = len as i64;
    (((i % len) + len) % len) as u32
}

/// Heuristic for two-channel compressed normal encodings, which leave the
/// blue channel empty or saturated and rely on runtime Z reconstruction.
/// Known approximation: an uncompressed map using the same storage
/// convention triggers it too.
fn looks_two_channel(img: &RgbaImage) -> bool {
    let (w, h) = img.dimensions();
    let step_x = (w / 16).max(1);
    let step_y = (h / 16).max(1);

    let mut sampled = 0u32;
    let mut flat_blue = 0u32;
    let mut y = 0;
    while y < h {
        let mut x = 0;
        while x < w {
            let b = img.get_pixel(x, y).0[2];
            if b == 0 || b == 255 {
                flat_blue += 1;
            }
            sampled += 1;
            x += step_x;
        }
        y += step_y;
    }

    sampled > 0 && flat_blue * 10 >= sampled * 9
}

/// Rebuild Z from X/Y: remap [0,1] to [-1,1], `z = sqrt(1 - x^2 - y^2)`,
/// remap back. Corrects the washed-out look of two-channel normal maps
/// sampled as plain RGBA.
fn reconstruct_normal_z(img: &mut RgbaImage) {
    for pixel in img.pixels_mut() {
        let x = pixel.0[0] as f32 / 255.0 * 2.0 - 1.0;
        let y = pixel.0[1] as f32 / 255.0 * 2.0 - 1.0;
        let z = (1.0 - x * x - y * y).max(0.0).sqrt();
        pixel.0[2] = ((z + 1.0) * 0.5 * 255.0).round() as u8;
        pixel.0[3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TilingMode;
    use crate::baking::uv_bounds;

    fn bounds_for(uvs: &[f32]) -> SubmeshUvBounds {
        uv_bounds::analyze(uvs, TilingMode::Improved).unwrap()
    }

    fn encode_png(img: &RgbaImage) -> TextureData {
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        TextureData {
            data: buf.into_inner(),
            mime_type: "image/png".into(),
            width: img.width(),
            height: img.height(),
        }
    }

    fn horizontal_stripes(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn missing_normal_channel_yields_neutral_fill() {
        let bounds = bounds_for(&[0.0, 0.0, 1.0, 1.0]);
        let request = SynthesisRequest {
            kind: ChannelKind::Normal,
            source: None,
            bounds: &bounds,
            is_tiling: false,
            cell_w: 32,
            cell_h: 32,
            edge_px: 4,
            reconstruct_normal_z: false,
        };
        let mut logs = Vec::new();
        let out = synthesize(&request, &mut logs);

        assert_eq!(out.dimensions(), (40, 40));
        for p in out.pixels() {
            assert_eq!(p, &Rgba([128, 128, 255, 255]));
        }
        assert!(logs.is_empty(), "missing channel is not a warning");
    }

    #[test]
    fn unreadable_texture_degrades_with_warning() {
        let bounds = bounds_for(&[0.0, 0.0, 1.0, 1.0]);
        let bad = TextureData {
            data: vec![1, 2, 3],
            mime_type: "image/png".into(),
            width: 8,
            height: 8,
        };
        let request = SynthesisRequest {
            kind: ChannelKind::Albedo,
            source: Some(&bad),
            bounds: &bounds,
            is_tiling: false,
            cell_w: 16,
            cell_h: 16,
            edge_px: 0,
            reconstruct_normal_z: false,
        };
        let mut logs = Vec::new();
        let out = synthesize(&request, &mut logs);

        assert_eq!(out.dimensions(), (16, 16));
        // Albedo sentinel red
        assert_eq!(out.get_pixel(8, 8), &Rgba([255, 0, 0, 255]));
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("not readable"));
    }

    #[test]
    fn standard_group_scales_source_into_cell() {
        let bounds = bounds_for(&[0.0, 0.0, 1.0, 1.0]);
        let tex = encode_png(&horizontal_stripes(16, 16));
        let request = SynthesisRequest {
            kind: ChannelKind::Albedo,
            source: Some(&tex),
            bounds: &bounds,
            is_tiling: false,
            cell_w: 32,
            cell_h: 32,
            edge_px: 0,
            reconstruct_normal_z: false,
        };
        let mut logs = Vec::new();
        let out = synthesize(&request, &mut logs);

        assert_eq!(out.dimensions(), (32, 32));
        assert_eq!(out.get_pixel(4, 16), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(28, 16), &Rgba([0, 0, 255, 255]));
        assert!(logs.is_empty());
    }

    #[test]
    fn tiling_composite_doubles_width() {
        // Bounds {-0.5 .. 1.5} x {0 .. 1}: composite twice the source
        // width, and the center of the cell matches the source center.
        let src = horizontal_stripes(16, 16);
        let bounds = bounds_for(&[-0.5, 0.0, 1.5, 1.0]);
        let composite = unwrap_tiling(&src, &bounds).unwrap();
        assert_eq!(composite.dimensions(), (32, 16));

        // Normalized local UV 0.5 of the composite = source center pixel.
        let center = composite.get_pixel(16, 8);
        assert_eq!(center, src.get_pixel(8, 8));
    }

    #[test]
    fn tiling_composite_replicates_tiles() {
        let src = horizontal_stripes(8, 8);
        // One extra whole tile in +U: bounds [0, 2].
        let bounds = bounds_for(&[0.0, 0.0, 2.0, 1.0]);
        let composite = unwrap_tiling(&src, &bounds).unwrap();
        assert_eq!(composite.dimensions(), (16, 8));
        // Second tile is a copy of the first.
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(composite.get_pixel(x, y), composite.get_pixel(x + 8, y));
            }
        }
    }

    #[test]
    fn tiling_composite_anchors_at_min() {
        // Bounds [0.25, 1.25]: the composite starts at source column
        // round(0.25 * 8) = 2, not at column 0.
        let src = horizontal_stripes(8, 8);
        let bounds = bounds_for(&[0.25, 0.0, 1.25, 1.0]);
        assert!(bounds.is_tiling());

        let composite = unwrap_tiling(&src, &bounds).unwrap();
        assert_eq!(composite.dimensions(), (10, 8));
        assert_eq!(composite.get_pixel(0, 3), src.get_pixel(2, 3));
        // Past the source width the sampling wraps around.
        assert_eq!(composite.get_pixel(7, 3), src.get_pixel(1, 3));
    }

    #[test]
    fn oversized_composite_falls_back() {
        // 512px source with a 40x overhang would need 20480px -- over the
        // 16384 limit. Must degrade without panicking.
        let tex = encode_png(&RgbaImage::from_pixel(
            512,
            512,
            Rgba([10, 200, 10, 255]),
        ));
        let bounds = bounds_for(&[0.0, 0.0, 40.0, 1.0]);
        let request = SynthesisRequest {
            kind: ChannelKind::Albedo,
            source: Some(&tex),
            bounds: &bounds,
            is_tiling: true,
            cell_w: 64,
            cell_h: 64,
            edge_px: 8,
            reconstruct_normal_z: false,
        };
        let mut logs = Vec::new();
        let out = synthesize(&request, &mut logs);

        assert_eq!(out.dimensions(), (80, 80));
        // Neutral albedo sentinel, not the source color.
        assert_eq!(out.get_pixel(40, 40), &Rgba([255, 0, 0, 255]));
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("16384"));
    }

    #[test]
    fn wrap_border_copies_opposite_edge() {
        let content = horizontal_stripes(8, 8);
        let padded = pad_wrap(&content, 2);
        assert_eq!(padded.dimensions(), (12, 12));

        // Center region equals the content.
        assert_eq!(padded.get_pixel(2, 2), content.get_pixel(0, 0));
        assert_eq!(padded.get_pixel(9, 9), content.get_pixel(7, 7));
        // Left border wraps to the right edge of the content.
        assert_eq!(padded.get_pixel(0, 6), content.get_pixel(6, 4));
        assert_eq!(padded.get_pixel(1, 6), content.get_pixel(7, 4));
        // Right border wraps to the left edge.
        assert_eq!(padded.get_pixel(10, 6), content.get_pixel(0, 4));
    }

    #[test]
    fn zero_edge_padding_is_identity() {
        let content = horizontal_stripes(8, 8);
        let padded = pad_wrap(&content, 0);
        assert_eq!(padded.dimensions(), (8, 8));
        for (a, b) in content.pixels().zip(padded.pixels()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn normal_z_reconstruction() {
        // Flat "up" normal stored two-channel: x=0, y=0 -> z=1 -> b=255.
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([128, 128, 0, 255]));
        assert!(looks_two_channel(&img));
        reconstruct_normal_z(&mut img);
        let p = img.get_pixel(0, 0).0;
        // x,y ~ 0.0039 after quantization; z rounds to 255.
        assert_eq!(p[2], 255);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn healthy_normal_map_not_flagged_two_channel() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 255, 255]));
        // b == 255 everywhere would trip the saturation check; a typical
        // baked map has b around 200-254.
        let img2 = RgbaImage::from_pixel(8, 8, Rgba([128, 128, 240, 255]));
        assert!(looks_two_channel(&img));
        assert!(!looks_two_channel(&img2));
    }
}
