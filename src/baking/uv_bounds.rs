use crate::config::TilingMode;

/// Min/max UV extents of one submesh plus the derived tiling overhang.
///
/// Created once at analysis time and immutable afterwards, except for the
/// single padding-finalization pass that writes `edge_use_*` during the
/// albedo synthesis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmeshUvBounds {
    pub min_u: f32,
    pub min_v: f32,
    pub max_u: f32,
    pub max_v: f32,
    /// How far the bounds extend below 0, in texture widths: `max(0, -min)`.
    pub span_neg_u: f32,
    pub span_neg_v: f32,
    /// How far the bounds extend past 1: `max(0, max - 1)`.
    pub span_pos_u: f32,
    pub span_pos_v: f32,
    /// Fraction of the padded cell occupied by the edge border on each
    /// side. Written once from the albedo pass, consumed by every other
    /// channel of the same group.
    pub edge_use_u: f32,
    pub edge_use_v: f32,
}

/// Round to 4 decimal places to avoid classification flicker from float
/// noise at the [0,1] boundary.
fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

/// Compute the UV bounds of a submesh from its flat `[u, v, ...]` array.
///
/// Returns `None` when the submesh has no UVs. `TilingMode::Legacy` clamps
/// bounds into [0,1] before classification, which disables tiling support
/// mesh-wide; the clamp-then-classify order is preserved deliberately.
pub fn analyze(uvs: &[f32], mode: TilingMode) -> Option<SubmeshUvBounds> {
    if uvs.len() < 2 {
        return None;
    }

    let mut min_u = f32::INFINITY;
    let mut min_v = f32::INFINITY;
    let mut max_u = f32::NEG_INFINITY;
    let mut max_v = f32::NEG_INFINITY;

    for uv in uvs.chunks_exact(2) {
        min_u = min_u.min(uv[0]);
        max_u = max_u.max(uv[0]);
        min_v = min_v.min(uv[1]);
        max_v = max_v.max(uv[1]);
    }

    let mut min_u = round4(min_u);
    let mut min_v = round4(min_v);
    let mut max_u = round4(max_u);
    let mut max_v = round4(max_v);

    if mode == TilingMode::Legacy {
        min_u = min_u.clamp(0.0, 1.0);
        min_v = min_v.clamp(0.0, 1.0);
        max_u = max_u.clamp(0.0, 1.0);
        max_v = max_v.clamp(0.0, 1.0);
    }

    Some(SubmeshUvBounds {
        min_u,
        min_v,
        max_u,
        max_v,
        span_neg_u: (-min_u).max(0.0),
        span_neg_v: (-min_v).max(0.0),
        span_pos_u: (max_u - 1.0).max(0.0),
        span_pos_v: (max_v - 1.0).max(0.0),
        edge_use_u: 0.0,
        edge_use_v: 0.0,
    })
}

impl SubmeshUvBounds {
    /// Unit-square bounds, used for submeshes that carry no UVs at all.
    pub const UNIT: SubmeshUvBounds = SubmeshUvBounds {
        min_u: 0.0,
        min_v: 0.0,
        max_u: 1.0,
        max_v: 1.0,
        span_neg_u: 0.0,
        span_neg_v: 0.0,
        span_pos_u: 0.0,
        span_pos_v: 0.0,
        edge_use_u: 0.0,
        edge_use_v: 0.0,
    };

    /// A submesh tiles iff its bounds leave the unit square.
    pub fn is_tiling(&self) -> bool {
        self.min_u < 0.0 || self.min_v < 0.0 || self.max_u > 1.0 || self.max_v > 1.0
    }

    /// Horizontal size of the unwrapped composite, in source-texture widths.
    pub fn width_factor(&self) -> f32 {
        1.0 + self.span_neg_u + self.span_pos_u
    }

    /// Vertical size of the unwrapped composite, in source-texture heights.
    pub fn height_factor(&self) -> f32 {
        1.0 + self.span_neg_v + self.span_pos_v
    }

    /// Record the fraction of the padded cell taken by the edge border.
    /// Called once per group when the albedo channel is synthesized.
    pub fn finalize_padding(&mut self, edge_px: u32, padded_w: u32, padded_h: u32) {
        self.edge_use_u = edge_px as f32 / padded_w.max(1) as f32;
        self.edge_use_v = edge_px as f32 / padded_h.max(1) as f32;
    }
}

/// Whether any UV of a submesh leaves the unit square. Used by the
/// candidate filter in skip-all mode, before any bounds are built.
pub fn exceeds_unit_range(uvs: &[f32]) -> bool {
    uvs.iter().any(|&c| !(0.0..=1.0).contains(&c))
}
