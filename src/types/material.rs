use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use serde::Serialize;
use tracing::warn;

/// The material channels a bake can produce an atlas for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Albedo,
    Metallic,
    Specular,
    Normal,
    Height,
    Occlusion,
    Detail,
    DetailMask,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 8] = [
        ChannelKind::Albedo,
        ChannelKind::Metallic,
        ChannelKind::Specular,
        ChannelKind::Normal,
        ChannelKind::Height,
        ChannelKind::Occlusion,
        ChannelKind::Detail,
        ChannelKind::DetailMask,
    ];

    /// Fill color used when a material lacks this channel or its texture
    /// cannot be read.
    ///
    /// Albedo is deliberately a loud red rather than a neutral value so
    /// missing base textures are visible in the baked result.
    pub fn neutral_color(self) -> Rgba<u8> {
        match self {
            ChannelKind::Albedo => Rgba([255, 0, 0, 255]),
            ChannelKind::Metallic | ChannelKind::Specular | ChannelKind::Height => {
                Rgba([0, 0, 0, 255])
            }
            ChannelKind::Normal => Rgba([128, 128, 255, 255]),
            ChannelKind::Occlusion | ChannelKind::DetailMask => Rgba([255, 255, 255, 255]),
            ChannelKind::Detail => Rgba([128, 128, 128, 255]),
        }
    }

    /// Default material property name this channel reads its texture from.
    pub fn default_property(self) -> &'static str {
        match self {
            ChannelKind::Albedo => "base_color",
            ChannelKind::Metallic => "metallic",
            ChannelKind::Specular => "specular",
            ChannelKind::Normal => "normal",
            ChannelKind::Height => "height",
            ChannelKind::Occlusion => "occlusion",
            ChannelKind::Detail => "detail",
            ChannelKind::DetailMask => "detail_mask",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Albedo => "albedo",
            ChannelKind::Metallic => "metallic",
            ChannelKind::Specular => "specular",
            ChannelKind::Normal => "normal",
            ChannelKind::Height => "height",
            ChannelKind::Occlusion => "occlusion",
            ChannelKind::Detail => "detail",
            ChannelKind::DetailMask => "detail_mask",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw texture image data as loaded from disk.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    /// Decode into an RGBA bitmap.
    ///
    /// Tries encoded image formats first, falls back to raw RGBA
    /// interpretation. Returns `None` when the bytes cannot be read as
    /// pixels; callers substitute a neutral fill in that case.
    pub fn decode(&self) -> Option<RgbaImage> {
        if let Ok(img) = image::load_from_memory(&self.data) {
            return Some(img.to_rgba8());
        }

        let pixel_count = (self.width * self.height) as usize;
        if self.data.len() == pixel_count * 4 {
            return RgbaImage::from_raw(self.width, self.height, self.data.clone());
        }

        warn!(
            width = self.width,
            height = self.height,
            data_len = self.data.len(),
            "Cannot decode texture data"
        );
        None
    }
}

/// A source material: a name plus texture slots keyed by property name.
///
/// This is the lookup surface the synthesizer consumes -- `has_channel` /
/// `channel_texture` by property name, nothing engine-specific.
#[derive(Debug, Clone, Default)]
pub struct MaterialChannels {
    pub name: String,
    /// Property name -> index into `MaterialLibrary::textures`.
    pub properties: HashMap<String, usize>,
}

impl MaterialChannels {
    pub fn has_channel(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    pub fn channel_texture(&self, property: &str) -> Option<usize> {
        self.properties.get(property).copied()
    }
}

/// Collection of source materials and their associated textures.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    pub materials: Vec<MaterialChannels>,
    pub textures: Vec<TextureData>,
}

impl MaterialLibrary {
    /// Resolve a material's texture for a property, if both exist.
    pub fn texture_for(&self, material: usize, property: &str) -> Option<&TextureData> {
        let mat = self.materials.get(material)?;
        let tex_idx = mat.channel_texture(property)?;
        self.textures.get(tex_idx)
    }
}

/// Destination material template the baked atlases are bound to.
#[derive(Debug, Clone)]
pub struct MaterialTemplate {
    pub name: String,
}
