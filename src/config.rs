use std::path::PathBuf;

use clap::Parser;

use crate::error::{BakeError, Result};
use crate::types::{ChannelKind, MaterialTemplate};

/// Side length of the packed atlas canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AtlasResolution {
    #[value(name = "32")]
    R32,
    #[value(name = "64")]
    R64,
    #[value(name = "128")]
    R128,
    #[value(name = "256")]
    R256,
    #[value(name = "512")]
    R512,
    #[value(name = "1024")]
    R1024,
    #[value(name = "2048")]
    R2048,
    #[value(name = "4096")]
    R4096,
    #[value(name = "8192")]
    R8192,
}

impl AtlasResolution {
    pub fn pixels(self) -> u32 {
        match self {
            AtlasResolution::R32 => 32,
            AtlasResolution::R64 => 64,
            AtlasResolution::R128 => 128,
            AtlasResolution::R256 => 256,
            AtlasResolution::R512 => 512,
            AtlasResolution::R1024 => 1024,
            AtlasResolution::R2048 => 2048,
            AtlasResolution::R4096 => 4096,
            AtlasResolution::R8192 => 8192,
        }
    }
}

impl std::fmt::Display for AtlasResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// Spacing in pixels kept between any two packed cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AtlasPadding {
    #[value(name = "0")]
    None,
    #[value(name = "2")]
    Px2,
    #[value(name = "4")]
    Px4,
    #[value(name = "8")]
    Px8,
    #[value(name = "16")]
    Px16,
}

impl AtlasPadding {
    pub fn pixels(self) -> u32 {
        match self {
            AtlasPadding::None => 0,
            AtlasPadding::Px2 => 2,
            AtlasPadding::Px4 => 4,
            AtlasPadding::Px8 => 8,
            AtlasPadding::Px16 => 16,
        }
    }
}

impl std::fmt::Display for AtlasPadding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// How submeshes whose UVs leave the unit square are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TilingMode {
    /// Exclude any submesh with UVs outside [0,1] from the bake.
    #[value(name = "skip-all")]
    SkipAll,
    /// Synthesize unwrapped textures that bake the tiling into the cell.
    #[value(name = "improved")]
    Improved,
    /// Clamp UV bounds to [0,1] before classification, disabling tiling
    /// support mesh-wide.
    #[value(name = "legacy")]
    Legacy,
}

impl std::fmt::Display for TilingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TilingMode::SkipAll => write!(f, "skip-all"),
            TilingMode::Improved => write!(f, "improved"),
            TilingMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// Per-channel bake settings: whether the channel gets an atlas and which
/// source material property feeds it.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    pub enabled: bool,
    pub source_property: String,
    pub destination_property: String,
}

impl ChannelConfig {
    pub fn with_defaults(kind: ChannelKind, enabled: bool) -> Self {
        Self {
            kind,
            enabled,
            source_property: kind.default_property().to_string(),
            destination_property: kind.default_property().to_string(),
        }
    }
}

/// Everything one bake operation needs to know.
#[derive(Debug, Clone)]
pub struct BakeConfig {
    pub atlas_resolution: AtlasResolution,
    pub padding: AtlasPadding,
    /// Extra mip-safe border in pixels around each cell, 0..=1024.
    pub edge_size: u32,
    pub tiling_mode: TilingMode,
    pub channels: Vec<ChannelConfig>,
    pub destination_material: Option<MaterialTemplate>,
    /// Rebuild the Z component of two-channel normal encodings.
    pub reconstruct_normal_z: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        let channels = ChannelKind::ALL
            .iter()
            .map(|&kind| ChannelConfig::with_defaults(kind, kind == ChannelKind::Albedo))
            .collect();
        Self {
            atlas_resolution: AtlasResolution::R2048,
            padding: AtlasPadding::Px4,
            edge_size: 16,
            tiling_mode: TilingMode::Improved,
            channels,
            destination_material: None,
            reconstruct_normal_z: false,
        }
    }
}

impl BakeConfig {
    pub const MAX_EDGE_SIZE: u32 = 1024;

    /// Check parameter ranges. Destination/candidate validation happens in
    /// the orchestrator's Validating stage.
    pub fn validate(&self) -> Result<()> {
        if self.edge_size > Self::MAX_EDGE_SIZE {
            return Err(BakeError::Configuration(format!(
                "edge size {} exceeds maximum {}",
                self.edge_size,
                Self::MAX_EDGE_SIZE
            )));
        }
        if !self
            .channels
            .iter()
            .any(|c| c.enabled && c.kind == ChannelKind::Albedo)
        {
            return Err(BakeError::Configuration(
                "the albedo channel must be enabled; it drives the atlas layout".into(),
            ));
        }
        Ok(())
    }

    pub fn enabled_channels(&self) -> impl Iterator<Item = &ChannelConfig> {
        self.channels.iter().filter(|c| c.enabled)
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.kind == kind)
    }
}

/// Fully resolved job configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub bake: BakeConfig,
    pub dry_run: bool,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            bake: BakeConfig::default(),
            dry_run: false,
            verbose: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "atlas-baker",
    about = "Merge multi-material meshes into a single mesh with packed texture atlases",
    version
)]
pub struct CliArgs {
    /// Input OBJ file
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Atlas side length in pixels
    #[arg(long, value_enum, default_value = "2048")]
    pub atlas_resolution: AtlasResolution,

    /// Spacing between packed cells in pixels
    #[arg(long, value_enum, default_value = "4")]
    pub padding: AtlasPadding,

    /// Mip-safe edge border per cell in pixels (0-1024)
    #[arg(long, default_value_t = 16)]
    pub edge_size: u32,

    /// Tiling submesh handling
    #[arg(long, value_enum, default_value = "improved")]
    pub tiling_mode: TilingMode,

    /// Channels to bake in addition to albedo (e.g. normal,metallic)
    #[arg(long, value_delimiter = ',')]
    pub channels: Vec<String>,

    /// Name of the destination material bound to the atlases
    #[arg(long, default_value = "baked")]
    pub material: String,

    /// Rebuild Z for two-channel compressed normal maps
    #[arg(long)]
    pub fix_normals: bool,

    /// Scan input and report stats only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl TryFrom<CliArgs> for JobConfig {
    type Error = BakeError;

    fn try_from(args: CliArgs) -> Result<Self> {
        let mut channels: Vec<ChannelConfig> = ChannelKind::ALL
            .iter()
            .map(|&kind| ChannelConfig::with_defaults(kind, kind == ChannelKind::Albedo))
            .collect();

        for name in &args.channels {
            let kind = ChannelKind::ALL
                .iter()
                .find(|k| k.as_str() == name.as_str())
                .copied()
                .ok_or_else(|| {
                    BakeError::Configuration(format!("unknown channel: {name}"))
                })?;
            if let Some(channel) = channels.iter_mut().find(|c| c.kind == kind) {
                channel.enabled = true;
            }
        }

        let bake = BakeConfig {
            atlas_resolution: args.atlas_resolution,
            padding: args.padding,
            edge_size: args.edge_size,
            tiling_mode: args.tiling_mode,
            channels,
            destination_material: Some(MaterialTemplate {
                name: args.material,
            }),
            reconstruct_normal_z: args.fix_normals,
        };
        bake.validate()?;

        Ok(JobConfig {
            input: args.input,
            output: args.output,
            bake,
            dry_run: args.dry_run,
            verbose: args.verbose,
            threads: args.threads,
        })
    }
}
