pub mod baking;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod output;
pub mod scene;
pub mod types;

pub use baking::{bake, BakeArtifacts, BakeReport, BakedAtlas};
pub use config::{BakeConfig, CliArgs, JobConfig, TilingMode};
pub use error::{BakeError, BakeLog, Result};
pub use scene::Scene;
