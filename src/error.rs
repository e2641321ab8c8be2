use std::io;

use serde::Serialize;

/// All error types for the atlas-baker pipeline.
///
/// Recoverable conditions (unreadable textures, oversized composites) never
/// surface here; they degrade locally and are reported through [`BakeLog`]
/// entries instead.
#[derive(thiserror::Error, Debug)]
pub enum BakeError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Atlas overflow: {required}px needed, max atlas dimension is {max}px")]
    PackingOverflow { required: u32, max: u32 },
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BakeError>;

/// Severity of a recoverable bake condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
}

/// One structured entry in the log list a bake hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct BakeLog {
    pub level: LogLevel,
    pub message: String,
}

impl BakeLog {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warning,
            message: message.into(),
        }
    }
}
