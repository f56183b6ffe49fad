//! Error types for configuration loading and frame output.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating [`Parameters`](crate::Parameters).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("lead_count must be between {min} and {max}, got {got}")]
    LeadCount { min: usize, max: usize, got: usize },
    #[error("particle_count must be at least 1")]
    NoParticles,
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("peak follower jitter {peak} exceeds max_speed {max_speed}")]
    NoiseTooLarge { peak: f32, max_speed: f32 },
    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    FrameSize { width: u32, height: u32 },
}

/// Errors raised by render sinks that write to disk or a stream.
///
/// Sinks never hand these back through [`RenderSink::submit`](crate::render::RenderSink::submit);
/// they are logged and counted instead so a failed frame cannot stall the tick.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write frame {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to serialize positions: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
