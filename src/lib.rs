pub mod audio;
pub mod error;
pub mod leads;
pub mod particles;
pub mod render;
pub mod simulation;
pub mod vector;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, RenderError};
pub use simulation::{Simulation, TickReport};

pub const MIN_LEAD_BIRDS: usize = 1;
pub const MAX_LEAD_BIRDS: usize = 5;
pub const INITIAL_PARTICLE_COUNT: usize = 5000;
pub const MAX_SPEED: f32 = 0.01;
pub const SEPARATION_RADIUS: f32 = 0.1;
pub const ALIGNMENT_RADIUS: f32 = 0.2;
pub const COHESION_RADIUS: f32 = 0.3;
pub const WINDOW_WIDTH: u32 = 1920;
pub const WINDOW_HEIGHT: u32 = 1080;

/// Everything the simulation reads once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub particle_count: usize,
    pub lead_count: usize,
    pub max_speed: f32,
    pub separation_radius: f32,
    pub alignment_radius: f32,
    pub cohesion_radius: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    /// Leads spawn with each velocity axis uniform in `[-lead_initial_speed, lead_initial_speed]`.
    pub lead_initial_speed: f32,
    /// Velocity added per tick along the unit direction to the nearest lead.
    pub attraction: f32,
    /// Half-width of the per-axis uniform jitter added to follower velocity.
    pub noise: f32,
    pub audio_sensitivity: f32,
    pub audio_noise_gain: f32,
    pub width: u32,
    pub height: u32,
    pub particle_size: f32,
    pub lead_size: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            particle_count: INITIAL_PARTICLE_COUNT,
            lead_count: MIN_LEAD_BIRDS,
            max_speed: MAX_SPEED,
            separation_radius: SEPARATION_RADIUS,
            alignment_radius: ALIGNMENT_RADIUS,
            cohesion_radius: COHESION_RADIUS,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            lead_initial_speed: 0.01,
            attraction: 0.001,
            noise: 0.001,
            audio_sensitivity: 0.5,
            audio_noise_gain: 10.0,
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            particle_size: 5.0,
            lead_size: 10.0,
        }
    }
}

impl Parameters {
    /// Reads parameters from a JSON file. Fields left out of the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: Parameters =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        params.validate()?;
        Ok(params)
    }

    /// Multiplier applied to the follower noise for a tick with the given amplitude.
    ///
    /// Silence leaves the noise at its base level; full-scale input raises it to
    /// `1 + audio_sensitivity * audio_noise_gain` times the base.
    pub fn noise_gain(&self, amplitude: f32) -> f32 {
        1.0 + self.audio_sensitivity * self.audio_noise_gain * amplitude.clamp(0.0, 1.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_LEAD_BIRDS..=MAX_LEAD_BIRDS).contains(&self.lead_count) {
            return Err(ConfigError::LeadCount {
                min: MIN_LEAD_BIRDS,
                max: MAX_LEAD_BIRDS,
                got: self.lead_count,
            });
        }
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::FrameSize {
                width: self.width,
                height: self.height,
            });
        }
        for (name, value) in [
            ("max_speed", self.max_speed),
            ("separation_radius", self.separation_radius),
            ("alignment_radius", self.alignment_radius),
            ("cohesion_radius", self.cohesion_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [
            ("separation_weight", self.separation_weight),
            ("alignment_weight", self.alignment_weight),
            ("cohesion_weight", self.cohesion_weight),
            ("lead_initial_speed", self.lead_initial_speed),
            ("attraction", self.attraction),
            ("noise", self.noise),
            ("audio_sensitivity", self.audio_sensitivity),
            ("audio_noise_gain", self.audio_noise_gain),
            ("particle_size", self.particle_size),
            ("lead_size", self.lead_size),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }
        // Jitter wider than max_speed is clipped away by the speed limit anyway.
        let peak = self.noise * self.noise_gain(1.0);
        if self.noise > 0.0 && !(peak.is_finite() && peak <= self.max_speed) {
            return Err(ConfigError::NoiseTooLarge {
                peak,
                max_speed: self.max_speed,
            });
        }
        Ok(())
    }
}
