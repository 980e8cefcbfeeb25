//! Configuration for reconstruction and playback.
//!
//! Loaded from `laprun.yml`. Every field has a default so an absent file
//! or a partial file is always usable.

use std::path::Path;

use laprun_proto::{DEFAULT_TRACK_LENGTH, LOG_CAPACITY};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Lowest accepted playback speed multiplier.
pub const MIN_SPEED: f64 = 0.25;
/// Highest accepted playback speed multiplier.
pub const MAX_SPEED: f64 = 100.0;

/// Clamps a speed multiplier into the accepted range. NaN maps to 1x.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        1.0
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { default }
}

fn non_negative_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 { value } else { default }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaprunConfig {
    pub reconstruct: ReconstructConfig,
    pub playback: PlaybackConfig,
}

impl LaprunConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parses configuration from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// Replaces out-of-range values with usable ones.
    pub fn normalize(&mut self) {
        self.reconstruct.normalize();
        self.playback.normalize();
    }
}

/// Reconstruction tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructConfig {
    /// Track length assumed until the stream names one.
    pub default_track_length: u32,
    /// HP assumed for players whose HP has not been reported.
    pub placeholder_hp: i64,
    /// Capacity of each snapshot's log ring.
    pub log_capacity: usize,
    /// Extra cells an acting agent may travel beyond its step count before
    /// its landing is recomputed.
    pub acting_jump_tolerance: f64,
    /// Largest jump tolerated for agents that did not act.
    pub idle_jump_tolerance: f64,
    pub commentator_id: String,
    pub commentator_name: String,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            default_track_length: DEFAULT_TRACK_LENGTH,
            placeholder_hp: 3,
            log_capacity: LOG_CAPACITY,
            acting_jump_tolerance: 2.0,
            idle_jump_tolerance: 2.0,
            commentator_id: "commentator".to_string(),
            commentator_name: "Commentator".to_string(),
        }
    }
}

impl ReconstructConfig {
    fn normalize(&mut self) {
        let defaults = Self::default();
        if self.default_track_length == 0 {
            self.default_track_length = defaults.default_track_length;
        }
        if self.placeholder_hp <= 0 {
            self.placeholder_hp = defaults.placeholder_hp;
        }
        if self.log_capacity == 0 {
            self.log_capacity = defaults.log_capacity;
        }
        self.acting_jump_tolerance =
            non_negative_or(self.acting_jump_tolerance, defaults.acting_jump_tolerance);
        self.idle_jump_tolerance =
            non_negative_or(self.idle_jump_tolerance, defaults.idle_jump_tolerance);
        if self.commentator_id.trim().is_empty() {
            self.commentator_id = defaults.commentator_id;
        }
        if self.commentator_name.trim().is_empty() {
            self.commentator_name = defaults.commentator_name;
        }
    }
}

/// Playback pacing. Every duration is in milliseconds at 1x speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub speed: f64,
    pub round_banner_ms: f64,
    pub dice_ms: f64,
    pub sight_ms: f64,
    pub sync_ms: f64,
    pub move_ms: f64,
    pub phase_gap_ms: f64,
    pub discussion_gap_ms: f64,
    pub hit_ms: f64,
    pub truck_step_ms: f64,
    pub truck_min_ms: f64,
    /// Multiplier applied to every dialogue hold.
    pub dialogue_pace: f64,
    /// Extra multiplier for commentator speech.
    pub commentator_multiplier: f64,
    /// Play the scripted rules intro before the first action.
    pub intro: bool,
    /// Driver refresh rate in frames per second.
    pub frame_rate: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            round_banner_ms: 1600.0,
            dice_ms: 1100.0,
            sight_ms: 15_000.0,
            sync_ms: 3600.0,
            move_ms: 1700.0,
            phase_gap_ms: 240.0,
            discussion_gap_ms: 350.0,
            hit_ms: 900.0,
            truck_step_ms: 160.0,
            truck_min_ms: 220.0,
            dialogue_pace: 1.0,
            commentator_multiplier: 3.0,
            intro: true,
            frame_rate: 60,
        }
    }
}

impl PlaybackConfig {
    fn normalize(&mut self) {
        let defaults = Self::default();
        self.speed = clamp_speed(self.speed);

        let fields = [
            (&mut self.round_banner_ms, defaults.round_banner_ms),
            (&mut self.dice_ms, defaults.dice_ms),
            (&mut self.sight_ms, defaults.sight_ms),
            (&mut self.sync_ms, defaults.sync_ms),
            (&mut self.move_ms, defaults.move_ms),
            (&mut self.hit_ms, defaults.hit_ms),
            (&mut self.truck_step_ms, defaults.truck_step_ms),
            (&mut self.truck_min_ms, defaults.truck_min_ms),
            (&mut self.dialogue_pace, defaults.dialogue_pace),
            (&mut self.commentator_multiplier, defaults.commentator_multiplier),
        ];
        for (value, default) in fields {
            *value = positive_or(*value, default);
        }
        // Gaps may legitimately be zero.
        self.phase_gap_ms = non_negative_or(self.phase_gap_ms, defaults.phase_gap_ms);
        self.discussion_gap_ms = non_negative_or(self.discussion_gap_ms, defaults.discussion_gap_ms);
        if self.frame_rate == 0 {
            self.frame_rate = defaults.frame_rate;
        }
    }

    /// Hold time for one utterance of `length` characters, before speed scaling.
    pub fn dialogue_ms(&self, length: usize) -> f64 {
        (1400.0 + length as f64 * 36.0).clamp(2200.0, 9000.0) * self.dialogue_pace
    }
}
