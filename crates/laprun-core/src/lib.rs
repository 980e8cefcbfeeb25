//! # laprun-core
//!
//! Replay reconstruction and playback orchestration for laprun.
//!
//! This crate provides:
//! - The timeline reconstructor that turns legacy event exports into frames,
//!   actions, and discussions
//! - The cancellable playback orchestrator and its tokio driver
//! - Configuration loading and management

mod config;
pub mod playback;
pub mod reconstruct;

pub use config::{
    ConfigError, LaprunConfig, MAX_SPEED, MIN_SPEED, PlaybackConfig, ReconstructConfig, clamp_speed,
};
pub use playback::{
    Cue, CueKind, Mode, Orchestrator, Phase, PlaybackCommand, PlaybackDriver, PlaybackHandle,
    PlaybackView, ScriptedFocus,
};
pub use reconstruct::{Reconstructor, reconstruct};
