//! Playback orchestration.
//!
//! [`Orchestrator`] is a deterministic state machine over a virtual clock;
//! [`PlaybackDriver`] runs one against the tokio clock and publishes what
//! it produces.

mod cue;
mod driver;
mod interpolate;
mod intro;
mod orchestrator;
mod phase;
mod plan;
mod scheduler;

pub use cue::{Cue, CueKind, ScriptedFocus};
pub use driver::{DriverError, PlaybackCommand, PlaybackDriver, PlaybackHandle};
pub use interpolate::ease_in_out_cubic;
pub use orchestrator::{Orchestrator, PlaybackView};
pub use phase::{Mode, Phase};
