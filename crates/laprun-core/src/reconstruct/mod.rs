//! Replay reconstruction.
//!
//! Turns a legacy export (an ordered list of engine events plus roster
//! metadata) into a [`Timeline`] of whole-track snapshots, move actions,
//! and discussion lines. Reconstruction never fails: malformed input
//! degrades to an empty or partial timeline.

mod accumulator;
mod arena;
mod infer;
mod message;
mod repair;
mod sanitize;

pub use accumulator::Accumulator;
pub use infer::resolve_direction;
pub use message::{AgentMeta, EventKind, LegacyMessage, agent_metadata, message_list};
pub use sanitize::sanitize_message;

use laprun_proto::Timeline;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ReconstructConfig;

/// Rebuilds a timeline using a given configuration.
#[derive(Debug, Clone, Default)]
pub struct Reconstructor {
    config: ReconstructConfig,
}

impl Reconstructor {
    pub fn new(config: ReconstructConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    /// Reconstructs `raw`. Deterministic: the same document always yields
    /// an identical timeline.
    pub fn reconstruct(&self, raw: &Value) -> Timeline {
        let Some(list) = message_list(raw) else {
            warn!("Export has no message list; nothing to replay");
            return Timeline::default();
        };

        let messages: Vec<LegacyMessage> = list.iter().filter_map(LegacyMessage::parse).collect();
        if messages.is_empty() {
            warn!(entries = list.len(), "Export contains no recognised events");
            return Timeline::default();
        }

        let metadata = agent_metadata(raw);
        let timeline = messages
            .iter()
            .fold(Accumulator::new(&self.config, &metadata), Accumulator::apply)
            .finish();

        info!(
            events = messages.len(),
            skipped = list.len() - messages.len(),
            frames = timeline.frames.len(),
            actions = timeline.actions.len(),
            discussions = timeline.discussions.len(),
            "Reconstructed replay"
        );
        timeline
    }
}

/// Reconstructs `raw` with default settings.
pub fn reconstruct(raw: &Value) -> Timeline {
    Reconstructor::default().reconstruct(raw)
}
