use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline phase exposed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Discussion,
    Sight,
    Dice,
    Sync,
    Move,
    Impact,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Discussion => "discussion",
            Phase::Sight => "sight",
            Phase::Dice => "dice",
            Phase::Sync => "sync",
            Phase::Move => "move",
            Phase::Impact => "impact",
        }
    }

    /// Banner text shown when the phase begins, if it has one.
    pub fn banner(self) -> Option<&'static str> {
        match self {
            Phase::Dice => Some("Dice roll"),
            Phase::Sight => Some("Sight preview"),
            Phase::Sync => Some("Sync"),
            Phase::Idle | Phase::Discussion | Phase::Move | Phase::Impact => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the live state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// States pushed from a live game feed.
    Live,
    /// States produced from a reconstructed timeline.
    #[default]
    Replay,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::Replay => f.write_str("replay"),
        }
    }
}
