//! Transient renderer cues and camera focus intent.

use std::fmt;

use laprun_proto::Direction;
use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// One transient overlay event. Expires `duration_ms` after it is emitted
/// (already scaled by playback speed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: u64,
    #[serde(flatten)]
    pub kind: CueKind,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum CueKind {
    RoundBanner { text: String },
    PhaseBanner { text: String },
    OnAir { speaker: String },
    DiceRoll { agent_id: String, steps: u32 },
    VotePreview { agent_id: String, direction: Direction },
    TruckStep { steps: u32 },
    HitFlash { agent_id: String, hp_before: i64, hp_after: i64 },
    MoveFlash { agent_id: String },
    LandFlash { agent_id: String, position: f64 },
    FlyOut { agent_id: String },
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueKind::RoundBanner { text } | CueKind::PhaseBanner { text } => write!(f, "== {text} =="),
            CueKind::OnAir { speaker } => write!(f, "ON AIR: {speaker}"),
            CueKind::DiceRoll { agent_id, steps } => write!(f, "{agent_id} rolls {steps}"),
            CueKind::VotePreview { agent_id, direction } => write!(f, "{agent_id} leans {direction}"),
            CueKind::TruckStep { steps } => write!(f, "truck advances ({steps})"),
            CueKind::HitFlash {
                agent_id,
                hp_before,
                hp_after,
            } => write!(f, "{agent_id} hit {hp_before} -> {hp_after}"),
            CueKind::MoveFlash { agent_id } => write!(f, "{agent_id} moving"),
            CueKind::LandFlash { agent_id, position } => write!(f, "{agent_id} lands on {position}"),
            CueKind::FlyOut { agent_id } => write!(f, "{agent_id} thrown clear"),
        }
    }
}

/// Camera framing hint for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFocus {
    pub agent_id: Option<String>,
    pub phase: Phase,
    pub direction: Option<Direction>,
    pub steps: Option<u32>,
    pub truck_direction: Option<i8>,
    pub truck_steps: Option<u32>,
}

impl ScriptedFocus {
    pub fn on_agent(agent_id: impl Into<String>, phase: Phase) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            phase,
            ..Self::default()
        }
    }
}

/// Pending cues with session-unique ids.
#[derive(Debug, Default)]
pub struct CueQueue {
    next_id: u64,
    pending: Vec<Cue>,
}

impl CueQueue {
    pub fn push(&mut self, kind: CueKind, duration_ms: f64) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.pending.push(Cue {
            id,
            kind,
            duration_ms,
        });
        id
    }

    pub fn drain(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_stay_unique_across_drains() {
        let mut queue = CueQueue::default();
        let a = queue.push(CueKind::TruckStep { steps: 1 }, 100.0);
        assert_eq!(queue.drain().len(), 1);
        let b = queue.push(CueKind::TruckStep { steps: 2 }, 100.0);
        assert_ne!(a, b);
        assert!(queue.drain().iter().all(|c| c.id == b));
    }

    #[test]
    fn test_cue_serializes_flat() {
        let cue = Cue {
            id: 7,
            kind: CueKind::DiceRoll {
                agent_id: "a".into(),
                steps: 4,
            },
            duration_ms: 1100.0,
        };
        let json = serde_json::to_value(&cue).unwrap();
        assert_eq!(json["cue"], "dice_roll");
        assert_eq!(json["steps"], 4);
        assert_eq!(json["id"], 7);
    }
}
