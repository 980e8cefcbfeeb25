//! Reconstructed replay timeline: frames, actions, and discussions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::GameState;

/// The event that produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLabel {
    GameStarted,
    PlayerMoved,
    PlayerHit,
    TruckMoved,
    CommentatorBroadcast,
    DiscussionResponse,
    PublicBroadcast,
    TurnStarted,
    TurnFinished,
}

impl FrameLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameLabel::GameStarted => "game_started",
            FrameLabel::PlayerMoved => "player_moved",
            FrameLabel::PlayerHit => "player_hit",
            FrameLabel::TruckMoved => "truck_moved",
            FrameLabel::CommentatorBroadcast => "commentator_broadcast",
            FrameLabel::DiscussionResponse => "discussion_response",
            FrameLabel::PublicBroadcast => "public_broadcast",
            FrameLabel::TurnStarted => "turn_started",
            FrameLabel::TurnFinished => "turn_finished",
        }
    }

    /// Labels replayed during impact resolution after a move lands.
    pub fn is_impact(self) -> bool {
        matches!(
            self,
            FrameLabel::TruckMoved | FrameLabel::PlayerHit | FrameLabel::CommentatorBroadcast
        )
    }
}

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable snapshot tagged with the event that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub state: GameState,
    pub label: FrameLabel,
}

/// Direction of a move along the track, relative to the track orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn from_sign(sign: i8) -> Self {
        if sign < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    pub fn sign(self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// One agent's move decision and the frame its outcome landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayAction {
    pub tick: i64,
    pub agent_id: String,
    pub ai_name: String,
    pub steps: u32,
    pub direction: Direction,
    /// Best available explanation: action text, else discussion text, else
    /// the agent's last stored message.
    pub message: String,
    pub discussion_message: String,
    pub action_message: String,
    #[serde(rename = "frameIndex")]
    pub frame_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    #[default]
    Public,
    Private,
}

/// One discussion utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDiscussion {
    pub tick: i64,
    pub agent_id: String,
    pub ai_name: String,
    pub message: String,
    pub delivery: Delivery,
    /// Recipient ids; only meaningful for private delivery.
    pub targets: Vec<String>,
    #[serde(rename = "frameIndex")]
    pub frame_index: usize,
}

/// Reconstructor output and orchestrator input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub frames: Vec<ReplayFrame>,
    pub actions: Vec<ReplayAction>,
    pub discussions: Vec<ReplayDiscussion>,
}

impl Timeline {
    /// An empty timeline means "nothing to play".
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&ReplayFrame> {
        self.frames.get(index)
    }

    pub fn last_state(&self) -> Option<&GameState> {
        self.frames.last().map(|f| &f.state)
    }

    /// Discussions belonging to `tick` with their list index, in list order.
    pub fn discussions_for_tick(
        &self,
        tick: i64,
    ) -> impl Iterator<Item = (usize, &ReplayDiscussion)> {
        self.discussions
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.tick == tick)
    }

    /// Number of actions whose move frame is at or before `frame_index`.
    ///
    /// This is the index of the next action to play after showing that frame.
    pub fn actions_through_frame(&self, frame_index: usize) -> usize {
        self.actions
            .iter()
            .take_while(|a| a.frame_index <= frame_index)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(tick: i64, frame_index: usize) -> ReplayAction {
        ReplayAction {
            tick,
            agent_id: "a".into(),
            ai_name: "A".into(),
            steps: 1,
            direction: Direction::Forward,
            message: String::new(),
            discussion_message: String::new(),
            action_message: String::new(),
            frame_index,
        }
    }

    #[test]
    fn test_action_serializes_frame_index_camel_case() {
        let json = serde_json::to_value(action(2, 7)).unwrap();
        assert_eq!(json["frameIndex"], 7);
        assert_eq!(json["direction"], "forward");
    }

    #[test]
    fn test_label_round_trips_through_snake_case() {
        let json = serde_json::to_value(FrameLabel::CommentatorBroadcast).unwrap();
        assert_eq!(json, "commentator_broadcast");
        assert_eq!(FrameLabel::CommentatorBroadcast.to_string(), "commentator_broadcast");
    }

    #[test]
    fn test_impact_labels() {
        assert!(FrameLabel::TruckMoved.is_impact());
        assert!(FrameLabel::PlayerHit.is_impact());
        assert!(FrameLabel::CommentatorBroadcast.is_impact());
        assert!(!FrameLabel::PublicBroadcast.is_impact());
    }

    #[test]
    fn test_actions_through_frame() {
        let timeline = Timeline {
            actions: vec![action(1, 2), action(1, 4), action(2, 9)],
            ..Timeline::default()
        };
        assert_eq!(timeline.actions_through_frame(0), 0);
        assert_eq!(timeline.actions_through_frame(4), 2);
        assert_eq!(timeline.actions_through_frame(100), 3);
    }

    #[test]
    fn test_discussions_for_tick_keeps_list_index() {
        let line = |tick: i64, message: &str| ReplayDiscussion {
            tick,
            agent_id: "a".into(),
            ai_name: "A".into(),
            message: message.into(),
            delivery: Delivery::Public,
            targets: Vec::new(),
            frame_index: 0,
        };
        let timeline = Timeline {
            discussions: vec![line(1, "one"), line(2, "two"), line(2, "again")],
            ..Timeline::default()
        };
        let found: Vec<(usize, &str)> = timeline
            .discussions_for_tick(2)
            .map(|(i, d)| (i, d.message.as_str()))
            .collect();
        assert_eq!(found, vec![(1, "two"), (2, "again")]);
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::from_sign(-1), Direction::Backward);
        assert_eq!(Direction::Backward.sign(), -1);
    }
}
