//! Scripted rules intro played before the first action of a fresh replay.

use laprun_proto::{Delivery, Direction, GameState, ReplayDiscussion};

use super::cue::ScriptedFocus;
use super::phase::Phase;

const FALLBACK_SPEAKER_ID: &str = "commentator";
const FALLBACK_SPEAKER_NAME: &str = "Commentator";

/// One narrated line and where the camera should look while it plays.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroBeat {
    pub discussion: ReplayDiscussion,
    pub focus: ScriptedFocus,
}

/// Builds the intro narration for the opening snapshot.
///
/// Lines are attributed to the commentator and never appear in the
/// reconstructed discussion list.
pub fn intro_script(state: &GameState, tick: i64) -> Vec<IntroBeat> {
    let (speaker_id, speaker_name) = state.commentator().map_or_else(
        || (FALLBACK_SPEAKER_ID.to_string(), FALLBACK_SPEAKER_NAME.to_string()),
        |c| (c.player_id.clone(), c.name.clone()),
    );
    let racers = state.racers().count();
    let first_racer = state.racers().next().map(|p| p.player_id.clone());
    let truck = &state.truck;
    let truck_way = if truck.direction < 0 { "counterclockwise" } else { "clockwise" };
    let truck_steps = truck.speed.round().max(1.0) as u32;

    let line = |message: String, focus: ScriptedFocus| IntroBeat {
        discussion: ReplayDiscussion {
            tick,
            agent_id: speaker_id.clone(),
            ai_name: speaker_name.clone(),
            message,
            delivery: Delivery::Public,
            targets: Vec::new(),
            frame_index: 0,
        },
        focus,
    };

    vec![
        line(
            format!(
                "Welcome to the track! {racers} racers share a ring of {} cells with one very angry truck.",
                state.track_length
            ),
            ScriptedFocus::default(),
        ),
        line(
            format!("The truck drives {truck_way}, and every lap it only gets faster."),
            ScriptedFocus {
                phase: Phase::Impact,
                truck_direction: Some(truck.direction),
                truck_steps: Some(truck_steps),
                ..ScriptedFocus::default()
            },
        ),
        line(
            "Each round, every racer rolls the dice and picks a direction. Choose wisely.".to_string(),
            ScriptedFocus {
                agent_id: first_racer,
                phase: Phase::Dice,
                direction: Some(Direction::Forward),
                steps: Some(3),
                ..ScriptedFocus::default()
            },
        ),
        line(
            "Get caught and you lose HP. The last one standing wins!".to_string(),
            ScriptedFocus {
                phase: Phase::Idle,
                ..ScriptedFocus::default()
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use laprun_proto::PlayerState;

    #[test]
    fn test_script_uses_existing_commentator() {
        let mut state = GameState::default();
        state.players.push(PlayerState::new("a", "Alice", 3));
        state.players.push(PlayerState::new("host", "Commentator", 3));

        let beats = intro_script(&state, 1);
        assert_eq!(beats.len(), 4);
        assert!(beats.iter().all(|b| b.discussion.agent_id == "host"));
        assert!(beats[0].discussion.message.contains("1 racers"));
        assert_eq!(beats[2].focus.agent_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_script_without_commentator_falls_back() {
        let beats = intro_script(&GameState::default(), 0);
        assert_eq!(beats[0].discussion.agent_id, "commentator");
        assert_eq!(beats[2].focus.agent_id, None);
    }
}
