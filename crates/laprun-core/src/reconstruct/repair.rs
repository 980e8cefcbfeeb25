//! Post-pass that removes impossible position jumps.
//!
//! Runs after every frame exists. For the agent acting in a `player_moved`
//! frame, a missing or oversized jump is replaced by the landing implied by
//! its recorded steps and direction. Every other racer that teleports in a
//! frame where nothing could have moved it is held at its previous cell.

use std::collections::HashMap;

use laprun_proto::{FrameLabel, ReplayAction, ReplayFrame, circular_distance, wrap_position};

use crate::config::ReconstructConfig;

const STILL: f64 = 1e-6;

/// Repairs trajectories in place. Returns the number of positions changed.
pub fn repair_trajectories(
    frames: &mut [ReplayFrame],
    actions: &[ReplayAction],
    config: &ReconstructConfig,
) -> usize {
    let acting: HashMap<usize, &ReplayAction> =
        actions.iter().map(|a| (a.frame_index, a)).collect();
    let mut repaired = 0;

    for index in 1..frames.len() {
        let (before, after) = frames.split_at_mut(index);
        let previous = &before[index - 1].state;
        let frame = &mut after[0];
        let len = frame.state.track_length;
        let action = acting
            .get(&index)
            .filter(|_| frame.label == FrameLabel::PlayerMoved);

        for player in &mut frame.state.players {
            if player.is_commentator() {
                continue;
            }
            let Some(prev) = previous.player(&player.player_id) else {
                continue;
            };
            let jump = circular_distance(prev.position, player.position, len);

            match action {
                Some(action) if action.agent_id == player.player_id => {
                    let steps = f64::from(action.steps);
                    let implausible = jump > steps + config.acting_jump_tolerance
                        || (jump < STILL && action.steps > 0);
                    if implausible {
                        player.position = wrap_position(
                            prev.position + f64::from(action.direction.sign()) * steps,
                            len,
                        );
                        repaired += 1;
                    }
                }
                _ => {
                    if frame.label != FrameLabel::PlayerHit && jump > config.idle_jump_tolerance {
                        player.position = prev.position;
                        repaired += 1;
                    }
                }
            }
        }
    }
    repaired
}
