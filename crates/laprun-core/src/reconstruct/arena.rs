//! Append-only frame storage with explicit retroactive edits.
//!
//! Frames are pushed in event order and addressed by index. A few facts
//! (an agent's spawn cell, the true HP ceiling, the track length) are only
//! learned after frames depending on them were emitted; those corrections
//! are applied here as named, indexed mutations.

use laprun_proto::{FrameLabel, GameState, PlayerState, ReplayFrame, wrap_position};

#[derive(Debug, Default)]
pub struct FrameArena {
    frames: Vec<ReplayFrame>,
}

impl FrameArena {
    pub fn push(&mut self, state: GameState, label: FrameLabel) -> usize {
        self.frames.push(ReplayFrame { state, label });
        self.frames.len() - 1
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sets `player_id`'s position in every frame before `end`.
    pub fn patch_player_position(&mut self, player_id: &str, end: usize, position: f64) -> usize {
        let mut patched = 0;
        for frame in self.frames.iter_mut().take(end) {
            let len = frame.state.track_length;
            if let Some(player) = frame.state.player_mut(player_id) {
                player.position = wrap_position(position, len);
                patched += 1;
            }
        }
        patched
    }

    /// Raises every HP still sitting at the old ceiling to the new one.
    ///
    /// Values below the old ceiling are real damage and stay untouched.
    pub fn upgrade_placeholder_hp(&mut self, old_ceiling: i64, new_ceiling: i64) -> usize {
        let mut upgraded = 0;
        for frame in &mut self.frames {
            for player in &mut frame.state.players {
                if player.hp == old_ceiling {
                    player.hp = new_ceiling;
                    upgraded += 1;
                }
            }
        }
        upgraded
    }

    /// Applies a corrected track length to every earlier frame.
    pub fn retrofit_track_length(&mut self, track_length: u32) {
        for frame in &mut self.frames {
            frame.state.track_length = track_length;
            for player in &mut frame.state.players {
                player.position = wrap_position(player.position, track_length);
            }
            frame.state.truck.position = wrap_position(frame.state.truck.position, track_length);
        }
    }

    pub fn clamp_hp(&mut self, ceiling: i64) {
        for frame in &mut self.frames {
            for player in &mut frame.state.players {
                player.hp = player.hp.clamp(0, ceiling);
            }
        }
    }

    /// Inserts `player` into every frame that has no player with its id.
    pub fn ensure_player(&mut self, player: &PlayerState) -> usize {
        let mut inserted = 0;
        for frame in &mut self.frames {
            if frame.state.player(&player.player_id).is_none() {
                frame.state.players.push(player.clone());
                inserted += 1;
            }
        }
        inserted
    }

    pub fn remove_player(&mut self, player_id: &str) {
        for frame in &mut self.frames {
            frame.state.players.retain(|p| p.player_id != player_id);
        }
    }

    pub fn into_frames(self) -> Vec<ReplayFrame> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(players: &[(&str, i64, f64)]) -> GameState {
        let mut state = GameState::default();
        for (id, hp, pos) in players {
            let mut p = PlayerState::new(*id, *id, *hp);
            p.position = *pos;
            state.players.push(p);
        }
        state
    }

    #[test]
    fn test_patch_position_only_before_end() {
        let mut arena = FrameArena::default();
        arena.push(state(&[("a", 3, 0.0)]), FrameLabel::GameStarted);
        arena.push(state(&[("a", 3, 0.0)]), FrameLabel::TurnStarted);
        arena.push(state(&[("a", 3, 9.0)]), FrameLabel::PlayerMoved);

        assert_eq!(arena.patch_player_position("a", 2, 6.0), 2);
        let frames = arena.into_frames();
        assert_eq!(frames[0].state.players[0].position, 6.0);
        assert_eq!(frames[1].state.players[0].position, 6.0);
        assert_eq!(frames[2].state.players[0].position, 9.0);
    }

    #[test]
    fn test_placeholder_upgrade_spares_damage() {
        let mut arena = FrameArena::default();
        arena.push(state(&[("a", 3, 0.0), ("b", 3, 0.0)]), FrameLabel::GameStarted);
        arena.push(state(&[("a", 2, 0.0), ("b", 3, 0.0)]), FrameLabel::PlayerHit);

        assert_eq!(arena.upgrade_placeholder_hp(3, 5), 3);
        let frames = arena.into_frames();
        assert_eq!(frames[0].state.players[0].hp, 5);
        assert_eq!(frames[1].state.players[0].hp, 2);
        assert_eq!(frames[1].state.players[1].hp, 5);
    }

    #[test]
    fn test_retrofit_track_length_rewraps() {
        let mut arena = FrameArena::default();
        arena.push(state(&[("a", 3, 14.0)]), FrameLabel::GameStarted);
        arena.retrofit_track_length(12);
        let frames = arena.into_frames();
        assert_eq!(frames[0].state.track_length, 12);
        assert_eq!(frames[0].state.players[0].position, 2.0);
    }

    #[test]
    fn test_ensure_player_is_idempotent() {
        let mut arena = FrameArena::default();
        arena.push(state(&[("a", 3, 0.0)]), FrameLabel::GameStarted);
        let c = PlayerState::new("commentator", "Commentator", 3);
        assert_eq!(arena.ensure_player(&c), 1);
        assert_eq!(arena.ensure_player(&c), 0);
    }
}
