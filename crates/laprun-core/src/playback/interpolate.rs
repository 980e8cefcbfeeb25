//! Continuous motion between discrete snapshots.

use laprun_proto::{Direction, GameState, TruckState, wrap_position};

/// Standard ease-in-out cubic over `[0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Position `progress` of the way from `from` to `to`, travelling in `sign`
/// direction around a track of `track_length` cells.
pub fn travel(from: f64, to: f64, sign: i8, progress: f64, track_length: u32) -> f64 {
    let len = f64::from(track_length.max(1));
    let distance = if sign < 0 {
        -(from - to).rem_euclid(len)
    } else {
        (to - from).rem_euclid(len)
    };
    wrap_position(from + distance * progress, track_length)
}

/// Live state during a move animation.
///
/// Only the acting agent is interpolated. Everyone else shows the pre-move
/// snapshot for the first half and the post-move snapshot for the second.
pub fn interpolate_move(
    pre: &GameState,
    post: &GameState,
    agent_id: &str,
    direction: Direction,
    progress: f64,
) -> GameState {
    let mut state = if progress < 0.5 { pre.clone() } else { post.clone() };
    let eased = ease_in_out_cubic(progress);

    let from = pre.player(agent_id).map(|p| p.position);
    let to = post.player(agent_id).map(|p| p.position);
    if let (Some(from), Some(to)) = (from, to)
        && let Some(player) = state.player_mut(agent_id)
    {
        player.position = travel(from, to, direction.sign(), eased, post.track_length);
        player.facing = direction.sign();
    }
    state
}

/// Truck pose `progress` of the way along a coalesced run of truck moves.
pub fn interpolate_truck(from: &TruckState, to: &TruckState, progress: f64, track_length: u32) -> TruckState {
    let mut truck = to.clone();
    truck.position = travel(
        from.position,
        to.position,
        to.direction,
        ease_in_out_cubic(progress),
        track_length,
    );
    truck
}

#[cfg(test)]
mod tests {
    use super::*;
    use laprun_proto::PlayerState;

    fn with_player(id: &str, position: f64, hp: i64) -> GameState {
        let mut state = GameState::default();
        let mut player = PlayerState::new(id, id, hp);
        player.position = position;
        state.players.push(player);
        state
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!(ease_in_out_cubic(0.25) < 0.25);
    }

    #[test]
    fn test_travel_wraps_forward_and_backward() {
        assert_eq!(travel(18.0, 2.0, 1, 0.5, 20), 0.0);
        assert_eq!(travel(2.0, 18.0, -1, 0.5, 20), 0.0);
        assert_eq!(travel(2.0, 18.0, -1, 1.0, 20), 18.0);
    }

    #[test]
    fn test_only_actor_interpolated() {
        let mut pre = with_player("a", 0.0, 3);
        pre.players.push(PlayerState::new("b", "b", 3));
        let mut post = with_player("a", 4.0, 3);
        let mut b = PlayerState::new("b", "b", 2);
        b.position = 9.0;
        post.players.push(b);

        let early = interpolate_move(&pre, &post, "a", Direction::Forward, 0.25);
        assert!(early.player("a").unwrap().position > 0.0);
        assert!(early.player("a").unwrap().position < 1.0);
        assert_eq!(early.player("b").unwrap().position, 0.0);

        let late = interpolate_move(&pre, &post, "a", Direction::Forward, 0.75);
        assert_eq!(late.player("b").unwrap().position, 9.0);
        assert_eq!(late.player("b").unwrap().hp, 2);
    }
}
