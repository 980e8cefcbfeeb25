//! Position and direction inference for recorded moves.

use laprun_proto::{Direction, wrap_position};

const EPSILON: f64 = 1e-6;

fn circular_error(observed: f64, expected: f64, len: f64) -> f64 {
    let diff = (observed - expected).abs();
    diff.min(len - diff)
}

/// Picks the move direction that explains the observed displacement.
///
/// The declared direction is only trusted when the positions cannot tell
/// the two readings apart: an exact match wins, otherwise the smaller
/// error wins, and a tie keeps `declared`.
pub fn resolve_direction(
    previous: f64,
    landing: f64,
    steps: u32,
    declared: Direction,
    track_length: u32,
) -> Direction {
    let len = f64::from(track_length.max(1));
    let expected = f64::from(steps).rem_euclid(len);
    let forward_delta = (landing - previous).rem_euclid(len);
    let backward_delta = (previous - landing).rem_euclid(len);

    let forward_err = circular_error(forward_delta, expected, len);
    let backward_err = circular_error(backward_delta, expected, len);
    let forward_exact = forward_err < EPSILON;
    let backward_exact = backward_err < EPSILON;

    match (forward_exact, backward_exact) {
        (true, false) => Direction::Forward,
        (false, true) => Direction::Backward,
        (true, true) => declared,
        (false, false) if (forward_err - backward_err).abs() < EPSILON => declared,
        (false, false) if forward_err < backward_err => Direction::Forward,
        (false, false) => Direction::Backward,
    }
}

/// Where an agent must have started to land on `landing` after `steps`.
pub fn spawn_from_landing(landing: f64, steps: u32, direction: Direction, track_length: u32) -> f64 {
    wrap_position(
        landing - f64::from(direction.sign()) * f64::from(steps),
        track_length,
    )
}

/// Where an agent lands after `steps` from `start`.
pub fn landing_from_start(start: f64, steps: u32, direction: Direction, track_length: u32) -> f64 {
    wrap_position(
        start + f64::from(direction.sign()) * f64::from(steps),
        track_length,
    )
}
