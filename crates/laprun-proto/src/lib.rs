//! # laprun-proto
//!
//! Shared types and rules for laprun.
//!
//! This crate provides:
//! - The game-state snapshot model (`GameState`, `PlayerState`, `TruckState`)
//! - The reconstructed timeline (`ReplayFrame`, `ReplayAction`, `ReplayDiscussion`)
//! - Permissive accessors and shape coercion for loosely-typed JSON payloads
//! - End-of-replay outcome classification
//! - Document loading and its error type

mod document;
mod error;
pub mod normalize;
mod outcome;
mod state;
mod timeline;
pub mod value;

pub use document::{load_document, parse_document};
pub use error::{LoadError, LoadResult};
pub use normalize::normalize_game_state;
pub use outcome::{Outcome, classify_outcome, standings};
pub use state::{
    DEFAULT_TRACK_LENGTH, GameState, LOG_CAPACITY, LogRing, ON_AIR_PREFIX, PlayerState, TruckState,
    circular_distance, is_commentator_identity, wrap_position,
};
pub use timeline::{
    Delivery, Direction, FrameLabel, ReplayAction, ReplayDiscussion, ReplayFrame, Timeline,
};
