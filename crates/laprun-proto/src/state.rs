//! Game-state snapshot types.
//!
//! A [`GameState`] is the unit the renderer observes: one whole-track
//! snapshot with every player, the truck, and the recent event log.
//! Reconstructed frames hold immutable copies; the playback orchestrator
//! owns one mutable "live" copy that it interpolates between frames.

use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default capacity of the per-snapshot event log.
pub const LOG_CAPACITY: usize = 120;

/// Prefix of log lines spoken on air by the commentator.
pub const ON_AIR_PREFIX: &str = "[ON AIR]";

/// Track length assumed until the event stream names one.
pub const DEFAULT_TRACK_LENGTH: u32 = 20;

/// Reserved identity pattern for the commentator seat.
static COMMENTATOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(commentator|narrator)\b").expect("commentator pattern is valid")
});

/// Returns true when an id or display name belongs to the commentator seat.
pub fn is_commentator_identity(id: &str, name: &str) -> bool {
    COMMENTATOR_PATTERN.is_match(id) || COMMENTATOR_PATTERN.is_match(name)
}

/// Wraps a track position into `[0, track_length)`.
pub fn wrap_position(position: f64, track_length: u32) -> f64 {
    let len = f64::from(track_length.max(1));
    let wrapped = position.rem_euclid(len);
    // rem_euclid can return `len` itself for tiny negative inputs
    if wrapped >= len { 0.0 } else { wrapped }
}

/// Shortest distance between two cells on a circular track.
pub fn circular_distance(a: f64, b: f64, track_length: u32) -> f64 {
    let len = f64::from(track_length.max(1));
    let forward = (b - a).rem_euclid(len);
    forward.min(len - forward)
}

/// Bounded log of recent textual events; the oldest entry is evicted first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LogRing {
    entries: VecDeque<String>,
    capacity: usize,
}

impl LogRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl From<Vec<String>> for LogRing {
    fn from(entries: Vec<String>) -> Self {
        let mut ring = Self::default();
        for entry in entries {
            ring.push(entry);
        }
        ring
    }
}

impl From<LogRing> for Vec<String> {
    fn from(ring: LogRing) -> Self {
        ring.entries.into()
    }
}

/// One participant on the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: String,
    pub name: String,
    pub avatar: Option<String>,
    /// Track-relative position; fractional while a move is in flight.
    pub position: f64,
    /// `+1` or `-1`.
    pub facing: i8,
    /// Tri-state vote on reversing the truck; `None` is unknown.
    pub vote_reverse: Option<bool>,
    pub hp: i64,
    pub inventory: BTreeMap<String, i64>,
    pub message: String,
}

impl PlayerState {
    pub fn new(player_id: impl Into<String>, name: impl Into<String>, hp: i64) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            avatar: None,
            position: 0.0,
            facing: 1,
            vote_reverse: None,
            hp,
            inventory: BTreeMap::new(),
            message: String::new(),
        }
    }

    pub fn is_commentator(&self) -> bool {
        is_commentator_identity(&self.player_id, &self.name)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// The pursuing truck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckState {
    pub position: f64,
    /// `+1` clockwise, `-1` counterclockwise.
    pub direction: i8,
    /// Rage multiplier.
    pub speed: f64,
    pub can_multi_hit: bool,
}

impl Default for TruckState {
    fn default() -> Self {
        Self {
            position: 0.0,
            direction: 1,
            speed: 1.0,
            can_multi_hit: false,
        }
    }
}

/// One whole-track snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub tick: i64,
    pub track_length: u32,
    pub players: Vec<PlayerState>,
    pub truck: TruckState,
    /// Passed through untouched.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub logs: LogRing,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            tick: 0,
            track_length: DEFAULT_TRACK_LENGTH,
            players: Vec::new(),
            truck: TruckState::default(),
            items: Vec::new(),
            logs: LogRing::default(),
        }
    }
}

impl GameState {
    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn commentator(&self) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.is_commentator())
    }

    /// Players that take part in the race (the commentator seat excluded).
    pub fn racers(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| !p.is_commentator())
    }
}
