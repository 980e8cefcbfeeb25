//! Shape coercion for loosely-typed state payloads.
//!
//! Live sockets and export rosters describe players and the truck with a
//! handful of competing field names. These helpers coerce whatever arrives
//! into the typed snapshot model; they never fail, they only default.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::state::{
    DEFAULT_TRACK_LENGTH, GameState, LogRing, PlayerState, TruckState, wrap_position,
};
use crate::value::{
    array_field, as_i64, as_string, bool_field, f64_field, field, i64_field, sign_field,
    string_field, text_field,
};

pub const PLAYER_ID_KEYS: &[&str] = &["agent_id", "player_id", "id"];
pub const PLAYER_NAME_KEYS: &[&str] = &["ai_name", "name", "display_name"];
pub const POSITION_KEYS: &[&str] = &["position", "pos", "cell"];
pub const HP_KEYS: &[&str] = &["hp", "health", "lives"];
pub const TRACK_LENGTH_KEYS: &[&str] = &["track_length", "track_size", "board_size"];
pub const MAX_HP_KEYS: &[&str] = &["max_hp", "maxHp", "hp_max"];
pub const TRUCK_POSITION_KEYS: &[&str] = &["position", "pos", "to", "new_position"];

/// Reads a player-id from any of the accepted keys.
pub fn player_id(value: &Value) -> Option<String> {
    string_field(value, PLAYER_ID_KEYS).filter(|id| !id.is_empty())
}

/// Reads an inventory mapping. Lists count one per occurrence.
pub fn inventory_from_value(value: Option<&Value>) -> BTreeMap<String, i64> {
    let mut inventory = BTreeMap::new();
    match value {
        Some(Value::Object(map)) => {
            for (kind, count) in map {
                if let Some(count) = as_i64(count) {
                    inventory.insert(kind.clone(), count.max(0));
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let kind = as_string(item).or_else(|| string_field(item, &["kind", "type", "name"]));
                if let Some(kind) = kind {
                    *inventory.entry(kind).or_insert(0) += 1;
                }
            }
        }
        _ => {}
    }
    inventory
}

/// Coerces one player record. Returns `None` only when no id can be found.
pub fn player_from_value(value: &Value, fallback_hp: i64, track_length: u32) -> Option<PlayerState> {
    let id = player_id(value)?;
    let name = string_field(value, PLAYER_NAME_KEYS).unwrap_or_else(|| id.clone());
    let mut player = PlayerState::new(id, name, i64_field(value, HP_KEYS).unwrap_or(fallback_hp).max(0));
    player.avatar = string_field(value, &["avatar", "avatar_url", "image"]).filter(|a| !a.is_empty());
    player.position = wrap_position(f64_field(value, POSITION_KEYS).unwrap_or(0.0), track_length);
    player.facing = sign_field(value, &["facing", "direction"]).unwrap_or(1);
    player.vote_reverse = bool_field(value, &["vote_reverse", "voteReverse"]);
    player.inventory = inventory_from_value(field(value, &["inventory", "items"]));
    player.message = text_field(value, &["message", "last_message"]);
    Some(player)
}

/// Coerces a truck record, starting from `base` for missing fields.
pub fn truck_from_value(value: &Value, base: &TruckState, track_length: u32) -> TruckState {
    TruckState {
        position: f64_field(value, TRUCK_POSITION_KEYS)
            .map_or(base.position, |p| wrap_position(p, track_length)),
        direction: sign_field(value, &["direction", "dir"]).unwrap_or(base.direction),
        speed: f64_field(value, &["speed", "rage"])
            .filter(|s| *s > 0.0)
            .unwrap_or(base.speed),
        can_multi_hit: bool_field(value, &["can_multi_hit", "multi_hit"]).unwrap_or(base.can_multi_hit),
    }
}

/// Reads players given either as a list or as an id-keyed object.
pub fn players_from_value(value: Option<&Value>, fallback_hp: i64, track_length: u32) -> Vec<PlayerState> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| player_from_value(item, fallback_hp, track_length))
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(key, item)| {
                let mut item = item.clone();
                if player_id(&item).is_none()
                    && let Value::Object(obj) = &mut item
                {
                    obj.insert("player_id".into(), Value::String(key.clone()));
                }
                player_from_value(&item, fallback_hp, track_length)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Basic coercion of a live-socket state payload into a [`GameState`].
pub fn normalize_game_state(value: &Value) -> GameState {
    let track_length = i64_field(value, TRACK_LENGTH_KEYS)
        .filter(|len| *len > 0)
        .map_or(DEFAULT_TRACK_LENGTH, |len| u32::try_from(len).unwrap_or(DEFAULT_TRACK_LENGTH));
    let fallback_hp = i64_field(value, MAX_HP_KEYS).unwrap_or(0).max(0);

    let truck = field(value, &["truck"])
        .map(|t| truck_from_value(t, &TruckState::default(), track_length))
        .unwrap_or_default();

    let logs = array_field(value, &["logs", "log"])
        .iter()
        .filter_map(as_string)
        .collect::<Vec<_>>();

    GameState {
        tick: i64_field(value, &["tick", "turn", "round"]).unwrap_or(0),
        track_length,
        players: players_from_value(field(value, &["players"]), fallback_hp, track_length),
        truck,
        items: array_field(value, &["items"]).to_vec(),
        logs: LogRing::from(logs),
    }
}
