//! Legacy export envelope parsing.

use laprun_proto::value::{array_field, field, i64_field, string_field, text_field};
use serde_json::Value;

/// Event kinds the reconstructor understands. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    GameStarted,
    PlayerMoved,
    PlayerHit,
    TruckMoved,
    CommentatorBroadcast,
    PublicBroadcast,
    DiscussionResponse,
    AgentResponse,
    CommentatorResponse,
    TurnStarted,
    TurnFinished,
}

impl EventKind {
    /// Parses an event name. Accepts `.` and `-` as word separators.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace(['.', '-', ' '], "_");
        let kind = match normalized.as_str() {
            "game_started" | "game_start" => EventKind::GameStarted,
            "player_moved" | "player_move" => EventKind::PlayerMoved,
            "player_hit" => EventKind::PlayerHit,
            "truck_moved" | "truck_move" => EventKind::TruckMoved,
            "commentator_broadcast" => EventKind::CommentatorBroadcast,
            "public_broadcast" | "broadcast" => EventKind::PublicBroadcast,
            "discussion_response" => EventKind::DiscussionResponse,
            "agent_response" => EventKind::AgentResponse,
            "commentator_response" => EventKind::CommentatorResponse,
            "turn_started" | "turn_start" => EventKind::TurnStarted,
            "turn_finished" | "turn_ended" | "turn_end" => EventKind::TurnFinished,
            _ => return None,
        };
        Some(kind)
    }
}

/// One entry of the export's ordered message list.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyMessage {
    pub turn: Option<i64>,
    pub kind: EventKind,
    pub payload: Value,
}

impl LegacyMessage {
    /// Parses one message; unrecognised events yield `None`.
    ///
    /// Payloads may be nested under `payload`/`data`, JSON-encoded as a
    /// string, or flattened into the message itself.
    pub fn parse(value: &Value) -> Option<Self> {
        let name = string_field(value, &["event", "message_type", "type"])?;
        let kind = EventKind::from_name(&name)?;
        let turn = i64_field(value, &["turn", "tick", "round"]);

        let payload = match field(value, &["payload", "data"]) {
            Some(Value::String(encoded)) => serde_json::from_str::<Value>(encoded)
                .ok()
                .filter(Value::is_object)
                .unwrap_or_else(|| serde_json::json!({ "message": encoded })),
            Some(payload) => payload.clone(),
            None => value.clone(),
        };

        let turn = turn.or_else(|| i64_field(&payload, &["turn", "tick", "round"]));
        Some(Self { turn, kind, payload })
    }
}

/// Roster metadata supplied alongside the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMeta {
    pub agent_id: String,
    pub ai_name: String,
    pub avatar: Option<String>,
}

/// Locates the ordered message list inside an export document.
pub fn message_list(raw: &Value) -> Option<&[Value]> {
    if let Value::Array(items) = raw {
        return Some(items);
    }
    field(raw, &["core_messages", "messages", "events"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

/// Reads `agent_metadata`, skipping entries without an id.
pub fn agent_metadata(raw: &Value) -> Vec<AgentMeta> {
    array_field(raw, &["agent_metadata", "agents"])
        .iter()
        .filter_map(|entry| {
            let agent_id = string_field(entry, &["agent_id", "id", "player_id"])?;
            if agent_id.is_empty() {
                return None;
            }
            let ai_name = text_field(entry, &["ai_name", "name"]);
            Some(AgentMeta {
                ai_name: if ai_name.is_empty() { agent_id.clone() } else { ai_name },
                avatar: string_field(entry, &["avatar", "avatar_url"]).filter(|a| !a.is_empty()),
                agent_id,
            })
        })
        .collect()
}
