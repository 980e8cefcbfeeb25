//! Single-pass event fold that builds frames, actions, and discussions.
//!
//! [`Accumulator::apply`] is a pure `(accumulator, message) -> accumulator`
//! step. Running registries (agents, truck, log, intent maps) live in the
//! accumulator; retroactive corrections go through [`FrameArena`].

use std::collections::HashMap;
use std::sync::LazyLock;

use laprun_proto::normalize::{
    HP_KEYS, MAX_HP_KEYS, PLAYER_ID_KEYS, PLAYER_NAME_KEYS, POSITION_KEYS, TRACK_LENGTH_KEYS,
    TRUCK_POSITION_KEYS, inventory_from_value, player_from_value, player_id, truck_from_value,
};
use laprun_proto::value::{
    array_field, bool_field, f64_field, field, i64_field, sign_field, string_field, string_list,
    text_field,
};
use laprun_proto::{
    Delivery, Direction, FrameLabel, GameState, LogRing, ON_AIR_PREFIX, PlayerState, ReplayAction,
    ReplayDiscussion, Timeline, TruckState, is_commentator_identity, wrap_position,
};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::arena::FrameArena;
use super::infer::{landing_from_start, resolve_direction, spawn_from_landing};
use super::message::{AgentMeta, EventKind, LegacyMessage};
use super::repair::repair_trajectories;
use super::sanitize::sanitize_message;
use crate::config::ReconstructConfig;

const SPEAKER_KEYS: &[&str] = &["agent_id", "player_id", "speaker_id", "sender_id", "speaker", "id"];
const HIT_TARGET_KEYS: &[&str] = &["victim_id", "agent_id", "player_id", "target_id", "id"];
const MESSAGE_KEYS: &[&str] = &["message", "response", "content", "text", "broadcast"];
const ACTION_TEXT_KEYS: &[&str] = &["action_message", "message", "reason", "thought"];
const ROSTER_KEYS: &[&str] = &["players", "agents", "roster", "participants"];
const HINT_DEPTH: usize = 3;

static SPEAKER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*\[(COMMENTATOR|DISCUSS)\]\s*\[([^\]]*)\]\s*(.*)$")
        .expect("speaker tag pattern is valid")
});

/// Routing decision for broadcast text.
#[derive(Debug, PartialEq, Eq)]
enum SpeakerTag<'a> {
    Commentator { name: &'a str, body: &'a str },
    Discuss { name: &'a str, body: &'a str },
}

fn parse_speaker_tag(text: &str) -> Option<SpeakerTag<'_>> {
    let caps = SPEAKER_TAG.captures(text)?;
    let kind = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str().trim();
    let body = caps.get(3).map_or("", |m| m.as_str()).trim();
    if kind.eq_ignore_ascii_case("COMMENTATOR") {
        Some(SpeakerTag::Commentator { name, body })
    } else {
        Some(SpeakerTag::Discuss { name, body })
    }
}

/// First positive integer hint under any of `keys`, searching nested objects.
fn find_hint(value: &Value, keys: &[&str], depth: usize) -> Option<i64> {
    if let Some(hint) = i64_field(value, keys).filter(|v| *v > 0) {
        return Some(hint);
    }
    if depth == 0 {
        return None;
    }
    match value {
        Value::Object(map) => map.values().find_map(|v| find_hint(v, keys, depth - 1)),
        Value::Array(items) => items.iter().find_map(|v| find_hint(v, keys, depth - 1)),
        _ => None,
    }
}

/// Roster entries as objects carrying an id, whether listed or id-keyed.
fn roster_entries(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, item)| {
                let mut item = item.clone();
                if player_id(&item).is_none()
                    && let Value::Object(obj) = &mut item
                {
                    obj.insert("player_id".into(), Value::String(key.clone()));
                }
                item
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn intent_key(tick: i64, agent_id: &str) -> String {
    format!("{tick}:{agent_id}")
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates.iter().copied().find(|s| !s.is_empty()).unwrap_or("")
}

#[derive(Debug, Clone, Copy)]
enum IntentChannel {
    Discussion,
    Action,
}

#[derive(Debug, Clone)]
struct AgentRecord {
    player: PlayerState,
    position_known: bool,
}

impl AgentRecord {
    fn new(player: PlayerState) -> Self {
        Self {
            player,
            position_known: false,
        }
    }
}

/// Running reconstruction state.
#[derive(Debug)]
pub struct Accumulator<'c> {
    config: &'c ReconstructConfig,
    arena: FrameArena,
    actions: Vec<ReplayAction>,
    discussions: Vec<ReplayDiscussion>,
    agents: Vec<AgentRecord>,
    truck: TruckState,
    logs: LogRing,
    items: Vec<Value>,
    tick: i64,
    track_length: u32,
    track_length_known: bool,
    max_hp: i64,
    discussion_intent: HashMap<String, String>,
    action_intent: HashMap<String, String>,
}

impl<'c> Accumulator<'c> {
    /// Creates an accumulator seeded with the export's roster metadata.
    pub fn new(config: &'c ReconstructConfig, metadata: &[AgentMeta]) -> Self {
        let mut acc = Self {
            config,
            arena: FrameArena::default(),
            actions: Vec::new(),
            discussions: Vec::new(),
            agents: Vec::new(),
            truck: TruckState::default(),
            logs: LogRing::with_capacity(config.log_capacity),
            items: Vec::new(),
            tick: 0,
            track_length: config.default_track_length,
            track_length_known: false,
            max_hp: config.placeholder_hp,
            discussion_intent: HashMap::new(),
            action_intent: HashMap::new(),
        };
        for meta in metadata {
            let idx = acc.ensure_agent(&meta.agent_id, Some(meta.ai_name.clone()));
            acc.agents[idx].player.avatar.clone_from(&meta.avatar);
        }
        acc
    }

    /// Folds one message into the accumulator.
    pub fn apply(mut self, message: &LegacyMessage) -> Self {
        if let Some(turn) = message.turn {
            self.tick = self.tick.max(turn);
        }
        self.observe_hints(&message.payload);

        let payload = &message.payload;
        match message.kind {
            EventKind::GameStarted => self.on_game_started(payload),
            EventKind::DiscussionResponse => self.on_discussion(payload),
            EventKind::AgentResponse => self.on_agent_response(payload),
            EventKind::CommentatorResponse => self.on_commentator_response(payload),
            EventKind::PlayerMoved => self.on_player_moved(payload),
            EventKind::PlayerHit => self.on_player_hit(payload),
            EventKind::TruckMoved => self.on_truck_moved(payload),
            EventKind::CommentatorBroadcast => {
                self.on_broadcast(payload, FrameLabel::CommentatorBroadcast);
            }
            EventKind::PublicBroadcast => self.on_broadcast(payload, FrameLabel::PublicBroadcast),
            EventKind::TurnStarted => {
                self.emit(FrameLabel::TurnStarted);
            }
            EventKind::TurnFinished => {
                self.emit(FrameLabel::TurnFinished);
            }
        }
        self
    }

    /// Finalizes the timeline: HP clamp, commentator guarantee, repair pass.
    pub fn finish(mut self) -> Timeline {
        if self.arena.is_empty() {
            return Timeline::default();
        }

        self.ensure_single_commentator();
        for agent in &mut self.agents {
            agent.player.hp = agent.player.hp.clamp(0, self.max_hp);
        }
        self.arena.clamp_hp(self.max_hp);

        let mut frames = self.arena.into_frames();
        let repaired = repair_trajectories(&mut frames, &self.actions, self.config);
        if repaired > 0 {
            debug!(repaired, "Trajectory repair adjusted positions");
        }

        Timeline {
            frames,
            actions: self.actions,
            discussions: self.discussions,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registries
    // ─────────────────────────────────────────────────────────────────────

    fn agent_index(&self, agent_id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.player.player_id == agent_id)
    }

    fn agent_index_by_name(&self, name: &str) -> Option<usize> {
        self.agents
            .iter()
            .position(|a| a.player.name.eq_ignore_ascii_case(name))
            .or_else(|| self.agent_index(name))
    }

    fn ensure_agent(&mut self, agent_id: &str, name: Option<String>) -> usize {
        let name = name.filter(|n| !n.trim().is_empty());
        if let Some(idx) = self.agent_index(agent_id) {
            let record = &mut self.agents[idx];
            if let Some(name) = name
                && record.player.name == record.player.player_id
            {
                record.player.name = name;
            }
            return idx;
        }
        let player = PlayerState::new(
            agent_id,
            name.unwrap_or_else(|| agent_id.to_string()),
            self.max_hp,
        );
        self.agents.push(AgentRecord::new(player));
        self.agents.len() - 1
    }

    fn commentator_index(&mut self, name_hint: Option<&str>) -> usize {
        if let Some(idx) = self.agents.iter().position(|a| a.player.is_commentator()) {
            return idx;
        }
        let id = self.config.commentator_id.clone();
        let name = name_hint
            .filter(|n| !n.is_empty())
            .map_or_else(|| self.config.commentator_name.clone(), str::to_string);
        self.ensure_agent(&id, Some(name))
    }

    fn observe_hints(&mut self, payload: &Value) {
        if let Some(len) = find_hint(payload, TRACK_LENGTH_KEYS, HINT_DEPTH) {
            self.observe_track_length(len);
        }
        if let Some(max_hp) = find_hint(payload, MAX_HP_KEYS, HINT_DEPTH) {
            self.raise_hp_ceiling(max_hp);
        }
    }

    fn observe_track_length(&mut self, hint: i64) {
        let Ok(len) = u32::try_from(hint) else {
            return;
        };
        let accept = if self.track_length_known {
            len > self.track_length
        } else {
            true
        };
        self.track_length_known = true;
        if !accept || len == self.track_length {
            return;
        }

        debug!(from = self.track_length, to = len, "Track length corrected");
        self.track_length = len;
        self.arena.retrofit_track_length(len);
        for agent in &mut self.agents {
            agent.player.position = wrap_position(agent.player.position, len);
        }
        self.truck.position = wrap_position(self.truck.position, len);
    }

    fn raise_hp_ceiling(&mut self, candidate: i64) {
        if candidate <= self.max_hp {
            return;
        }
        let old = self.max_hp;
        self.max_hp = candidate;
        // Emitted frames and live records follow one rule.
        let upgraded = self.arena.upgrade_placeholder_hp(old, candidate);
        for agent in &mut self.agents {
            if agent.player.hp == old {
                agent.player.hp = candidate;
            }
        }
        debug!(from = old, to = candidate, upgraded, "HP ceiling raised");
    }

    fn set_hp(&mut self, idx: usize, hp: i64) {
        self.raise_hp_ceiling(hp);
        self.agents[idx].player.hp = hp.clamp(0, self.max_hp);
    }

    fn snapshot(&self) -> GameState {
        let players = self
            .agents
            .iter()
            .map(|a| {
                let mut player = a.player.clone();
                player.hp = player.hp.clamp(0, self.max_hp);
                player.position = wrap_position(player.position, self.track_length);
                player
            })
            .collect();

        GameState {
            tick: self.tick,
            track_length: self.track_length,
            players,
            truck: self.truck.clone(),
            items: self.items.clone(),
            logs: self.logs.clone(),
        }
    }

    fn emit(&mut self, label: FrameLabel) -> usize {
        let state = self.snapshot();
        self.arena.push(state, label)
    }

    fn log(&mut self, line: String) {
        self.logs.push(line);
    }

    fn record_intent(&mut self, channel: IntentChannel, agent_id: &str, text: &str) {
        let key = intent_key(self.tick, agent_id);
        match channel {
            IntentChannel::Discussion => self.discussion_intent.insert(key, text.to_string()),
            IntentChannel::Action => self.action_intent.insert(key, text.to_string()),
        };

        // Text that arrives after the move it explains fills the action late.
        let tick = self.tick;
        if let Some(action) = self
            .actions
            .iter_mut()
            .rev()
            .find(|a| a.tick == tick && a.agent_id == agent_id)
        {
            let slot = match channel {
                IntentChannel::Discussion => &mut action.discussion_message,
                IntentChannel::Action => &mut action.action_message,
            };
            if slot.is_empty() {
                *slot = text.to_string();
                action.message = first_non_empty(&[
                    &action.action_message,
                    &action.discussion_message,
                    &action.message,
                ])
                .to_string();
                debug!(agent_id, tick, ?channel, "Backfilled action text");
            }
        }
    }

    fn ensure_single_commentator(&mut self) {
        let commentator_ids: Vec<String> = self
            .agents
            .iter()
            .filter(|a| a.player.is_commentator())
            .map(|a| a.player.player_id.clone())
            .collect();

        let keep = if let Some(first) = commentator_ids.first() {
            first.clone()
        } else {
            let idx = self.commentator_index(None);
            debug!("Synthesized commentator record");
            self.agents[idx].player.player_id.clone()
        };

        for extra in commentator_ids.iter().filter(|id| **id != keep) {
            warn!(player_id = %extra, "Dropping duplicate commentator identity");
            self.arena.remove_player(extra);
            self.agents.retain(|a| a.player.player_id != *extra);
        }

        if let Some(idx) = self.agent_index(&keep) {
            let mut blank = self.agents[idx].player.clone();
            blank.message.clear();
            blank.hp = self.max_hp;
            self.arena.ensure_player(&blank);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event handlers
    // ─────────────────────────────────────────────────────────────────────

    fn on_game_started(&mut self, payload: &Value) {
        let len = self.track_length;
        let entries = roster_entries(field(payload, ROSTER_KEYS));

        for entry in &entries {
            let Some(parsed) = player_from_value(entry, self.max_hp, len) else {
                continue;
            };
            let hp_reported = field(entry, HP_KEYS).is_some();
            let position_known = field(entry, POSITION_KEYS).is_some();
            let name = string_field(entry, PLAYER_NAME_KEYS).map(|_| parsed.name.clone());

            let idx = self.ensure_agent(&parsed.player_id, name);
            if hp_reported {
                self.set_hp(idx, parsed.hp);
            }

            let record = &mut self.agents[idx];
            if position_known {
                record.player.position = parsed.position;
                record.position_known = true;
            }
            record.player.facing = parsed.facing;
            if parsed.vote_reverse.is_some() {
                record.player.vote_reverse = parsed.vote_reverse;
            }
            if !parsed.inventory.is_empty() {
                record.player.inventory = parsed.inventory;
            }
            if parsed.avatar.is_some() {
                record.player.avatar = parsed.avatar;
            }
            if !parsed.message.is_empty() {
                record.player.message = parsed.message;
            }
        }

        if let Some(truck) = field(payload, &["truck"]) {
            self.truck = truck_from_value(truck, &self.truck, len);
        }
        let items = array_field(payload, &["items"]);
        if !items.is_empty() {
            self.items = items.to_vec();
        }

        let racers = self.agents.iter().filter(|a| !a.player.is_commentator()).count();
        self.log(format!("Game started: {racers} racers on a {len}-cell track"));
        self.emit(FrameLabel::GameStarted);
    }

    fn on_discussion(&mut self, payload: &Value) {
        let text = sanitize_message(&text_field(payload, MESSAGE_KEYS));
        let speaker = string_field(payload, SPEAKER_KEYS).filter(|id| !id.is_empty());

        let Some(agent_id) = speaker else {
            if !text.is_empty() {
                self.log(format!("[system] {text}"));
            }
            self.emit(FrameLabel::DiscussionResponse);
            return;
        };

        let idx = self.ensure_agent(&agent_id, string_field(payload, PLAYER_NAME_KEYS));
        let name = self.agents[idx].player.name.clone();

        let targets = string_list(payload, &["targets", "recipients", "target_ids", "to"]);
        let delivery = match string_field(payload, &["delivery", "visibility", "channel", "mode"])
            .map(|d| d.to_ascii_lowercase())
            .as_deref()
        {
            Some("private" | "whisper" | "dm" | "direct") => Delivery::Private,
            Some(_) => Delivery::Public,
            None if !targets.is_empty() => Delivery::Private,
            None => Delivery::Public,
        };
        let targets = if delivery == Delivery::Private { targets } else { Vec::new() };

        if !text.is_empty() {
            self.agents[idx].player.message = text.clone();
            self.record_intent(IntentChannel::Discussion, &agent_id, &text);
            match delivery {
                Delivery::Public => self.log(format!("{name}: {text}")),
                Delivery::Private => {
                    self.log(format!("{name} (to {}): {text}", targets.join(", ")));
                }
            }
        }

        let frame_index = self.emit(FrameLabel::DiscussionResponse);
        if !text.is_empty() {
            self.discussions.push(ReplayDiscussion {
                tick: self.tick,
                agent_id,
                ai_name: name,
                message: text,
                delivery,
                targets,
                frame_index,
            });
        }
    }

    fn on_agent_response(&mut self, payload: &Value) {
        let Some(agent_id) = string_field(payload, SPEAKER_KEYS).filter(|id| !id.is_empty()) else {
            return;
        };
        let text = sanitize_message(&text_field(payload, MESSAGE_KEYS));
        let idx = self.ensure_agent(&agent_id, string_field(payload, PLAYER_NAME_KEYS));
        if text.is_empty() {
            return;
        }
        self.agents[idx].player.message = text.clone();
        self.record_intent(IntentChannel::Action, &agent_id, &text);
    }

    fn on_commentator_response(&mut self, payload: &Value) {
        let text = sanitize_message(&text_field(payload, MESSAGE_KEYS));
        let id = string_field(payload, SPEAKER_KEYS).unwrap_or_default();
        let name = string_field(payload, PLAYER_NAME_KEYS);

        let idx = if is_commentator_identity(&id, name.as_deref().unwrap_or("")) {
            self.ensure_agent(&id, name)
        } else {
            self.commentator_index(name.as_deref())
        };
        if !text.is_empty() {
            self.agents[idx].player.message = text;
        }
    }

    fn on_player_moved(&mut self, payload: &Value) {
        let Some(agent_id) = string_field(payload, PLAYER_ID_KEYS).filter(|id| !id.is_empty())
        else {
            debug!("player_moved without agent id skipped");
            return;
        };
        let idx = self.ensure_agent(&agent_id, string_field(payload, PLAYER_NAME_KEYS));
        let len = self.track_length;

        let declared = sign_field(payload, &["direction", "move_direction", "dir"])
            .map_or(Direction::Forward, Direction::from_sign);
        let declared_steps = i64_field(payload, &["steps", "dice", "roll", "dice_roll", "distance"])
            .map(|s| u32::try_from(s.unsigned_abs()).unwrap_or(u32::MAX));
        let landing = f64_field(payload, &["to", "new_position", "end_position", "position", "landing"])
            .map(|p| wrap_position(p, len));
        let reported_start = f64_field(payload, &["from", "old_position", "start_position", "previous_position"])
            .map(|p| wrap_position(p, len));

        let record = &self.agents[idx];
        let known_start = reported_start.or(record.position_known.then_some(record.player.position));

        let (start, landing, steps, direction) = match (known_start, landing) {
            (Some(start), Some(landing)) => {
                let steps = declared_steps.unwrap_or_else(|| {
                    let delta = match declared {
                        Direction::Forward => (landing - start).rem_euclid(f64::from(len)),
                        Direction::Backward => (start - landing).rem_euclid(f64::from(len)),
                    };
                    delta.round() as u32
                });
                let direction = resolve_direction(start, landing, steps, declared, len);
                if direction != declared {
                    debug!(
                        agent_id = %agent_id,
                        declared = %declared,
                        resolved = %direction,
                        "Move direction overridden by observed displacement"
                    );
                }
                (start, landing, steps, direction)
            }
            (Some(start), None) => {
                let steps = declared_steps.unwrap_or(0);
                (start, landing_from_start(start, steps, declared, len), steps, declared)
            }
            (None, Some(landing)) => {
                let steps = declared_steps.unwrap_or(0);
                (spawn_from_landing(landing, steps, declared, len), landing, steps, declared)
            }
            (None, None) => {
                let steps = declared_steps.unwrap_or(0);
                let start = record.player.position;
                (start, landing_from_start(start, steps, declared, len), steps, declared)
            }
        };

        if !self.agents[idx].position_known {
            // Spawn was never reported; everything emitted so far showed a guess.
            let patched = self.arena.patch_player_position(&agent_id, self.arena.len(), start);
            debug!(agent_id = %agent_id, spawn = start, patched, "Backfilled spawn position");
        }

        if let Some(hp) = i64_field(payload, HP_KEYS) {
            self.set_hp(idx, hp);
        }

        let action_text = sanitize_message(&text_field(payload, ACTION_TEXT_KEYS));
        {
            let record = &mut self.agents[idx];
            record.player.position = landing;
            record.position_known = true;
            record.player.facing = sign_field(payload, &["facing"]).unwrap_or(direction.sign());
            if let Some(vote) = bool_field(payload, &["vote_reverse", "vote"]) {
                record.player.vote_reverse = Some(vote);
            }
            if let Some(inventory) = field(payload, &["inventory"]) {
                record.player.inventory = inventory_from_value(Some(inventory));
            }
            if !action_text.is_empty() {
                record.player.message = action_text.clone();
            }
        }
        if !action_text.is_empty() {
            self.record_intent(IntentChannel::Action, &agent_id, &action_text);
        }

        let name = self.agents[idx].player.name.clone();
        self.log(format!("{name} moved {direction} {steps} ({start} -> {landing})"));
        let frame_index = self.emit(FrameLabel::PlayerMoved);

        let key = intent_key(self.tick, &agent_id);
        let action_message = self.action_intent.get(&key).cloned().unwrap_or_default();
        let discussion_message = self.discussion_intent.get(&key).cloned().unwrap_or_default();
        let message = first_non_empty(&[
            &action_message,
            &discussion_message,
            &self.agents[idx].player.message,
        ])
        .to_string();

        self.actions.push(ReplayAction {
            tick: self.tick,
            agent_id,
            ai_name: name,
            steps,
            direction,
            message,
            discussion_message,
            action_message,
            frame_index,
        });
    }

    fn on_player_hit(&mut self, payload: &Value) {
        let Some(agent_id) = string_field(payload, HIT_TARGET_KEYS).filter(|id| !id.is_empty())
        else {
            debug!("player_hit without victim id skipped");
            return;
        };
        let idx = self.ensure_agent(&agent_id, string_field(payload, PLAYER_NAME_KEYS));
        let before = self.agents[idx].player.hp;

        let after = i64_field(payload, &["hp", "new_hp", "remaining_hp", "hp_after", "current_hp"])
            .unwrap_or_else(|| {
                let damage = i64_field(payload, &["damage", "hp_loss", "amount", "dmg"]).unwrap_or(1);
                before - damage
            })
            .max(0);
        self.set_hp(idx, after);

        let respawn = f64_field(
            payload,
            &["respawn_position", "respawn", "new_position", "position", "to"],
        );
        if let Some(position) = respawn {
            let record = &mut self.agents[idx];
            record.player.position = wrap_position(position, self.track_length);
            record.position_known = true;
        }

        let name = self.agents[idx].player.name.clone();
        let now = self.agents[idx].player.hp;
        if now == 0 {
            self.log(format!("{name} was hit by the truck and is out"));
        } else {
            self.log(format!("{name} was hit by the truck ({before} -> {now} HP)"));
        }
        self.emit(FrameLabel::PlayerHit);
    }

    fn on_truck_moved(&mut self, payload: &Value) {
        let source = field(payload, &["truck"]).unwrap_or(payload);
        let len = self.track_length;
        let mut truck = truck_from_value(source, &self.truck, len);

        if f64_field(source, TRUCK_POSITION_KEYS).is_none()
            && let Some(steps) = i64_field(source, &["steps", "distance"])
        {
            truck.position = wrap_position(
                self.truck.position + f64::from(truck.direction) * steps as f64,
                len,
            );
        }
        self.truck = truck;

        let line = format!(
            "Truck moved to {} (rage {})",
            self.truck.position, self.truck.speed
        );
        self.log(line);
        self.emit(FrameLabel::TruckMoved);
    }

    fn on_broadcast(&mut self, payload: &Value, label: FrameLabel) {
        let text = text_field(payload, MESSAGE_KEYS);

        match parse_speaker_tag(&text) {
            Some(SpeakerTag::Commentator { name, body }) => {
                let body = sanitize_message(body);
                let idx = self.commentator_index(Some(name));
                let speaker = self.agents[idx].player.name.clone();
                self.agents[idx].player.message = body.clone();
                self.log(format!("{ON_AIR_PREFIX} {speaker}: {body}"));
            }
            Some(SpeakerTag::Discuss { name, body }) => {
                let body = sanitize_message(body);
                if let Some(idx) = self.agent_index_by_name(name) {
                    self.agents[idx].player.message = body.clone();
                }
                self.log(format!("{name}: {body}"));
            }
            None => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.log(format!("[system] {trimmed}"));
                }
            }
        }
        self.emit(label);
    }
}
