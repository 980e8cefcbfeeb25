//! Cancellable playback state machine.
//!
//! The orchestrator owns the single live [`GameState`] the renderer
//! observes. It runs on a virtual clock: every side effect happens inside
//! [`Orchestrator::advance`], in due order, and only for timers belonging
//! to the current run. Any change of action index, timeline, mode, or
//! play state mints a new run, which drops every pending timer and any
//! in-flight animation.

use laprun_proto::{
    Direction, GameState, ReplayAction, ReplayDiscussion, Timeline, TruckState, circular_distance,
    normalize_game_state,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cue::{Cue, CueKind, CueQueue, ScriptedFocus};
use super::interpolate::{interpolate_move, interpolate_truck};
use super::intro::{IntroBeat, intro_script};
use super::phase::{Mode, Phase};
use super::plan::{PlannedStep, Step, build_plan, impact_window_end};
use super::scheduler::Scheduler;
use crate::config::{PlaybackConfig, clamp_speed};

/// Smallest displacement on a hit frame that counts as being thrown clear.
const FLY_OUT_DISTANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    /// Plan the current action and schedule its first step.
    Begin,
    Step(usize),
    /// Land the in-flight animation on its target snapshot.
    Complete,
    EndAction,
}

#[derive(Debug, Clone)]
enum Motion {
    Move {
        pre: GameState,
        post: GameState,
        agent_id: String,
        direction: Direction,
        frame: usize,
    },
    Truck {
        from: TruckState,
        target: GameState,
        frame: usize,
    },
}

#[derive(Debug, Clone)]
struct Animation {
    motion: Motion,
    start_ms: f64,
    duration_ms: f64,
}

impl Animation {
    fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }
}

/// Everything the renderer needs for one animation tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackView {
    pub state: GameState,
    pub phase: Phase,
    pub mode: Mode,
    pub active_action: Option<ReplayAction>,
    pub active_discussion: Option<ReplayDiscussion>,
    pub focus: Option<ScriptedFocus>,
    pub playing: bool,
    pub finished: bool,
    pub speed: f64,
    pub action_index: usize,
    pub frame_index: usize,
    pub run_id: u64,
}

/// HP drops (and optionally respawn jumps) between two snapshots.
fn impact_cues(before: &GameState, after: &GameState, with_fly_out: bool) -> Vec<CueKind> {
    let mut cues = Vec::new();
    for player in after.racers() {
        let Some(previous) = before.player(&player.player_id) else {
            continue;
        };
        if player.hp < previous.hp {
            cues.push(CueKind::HitFlash {
                agent_id: player.player_id.clone(),
                hp_before: previous.hp,
                hp_after: player.hp,
            });
        }
        if with_fly_out
            && circular_distance(previous.position, player.position, after.track_length) > FLY_OUT_DISTANCE
        {
            cues.push(CueKind::FlyOut {
                agent_id: player.player_id.clone(),
            });
        }
    }
    cues
}

#[derive(Debug)]
pub struct Orchestrator {
    config: PlaybackConfig,
    timeline: Timeline,
    mode: Mode,
    playing: bool,
    speed: f64,
    action_index: usize,
    frame_index: usize,
    intro_played: bool,
    finished: bool,
    live: GameState,
    phase: Phase,
    active_action: Option<ReplayAction>,
    active_discussion: Option<ReplayDiscussion>,
    focus: Option<ScriptedFocus>,
    scheduler: Scheduler<Task>,
    plan: Vec<PlannedStep>,
    intro: Vec<IntroBeat>,
    animation: Option<Animation>,
    cues: CueQueue,
    clock_ms: f64,
}

impl Orchestrator {
    pub fn new(config: PlaybackConfig) -> Self {
        let speed = clamp_speed(config.speed);
        Self {
            config,
            timeline: Timeline::default(),
            mode: Mode::Replay,
            playing: false,
            speed,
            action_index: 0,
            frame_index: 0,
            intro_played: false,
            finished: false,
            live: GameState::default(),
            phase: Phase::Idle,
            active_action: None,
            active_discussion: None,
            focus: None,
            scheduler: Scheduler::default(),
            plan: Vec::new(),
            intro: Vec::new(),
            animation: None,
            cues: CueQueue::default(),
            clock_ms: 0.0,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn action_index(&self) -> usize {
        self.action_index
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn run_id(&self) -> u64 {
        self.scheduler.run_id()
    }

    pub fn intro_played(&self) -> bool {
        self.intro_played
    }

    pub fn live_state(&self) -> &GameState {
        &self.live
    }

    /// Virtual time of the last [`advance`](Self::advance).
    pub fn now_ms(&self) -> f64 {
        self.clock_ms
    }

    /// When the next pending step is due, if anything is scheduled.
    pub fn next_due_ms(&self) -> Option<f64> {
        self.scheduler.next_due_ms()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Controls
    // ─────────────────────────────────────────────────────────────────────

    /// Replaces the timeline and rewinds to its first frame.
    ///
    /// Also re-arms the intro.
    pub fn load(&mut self, timeline: Timeline) {
        info!(
            frames = timeline.frames.len(),
            actions = timeline.actions.len(),
            discussions = timeline.discussions.len(),
            "Timeline loaded"
        );
        self.live = timeline
            .frames
            .first()
            .map(|f| f.state.clone())
            .unwrap_or_default();
        self.timeline = timeline;
        self.action_index = 0;
        self.frame_index = 0;
        self.intro_played = false;
        self.finished = false;
        self.settle_idle();
        self.start_run();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        info!(from = %self.mode, to = %mode, "Playback mode changed");
        self.mode = mode;
        self.settle_idle();
        if mode == Mode::Replay
            && let Some(frame) = self.timeline.frame(self.frame_index)
        {
            self.live = frame.state.clone();
        }
        self.start_run();
    }

    /// Play or pause. Resuming restarts the current action from its first step.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        self.settle_idle();
        self.start_run();
    }

    /// Takes effect from the next scheduled step; the current run continues.
    pub fn set_speed(&mut self, speed: f64) {
        let speed = clamp_speed(speed);
        if speed != self.speed {
            debug!(from = self.speed, to = speed, "Playback speed changed");
            self.speed = speed;
        }
    }

    /// Shows the next frame. Only while paused in replay mode.
    pub fn step_next(&mut self) -> bool {
        if !self.can_step() {
            return false;
        }
        self.show_frame(self.frame_index + 1);
        true
    }

    /// Shows the previous frame. Only while paused in replay mode.
    pub fn step_prev(&mut self) -> bool {
        if !self.can_step() {
            return false;
        }
        self.show_frame(self.frame_index.saturating_sub(1));
        true
    }

    /// Jumps to `frame_index`; the next action to play is the first one
    /// whose move lands after it.
    pub fn seek(&mut self, frame_index: usize) -> bool {
        if self.mode != Mode::Replay || self.timeline.is_empty() {
            return false;
        }
        self.show_frame(frame_index);
        true
    }

    /// Publishes a state pushed by a live game feed. Ignored outside live mode.
    pub fn push_live_state(&mut self, payload: &Value) -> bool {
        if self.mode != Mode::Live {
            debug!("Live state ignored outside live mode");
            return false;
        }
        self.live = normalize_game_state(payload);
        true
    }

    /// Tears down the active run.
    pub fn shutdown(&mut self) {
        self.playing = false;
        self.settle_idle();
        let run_id = self.scheduler.new_run();
        debug!(run_id, "Playback shut down");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Clock
    // ─────────────────────────────────────────────────────────────────────

    /// Moves the virtual clock to `now_ms`, firing every timer that came
    /// due on the way and rendering any animation in flight.
    pub fn advance(&mut self, now_ms: f64) {
        let now_ms = now_ms.max(self.clock_ms);
        while let Some(due) = self.scheduler.pop_due(now_ms) {
            self.clock_ms = due.due_ms.max(self.clock_ms);
            self.fire(due.task);
        }
        self.clock_ms = now_ms;
        self.render(now_ms);
    }

    pub fn view(&self) -> PlaybackView {
        PlaybackView {
            state: self.live.clone(),
            phase: self.phase,
            mode: self.mode,
            active_action: self.active_action.clone(),
            active_discussion: self.active_discussion.clone(),
            focus: self.focus.clone(),
            playing: self.playing,
            finished: self.finished,
            speed: self.speed,
            action_index: self.action_index,
            frame_index: self.frame_index,
            run_id: self.scheduler.run_id(),
        }
    }

    pub fn drain_cues(&mut self) -> Vec<Cue> {
        self.cues.drain()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Runs
    // ─────────────────────────────────────────────────────────────────────

    fn can_step(&self) -> bool {
        self.mode == Mode::Replay && !self.playing && !self.timeline.is_empty()
    }

    fn show_frame(&mut self, index: usize) {
        let last = self.timeline.frames.len().saturating_sub(1);
        let index = index.min(last);
        if let Some(frame) = self.timeline.frame(index) {
            self.live = frame.state.clone();
        }
        self.frame_index = index;
        self.action_index = self.timeline.actions_through_frame(index);
        self.finished = false;
        self.settle_idle();
        self.start_run();
    }

    fn settle_idle(&mut self) {
        self.phase = Phase::Idle;
        self.active_action = None;
        self.active_discussion = None;
        self.focus = None;
        self.animation = None;
        self.plan.clear();
        self.intro.clear();
    }

    /// Mints a new run. Only schedules the first step; nothing observable
    /// happens until [`advance`](Self::advance) reaches it.
    fn start_run(&mut self) {
        let run_id = self.scheduler.new_run();
        self.animation = None;
        if self.mode == Mode::Replay && self.playing && !self.timeline.is_empty() && !self.finished {
            self.scheduler.schedule(self.clock_ms, Task::Begin);
            debug!(run_id, action_index = self.action_index, "Run started");
        }
    }

    fn fire(&mut self, task: Task) {
        match task {
            Task::Begin => self.begin_action(),
            Task::Step(index) => self.begin_step(index),
            Task::Complete => self.complete_animation(),
            Task::EndAction => self.end_action(),
        }
    }

    fn begin_action(&mut self) {
        let Some(action) = self.timeline.actions.get(self.action_index).cloned() else {
            self.finish();
            return;
        };
        if action.frame_index >= self.timeline.frames.len() {
            warn!(
                action_index = self.action_index,
                frame_index = action.frame_index,
                frames = self.timeline.frames.len(),
                "Action lands past the last frame; skipping"
            );
            self.action_index += 1;
            self.settle_idle();
            self.start_run();
            return;
        }

        self.intro = if !self.intro_played && self.action_index == 0 && self.config.intro {
            self.intro_played = true;
            intro_script(&self.live, action.tick)
        } else {
            Vec::new()
        };
        self.plan = build_plan(&self.timeline, self.action_index, &self.intro, &self.config);

        info!(
            run_id = self.scheduler.run_id(),
            action_index = self.action_index,
            agent_id = %action.agent_id,
            steps = self.plan.len(),
            "Action started"
        );
        self.active_action = Some(action);

        let first = if self.plan.is_empty() { Task::EndAction } else { Task::Step(0) };
        self.scheduler.schedule(self.clock_ms, first);
    }

    fn begin_step(&mut self, index: usize) {
        let Some(planned) = self.plan.get(index).cloned() else {
            return;
        };
        let start = self.clock_ms;
        let hold = planned.hold_ms / self.speed;
        let gap = planned.gap_ms / self.speed;

        self.phase = planned.step.phase();
        if self.phase != Phase::Discussion {
            self.active_discussion = None;
        }

        match planned.step {
            Step::Intro { beat } => {
                if let Some(beat) = self.intro.get(beat).cloned() {
                    self.speak(&beat.discussion);
                    self.cues.push(
                        CueKind::OnAir {
                            speaker: beat.discussion.ai_name.clone(),
                        },
                        hold,
                    );
                    self.focus = Some(beat.focus);
                    self.active_discussion = Some(beat.discussion);
                }
            }
            Step::RoundBanner { tick } => {
                self.focus = None;
                self.cues.push(
                    CueKind::RoundBanner {
                        text: format!("Round {tick}"),
                    },
                    hold,
                );
            }
            Step::Discussion { index } => {
                if let Some(discussion) = self.timeline.discussions.get(index).cloned() {
                    self.speak(&discussion);
                    self.focus = Some(ScriptedFocus::on_agent(&discussion.agent_id, Phase::Discussion));
                    self.active_discussion = Some(discussion);
                }
            }
            Step::Dice | Step::Sight | Step::Sync => self.preview(hold),
            Step::Move => self.start_move(start, hold),
            Step::TruckRun { first, last } => self.start_truck_run(first, last, start, hold),
            Step::Hit { frame } => self.resolve_hit(frame, hold),
            Step::Commentary { frame } => self.play_commentary(frame, hold),
        }

        let next = if index + 1 < self.plan.len() {
            Task::Step(index + 1)
        } else {
            Task::EndAction
        };
        self.scheduler.schedule(start + hold + gap, next);
    }

    fn speak(&mut self, discussion: &ReplayDiscussion) {
        if let Some(player) = self.live.player_mut(&discussion.agent_id) {
            player.message.clone_from(&discussion.message);
        }
    }

    /// Dice, sight, and sync expose the pending move without applying it.
    fn preview(&mut self, hold: f64) {
        let Some(action) = self.active_action.clone() else {
            return;
        };
        if let Some(text) = self.phase.banner() {
            self.cues.push(CueKind::PhaseBanner { text: text.to_string() }, hold);
        }

        let mut focus = ScriptedFocus::on_agent(&action.agent_id, self.phase);
        match self.phase {
            Phase::Dice => {
                focus.steps = Some(action.steps);
                self.cues.push(
                    CueKind::DiceRoll {
                        agent_id: action.agent_id.clone(),
                        steps: action.steps,
                    },
                    hold,
                );
            }
            Phase::Sight => {
                focus.direction = Some(action.direction);
                focus.steps = Some(action.steps);
                focus.truck_direction = Some(self.live.truck.direction);
                focus.truck_steps = Some(self.live.truck.speed.round().max(1.0) as u32);
                self.cues.push(
                    CueKind::VotePreview {
                        agent_id: action.agent_id.clone(),
                        direction: action.direction,
                    },
                    hold,
                );
            }
            _ => {
                focus.direction = Some(action.direction);
            }
        }
        self.focus = Some(focus);
    }

    fn start_move(&mut self, start: f64, hold: f64) {
        let Some(action) = self.active_action.clone() else {
            return;
        };
        let frame = action.frame_index;
        let Some(post) = self.timeline.frame(frame).map(|f| f.state.clone()) else {
            return;
        };
        let pre = frame
            .checked_sub(1)
            .and_then(|i| self.timeline.frame(i))
            .map_or_else(|| self.live.clone(), |f| f.state.clone());

        self.live = pre.clone();
        self.cues.push(
            CueKind::MoveFlash {
                agent_id: action.agent_id.clone(),
            },
            hold,
        );
        self.focus = Some(ScriptedFocus {
            direction: Some(action.direction),
            steps: Some(action.steps),
            ..ScriptedFocus::on_agent(&action.agent_id, Phase::Move)
        });
        self.animation = Some(Animation {
            motion: Motion::Move {
                pre,
                post,
                agent_id: action.agent_id,
                direction: action.direction,
                frame,
            },
            start_ms: start,
            duration_ms: hold,
        });
        self.scheduler.schedule(start + hold, Task::Complete);
    }

    fn start_truck_run(&mut self, first: usize, last: usize, start: f64, hold: f64) {
        let Some(target) = self.timeline.frame(last).map(|f| f.state.clone()) else {
            return;
        };
        let steps = u32::try_from(last - first + 1).unwrap_or(u32::MAX);
        self.cues.push(CueKind::TruckStep { steps }, hold);
        self.focus = Some(ScriptedFocus {
            phase: Phase::Impact,
            truck_direction: Some(target.truck.direction),
            truck_steps: Some(steps),
            ..ScriptedFocus::default()
        });
        self.animation = Some(Animation {
            motion: Motion::Truck {
                from: self.live.truck.clone(),
                target,
                frame: last,
            },
            start_ms: start,
            duration_ms: hold,
        });
        self.scheduler.schedule(start + hold, Task::Complete);
    }

    fn resolve_hit(&mut self, frame: usize, hold: f64) {
        let Some(state) = self.timeline.frame(frame).map(|f| f.state.clone()) else {
            return;
        };
        for cue in impact_cues(&self.live, &state, true) {
            self.cues.push(cue, hold);
        }
        self.focus = None;
        self.live = state;
        self.frame_index = frame;
    }

    fn play_commentary(&mut self, frame: usize, hold: f64) {
        let Some(state) = self.timeline.frame(frame).map(|f| f.state.clone()) else {
            return;
        };
        if let Some(commentator) = state.commentator() {
            self.cues.push(
                CueKind::OnAir {
                    speaker: commentator.name.clone(),
                },
                hold,
            );
        }
        self.focus = None;
        self.live = state;
        self.frame_index = frame;
    }

    fn complete_animation(&mut self) {
        let Some(animation) = self.animation.take() else {
            return;
        };
        let flash_ms = self.config.hit_ms / self.speed;
        match animation.motion {
            Motion::Move {
                pre,
                post,
                agent_id,
                frame,
                ..
            } => {
                let landing = post.player(&agent_id).map_or(0.0, |p| p.position);
                self.cues.push(CueKind::LandFlash { agent_id, position: landing }, flash_ms);
                for cue in impact_cues(&pre, &post, false) {
                    self.cues.push(cue, flash_ms);
                }
                self.live = post;
                self.frame_index = frame;
            }
            Motion::Truck { target, frame, .. } => {
                self.live = target;
                self.frame_index = frame;
            }
        }
    }

    fn end_action(&mut self) {
        let landed = self.active_action.as_ref().map_or(0, |a| a.frame_index);
        let last = impact_window_end(&self.timeline, self.action_index)
            .saturating_sub(1)
            .max(landed);
        if let Some(frame) = self.timeline.frame(last) {
            self.live = frame.state.clone();
            self.frame_index = last;
        }
        debug!(action_index = self.action_index, frame_index = last, "Action finished");
        self.action_index += 1;
        self.settle_idle();
        self.start_run();
    }

    fn finish(&mut self) {
        if let Some(state) = self.timeline.last_state() {
            self.live = state.clone();
            self.frame_index = self.timeline.frames.len() - 1;
        }
        self.settle_idle();
        self.playing = false;
        self.finished = true;
        info!(actions = self.timeline.actions.len(), "Replay finished");
    }

    fn render(&mut self, now_ms: f64) {
        let Some(animation) = &self.animation else {
            return;
        };
        let progress = animation.progress(now_ms);
        self.live = match &animation.motion {
            Motion::Move {
                pre,
                post,
                agent_id,
                direction,
                ..
            } => interpolate_move(pre, post, agent_id, *direction, progress),
            Motion::Truck { from, target, .. } => {
                let mut state = self.live.clone();
                state.truck = interpolate_truck(from, &target.truck, progress, target.track_length);
                state
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct;
    use serde_json::json;

    fn sample() -> Timeline {
        reconstruct(&json!({
            "agent_metadata": [
                {"agent_id": "a", "ai_name": "Alice"},
                {"agent_id": "b", "ai_name": "Bob"}
            ],
            "core_messages": [
                {"turn": 0, "event": "game_started", "payload": {
                    "track_length": 20,
                    "players": [
                        {"agent_id": "a", "position": 0, "hp": 3},
                        {"agent_id": "b", "position": 10, "hp": 3}
                    ],
                    "truck": {"position": 15, "direction": 1, "rage": 1}
                }},
                {"turn": 1, "event": "discussion_response", "payload": {"agent_id": "a", "message": "Let's go"}},
                {"turn": 1, "event": "player_moved", "payload": {"agent_id": "a", "steps": 3, "to": 3, "direction": "forward"}},
                {"turn": 1, "event": "truck_moved", "payload": {"position": 17}},
                {"turn": 1, "event": "truck_moved", "payload": {"position": 19}},
                {"turn": 1, "event": "player_hit", "payload": {"agent_id": "b", "damage": 1}},
                {"turn": 1, "event": "commentator_broadcast", "payload": {"message": "[COMMENTATOR][Sam] Ouch for Bob!"}},
                {"turn": 2, "event": "player_moved", "payload": {"agent_id": "b", "steps": 2, "to": 12, "direction": "forward"}}
            ]
        }))
    }

    fn quiet() -> PlaybackConfig {
        PlaybackConfig {
            intro: false,
            ..PlaybackConfig::default()
        }
    }

    fn playing(config: PlaybackConfig) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(config);
        orchestrator.load(sample());
        orchestrator.set_playing(true);
        orchestrator
    }

    /// Runs to completion on the virtual clock, recording phase changes.
    fn drive(orchestrator: &mut Orchestrator) -> Vec<(f64, Phase)> {
        let mut transitions = Vec::new();
        let mut last = orchestrator.phase();
        for _ in 0..10_000 {
            let Some(due) = orchestrator.next_due_ms() else {
                break;
            };
            orchestrator.advance(due);
            if orchestrator.phase() != last {
                last = orchestrator.phase();
                transitions.push((due, last));
            }
        }
        transitions
    }

    /// Advances step by step until `phase` begins; returns its start time.
    fn run_until(orchestrator: &mut Orchestrator, phase: Phase) -> f64 {
        for _ in 0..10_000 {
            let due = orchestrator.next_due_ms().unwrap();
            orchestrator.advance(due);
            if orchestrator.phase() == phase {
                return due;
            }
        }
        panic!("phase {phase} never reached");
    }

    #[test]
    fn test_sample_shape() {
        let timeline = sample();
        assert_eq!(timeline.frames.len(), 8);
        assert_eq!(timeline.actions.len(), 2);
        assert_eq!(timeline.actions[0].frame_index, 2);
        assert_eq!(timeline.actions[1].frame_index, 7);
    }

    #[test]
    fn test_load_shows_first_frame_and_waits() {
        let mut orchestrator = Orchestrator::new(quiet());
        orchestrator.load(sample());
        orchestrator.advance(60_000.0);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert_eq!(orchestrator.frame_index(), 0);
        assert!(orchestrator.drain_cues().is_empty());
    }

    #[test]
    fn test_phases_follow_pipeline_order() {
        let mut orchestrator = playing(quiet());
        let phases: Vec<Phase> = drive(&mut orchestrator).into_iter().map(|(_, p)| p).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Discussion,
                Phase::Dice,
                Phase::Sight,
                Phase::Sync,
                Phase::Move,
                Phase::Impact,
                Phase::Idle,
                Phase::Dice,
                Phase::Sight,
                Phase::Sync,
                Phase::Move,
                Phase::Idle,
            ]
        );
        assert!(orchestrator.is_finished());
        assert_eq!(orchestrator.action_index(), 2);
        assert!(orchestrator.view().active_action.is_none());
        assert_eq!(orchestrator.live_state(), sample().last_state().unwrap());
    }

    #[test]
    fn test_double_speed_halves_every_transition() {
        let mut normal = playing(quiet());
        let mut fast = playing(PlaybackConfig {
            speed: 2.0,
            ..quiet()
        });
        let slow_run = drive(&mut normal);
        let fast_run = drive(&mut fast);

        assert_eq!(slow_run.len(), fast_run.len());
        for ((slow_at, slow_phase), (fast_at, fast_phase)) in slow_run.iter().zip(&fast_run) {
            assert_eq!(slow_phase, fast_phase);
            assert!((slow_at / 2.0 - fast_at).abs() < 1e-6);
        }
    }

    #[test]
    fn test_raised_ceiling_plays_no_hits() {
        let timeline = reconstruct(&json!({"core_messages": [
            {"turn": 0, "event": "game_started", "payload": {"players": [
                {"agent_id": "a", "position": 0, "hp": 3},
                {"agent_id": "b", "position": 10, "hp": 3}
            ]}},
            {"turn": 1, "event": "player_moved", "payload": {
                "agent_id": "a", "steps": 2, "to": 2, "max_hp": 5
            }}
        ]}));
        let mut orchestrator = Orchestrator::new(quiet());
        orchestrator.load(timeline);
        orchestrator.set_playing(true);
        drive(&mut orchestrator);

        assert!(orchestrator.is_finished());
        let cues = orchestrator.drain_cues();
        assert!(cues.iter().all(|c| !matches!(c.kind, CueKind::HitFlash { .. })));
    }

    #[test]
    fn test_superseded_run_has_no_effect() {
        let mut orchestrator = playing(quiet());
        let first_run = orchestrator.run_id();
        orchestrator.seek(0);
        assert!(orchestrator.run_id() > first_run);

        orchestrator.advance(0.0);
        let cues = orchestrator.drain_cues();
        assert_eq!(cues.len(), 1);
        assert!(matches!(cues[0].kind, CueKind::RoundBanner { .. }));
    }

    #[test]
    fn test_pause_mid_move_freezes_everything() {
        let mut orchestrator = playing(quiet());
        run_until(&mut orchestrator, Phase::Move);
        let frozen = orchestrator.live_state().clone();
        orchestrator.drain_cues();

        orchestrator.set_playing(false);
        orchestrator.advance(1_000_000.0);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert_eq!(orchestrator.next_due_ms(), None);
        assert!(orchestrator.drain_cues().is_empty());
        assert_eq!(orchestrator.live_state(), &frozen);
    }

    #[test]
    fn test_move_interpolates_only_the_actor() {
        let config = quiet();
        let move_ms = config.move_ms;
        let mut orchestrator = playing(config);
        let start = run_until(&mut orchestrator, Phase::Move);

        orchestrator.advance(start + move_ms / 2.0);
        let state = orchestrator.live_state();
        assert!((state.player("a").unwrap().position - 1.5).abs() < 1e-9);
        assert_eq!(state.player("b").unwrap().position, 10.0);

        orchestrator.advance(start + move_ms);
        assert_eq!(orchestrator.live_state().player("a").unwrap().position, 3.0);
        assert_eq!(orchestrator.frame_index(), 2);
    }

    #[test]
    fn test_impact_cues_truck_hit_and_commentary() {
        let mut orchestrator = playing(quiet());
        drive(&mut orchestrator);
        let kinds: Vec<CueKind> = orchestrator.drain_cues().into_iter().map(|c| c.kind).collect();

        assert!(kinds.contains(&CueKind::TruckStep { steps: 2 }));
        assert!(kinds.contains(&CueKind::HitFlash {
            agent_id: "b".into(),
            hp_before: 3,
            hp_after: 2
        }));
        assert!(kinds.contains(&CueKind::OnAir {
            speaker: "Sam".into()
        }));
        assert_eq!(
            kinds.iter().filter(|k| matches!(k, CueKind::RoundBanner { .. })).count(),
            2
        );
    }

    #[test]
    fn test_intro_plays_once_per_load() {
        let mut orchestrator = playing(PlaybackConfig::default());
        run_until(&mut orchestrator, Phase::Discussion);
        assert!(orchestrator.intro_played());
        let view = orchestrator.view();
        assert_eq!(view.active_discussion.unwrap().agent_id, "commentator");
        assert!(view.focus.is_some());

        orchestrator.seek(0);
        orchestrator.drain_cues();
        orchestrator.advance(orchestrator.now_ms());
        let cues = orchestrator.drain_cues();
        assert!(matches!(cues[0].kind, CueKind::RoundBanner { .. }));

        orchestrator.load(sample());
        assert!(!orchestrator.intro_played());
    }

    #[test]
    fn test_missing_target_frame_is_skipped() {
        let mut timeline = sample();
        timeline.actions[0].frame_index = 99;
        timeline.actions.truncate(1);
        let mut orchestrator = Orchestrator::new(quiet());
        orchestrator.load(timeline);
        orchestrator.set_playing(true);
        orchestrator.advance(0.0);

        assert!(orchestrator.is_finished());
        assert_eq!(orchestrator.action_index(), 1);
        assert_eq!(orchestrator.phase(), Phase::Idle);
        assert!(orchestrator.view().active_action.is_none());
    }

    #[test]
    fn test_stepping_only_while_paused() {
        let mut orchestrator = playing(quiet());
        assert!(!orchestrator.step_next());

        orchestrator.set_playing(false);
        assert!(orchestrator.step_next());
        assert!(orchestrator.step_next());
        assert!(orchestrator.step_next());
        assert_eq!(orchestrator.frame_index(), 3);
        assert_eq!(orchestrator.action_index(), 1);
        assert!(orchestrator.step_prev());
        assert_eq!(orchestrator.frame_index(), 2);

        orchestrator.seek(500);
        assert_eq!(orchestrator.frame_index(), 7);
        assert_eq!(orchestrator.action_index(), 2);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut orchestrator = Orchestrator::new(quiet());
        orchestrator.set_speed(1000.0);
        assert_eq!(orchestrator.speed(), 100.0);
        orchestrator.set_speed(0.0);
        assert_eq!(orchestrator.speed(), 0.25);
    }

    #[test]
    fn test_live_mode_accepts_pushed_state() {
        let mut orchestrator = playing(quiet());
        let payload = json!({"tick": 9, "players": [{"player_id": "x", "hp": 2}]});
        assert!(!orchestrator.push_live_state(&payload));

        orchestrator.set_mode(Mode::Live);
        assert_eq!(orchestrator.next_due_ms(), None);
        assert!(orchestrator.push_live_state(&payload));
        assert_eq!(orchestrator.view().state.tick, 9);
        assert_eq!(orchestrator.view().mode, Mode::Live);
    }
}
