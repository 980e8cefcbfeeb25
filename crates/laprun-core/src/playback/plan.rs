//! Per-action step plan.
//!
//! Built once when an action begins, from the immutable timeline. Holds and
//! gaps are stored at 1x speed; the orchestrator scales them as it
//! schedules each step.

use laprun_proto::{FrameLabel, ON_AIR_PREFIX, Timeline};

use super::intro::IntroBeat;
use super::phase::Phase;
use crate::config::PlaybackConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Intro { beat: usize },
    RoundBanner { tick: i64 },
    /// Index into the timeline's discussion list.
    Discussion { index: usize },
    Dice,
    Sight,
    Sync,
    Move,
    /// Coalesced run of consecutive `truck_moved` frames, inclusive.
    TruckRun { first: usize, last: usize },
    Hit { frame: usize },
    Commentary { frame: usize },
}

impl Step {
    pub fn phase(&self) -> Phase {
        match self {
            Step::Intro { .. } | Step::Discussion { .. } => Phase::Discussion,
            Step::RoundBanner { .. } => Phase::Idle,
            Step::Dice => Phase::Dice,
            Step::Sight => Phase::Sight,
            Step::Sync => Phase::Sync,
            Step::Move => Phase::Move,
            Step::TruckRun { .. } | Step::Hit { .. } | Step::Commentary { .. } => Phase::Impact,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub step: Step,
    pub hold_ms: f64,
    pub gap_ms: f64,
}

/// End (exclusive) of the impact window following `action_index`'s move.
pub fn impact_window_end(timeline: &Timeline, action_index: usize) -> usize {
    timeline
        .actions
        .get(action_index + 1)
        .map_or(timeline.frames.len(), |next| next.frame_index)
        .min(timeline.frames.len())
}

fn commentator_message(timeline: &Timeline, frame: usize) -> Option<&str> {
    timeline
        .frame(frame)
        .and_then(|f| f.state.commentator())
        .map(|c| c.message.as_str())
}

/// True when the event behind `frame` put a new on-air line in the log.
fn went_on_air(timeline: &Timeline, frame: usize) -> bool {
    let Some(current) = timeline.frame(frame) else {
        return false;
    };
    let fresh = frame
        .checked_sub(1)
        .and_then(|p| timeline.frame(p))
        .is_none_or(|previous| previous.state.logs != current.state.logs);
    fresh
        && current
            .state
            .logs
            .last()
            .is_some_and(|line| line.starts_with(ON_AIR_PREFIX))
}

/// Impact steps for the frames strictly between the landing frame and the
/// next action's frame.
fn impact_steps(timeline: &Timeline, action_index: usize, config: &PlaybackConfig) -> Vec<PlannedStep> {
    let Some(action) = timeline.actions.get(action_index) else {
        return Vec::new();
    };
    let end = impact_window_end(timeline, action_index);
    let mut steps = Vec::new();
    let mut truck_run: Option<(usize, usize)> = None;

    let flush = |run: &mut Option<(usize, usize)>, steps: &mut Vec<PlannedStep>| {
        if let Some((first, last)) = run.take() {
            let count = (last - first + 1) as f64;
            steps.push(PlannedStep {
                step: Step::TruckRun { first, last },
                hold_ms: (config.truck_step_ms * count).max(config.truck_min_ms),
                gap_ms: config.phase_gap_ms,
            });
        }
    };

    for index in (action.frame_index + 1)..end {
        let label = timeline.frames[index].label;
        if !label.is_impact() {
            continue;
        }
        match label {
            FrameLabel::TruckMoved => {
                truck_run = Some(truck_run.map_or((index, index), |(first, _)| (first, index)));
            }
            FrameLabel::PlayerHit => {
                flush(&mut truck_run, &mut steps);
                steps.push(PlannedStep {
                    step: Step::Hit { frame: index },
                    hold_ms: config.hit_ms,
                    gap_ms: config.phase_gap_ms,
                });
            }
            FrameLabel::CommentatorBroadcast => {
                flush(&mut truck_run, &mut steps);
                let message = commentator_message(timeline, index).unwrap_or("");
                if message.is_empty() || !went_on_air(timeline, index) {
                    continue;
                }
                steps.push(PlannedStep {
                    step: Step::Commentary { frame: index },
                    hold_ms: config.dialogue_ms(message.chars().count()) * config.commentator_multiplier,
                    gap_ms: config.phase_gap_ms,
                });
            }
            _ => {}
        }
    }
    flush(&mut truck_run, &mut steps);
    steps
}

/// Plans every step of `action_index`, optionally preceded by the intro.
///
/// The round banner and the tick's discussion batch only play when the
/// action opens a new tick.
pub fn build_plan(
    timeline: &Timeline,
    action_index: usize,
    intro: &[IntroBeat],
    config: &PlaybackConfig,
) -> Vec<PlannedStep> {
    let Some(action) = timeline.actions.get(action_index) else {
        return Vec::new();
    };
    let mut plan = Vec::new();

    for (beat, line) in intro.iter().enumerate() {
        plan.push(PlannedStep {
            step: Step::Intro { beat },
            hold_ms: config.dialogue_ms(line.discussion.message.chars().count()),
            gap_ms: config.discussion_gap_ms,
        });
    }

    let previous_tick = action_index
        .checked_sub(1)
        .and_then(|i| timeline.actions.get(i))
        .map(|a| a.tick);
    if previous_tick != Some(action.tick) {
        plan.push(PlannedStep {
            step: Step::RoundBanner { tick: action.tick },
            hold_ms: config.round_banner_ms,
            gap_ms: config.phase_gap_ms,
        });
        for (index, discussion) in timeline.discussions_for_tick(action.tick) {
            plan.push(PlannedStep {
                step: Step::Discussion { index },
                hold_ms: config.dialogue_ms(discussion.message.chars().count()),
                gap_ms: config.discussion_gap_ms,
            });
        }
    }

    for (step, hold_ms) in [
        (Step::Dice, config.dice_ms),
        (Step::Sight, config.sight_ms),
        (Step::Sync, config.sync_ms),
        (Step::Move, config.move_ms),
    ] {
        plan.push(PlannedStep {
            step,
            hold_ms,
            gap_ms: config.phase_gap_ms,
        });
    }

    plan.extend(impact_steps(timeline, action_index, config));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use laprun_proto::{
        Delivery, Direction, GameState, LogRing, PlayerState, ReplayAction, ReplayDiscussion,
        ReplayFrame,
    };

    fn frame(label: FrameLabel, commentary: &str, on_air: usize) -> ReplayFrame {
        let mut state = GameState::default();
        let mut c = PlayerState::new("commentator", "Commentator", 3);
        c.message = commentary.to_string();
        state.players.push(c);
        for _ in 0..on_air {
            state.logs.push(format!("{ON_AIR_PREFIX} Commentator: {commentary}"));
        }
        ReplayFrame { state, label }
    }

    fn action(tick: i64, frame_index: usize) -> ReplayAction {
        ReplayAction {
            tick,
            agent_id: "a".into(),
            ai_name: "A".into(),
            steps: 2,
            direction: Direction::Forward,
            message: String::new(),
            discussion_message: String::new(),
            action_message: String::new(),
            frame_index,
        }
    }

    fn timeline() -> Timeline {
        Timeline {
            frames: vec![
                frame(FrameLabel::GameStarted, "", 0),
                frame(FrameLabel::DiscussionResponse, "", 0),
                frame(FrameLabel::PlayerMoved, "", 0),
                frame(FrameLabel::TruckMoved, "", 0),
                frame(FrameLabel::TruckMoved, "", 0),
                frame(FrameLabel::CommentatorBroadcast, "Ouch!", 1),
                frame(FrameLabel::TurnFinished, "Ouch!", 1),
                frame(FrameLabel::CommentatorBroadcast, "Ouch!", 1),
                frame(FrameLabel::PlayerHit, "Ouch!", 1),
                frame(FrameLabel::PlayerMoved, "Ouch!", 1),
                frame(FrameLabel::PlayerMoved, "Ouch!", 1),
            ],
            actions: vec![action(1, 2), action(1, 9), action(2, 10)],
            discussions: vec![ReplayDiscussion {
                tick: 1,
                agent_id: "a".into(),
                ai_name: "A".into(),
                message: "hi".into(),
                delivery: Delivery::Public,
                targets: vec![],
                frame_index: 1,
            }],
        }
    }

    fn steps(plan: &[PlannedStep]) -> Vec<Step> {
        plan.iter().map(|p| p.step.clone()).collect()
    }

    #[test]
    fn test_first_action_full_pipeline() {
        let config = PlaybackConfig::default();
        let plan = build_plan(&timeline(), 0, &[], &config);
        assert_eq!(
            steps(&plan),
            vec![
                Step::RoundBanner { tick: 1 },
                Step::Discussion { index: 0 },
                Step::Dice,
                Step::Sight,
                Step::Sync,
                Step::Move,
                Step::TruckRun { first: 3, last: 4 },
                Step::Commentary { frame: 5 },
                Step::Hit { frame: 8 },
            ]
        );
        assert_eq!(plan[6].hold_ms, 320.0);
        assert_eq!(plan[7].hold_ms, config.dialogue_ms(5) * 3.0);
    }

    #[test]
    fn test_repeated_broadcast_still_holds() {
        let mut tl = timeline();
        tl.frames[7] = frame(FrameLabel::CommentatorBroadcast, "Ouch!", 2);
        tl.frames[8] = frame(FrameLabel::PlayerHit, "Ouch!", 2);
        let plan = build_plan(&tl, 0, &[], &PlaybackConfig::default());
        let commentary: Vec<Step> = steps(&plan)
            .into_iter()
            .filter(|s| matches!(s, Step::Commentary { .. }))
            .collect();
        assert_eq!(
            commentary,
            vec![Step::Commentary { frame: 5 }, Step::Commentary { frame: 7 }]
        );
    }

    #[test]
    fn test_broadcast_without_on_air_line_is_skipped() {
        let mut tl = timeline();
        // Commentator text set by an earlier response, broadcast left no line.
        tl.frames[5] = frame(FrameLabel::CommentatorBroadcast, "Ouch!", 0);
        for later in tl.frames.iter_mut().skip(6) {
            later.state.logs = LogRing::default();
        }
        let plan = build_plan(&tl, 0, &[], &PlaybackConfig::default());
        assert!(!steps(&plan).iter().any(|s| matches!(s, Step::Commentary { .. })));
    }

    #[test]
    fn test_same_tick_skips_banner_and_discussion() {
        let plan = build_plan(&timeline(), 1, &[], &PlaybackConfig::default());
        assert_eq!(steps(&plan)[0], Step::Dice);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_short_truck_run_uses_minimum() {
        let mut tl = timeline();
        tl.frames[4].label = FrameLabel::TurnFinished;
        let plan = build_plan(&tl, 0, &[], &PlaybackConfig::default());
        let run = plan.iter().find(|p| matches!(p.step, Step::TruckRun { .. })).unwrap();
        assert_eq!(run.step, Step::TruckRun { first: 3, last: 3 });
        assert_eq!(run.hold_ms, 220.0);
    }

    #[test]
    fn test_last_action_window_runs_to_end() {
        let tl = timeline();
        assert_eq!(impact_window_end(&tl, 2), tl.frames.len());
        assert_eq!(impact_window_end(&tl, 0), 9);
    }
}
