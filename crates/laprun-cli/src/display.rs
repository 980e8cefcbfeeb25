//! Terminal rendering for replay summaries, playback, and outcomes.

use colored::Colorize;
use laprun_core::{Cue, CueKind, Phase, PlaybackView};
use laprun_proto::{Delivery, GameState, Outcome, PlayerState, Timeline};

/// Truncates `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn heading(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn dim(text: &str, use_colors: bool) -> String {
    if use_colors {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Formats a millisecond timestamp as `mm:ss.mmm`.
pub fn clock(ms: f64) -> String {
    let total = ms.max(0.0).round() as u64;
    format!("{:02}:{:02}.{:03}", total / 60_000, (total / 1000) % 60, total % 1000)
}

/// Multi-line reconstruction summary.
pub fn summary(timeline: &Timeline, use_colors: bool) -> String {
    let mut out = String::new();
    let last = timeline.last_state();
    out.push_str(&heading("Replay summary", use_colors));
    out.push('\n');
    out.push_str(&format!(
        "  frames: {}  actions: {}  discussions: {}\n",
        timeline.frames.len(),
        timeline.actions.len(),
        timeline.discussions.len()
    ));
    if let Some(state) = last {
        out.push_str(&format!(
            "  track: {} cells  ticks: {}  racers: {}\n",
            state.track_length,
            state.tick,
            state.racers().count()
        ));
    }

    if !timeline.actions.is_empty() {
        out.push('\n');
        out.push_str(&heading(
            &format!("{:>4}  {:>4}  {:<14} {:>5}  {:<9} {:>5}  {}", "#", "tick", "agent", "steps", "direction", "frame", "message"),
            use_colors,
        ));
        out.push('\n');
        for (index, action) in timeline.actions.iter().enumerate() {
            out.push_str(&format!(
                "{:>4}  {:>4}  {:<14} {:>5}  {:<9} {:>5}  {}\n",
                index,
                action.tick,
                truncate(&action.ai_name, 14),
                action.steps,
                action.direction.to_string(),
                action.frame_index,
                dim(&truncate(&action.message, 60), use_colors)
            ));
        }
    }

    let private = timeline
        .discussions
        .iter()
        .filter(|d| d.delivery == Delivery::Private)
        .count();
    if !timeline.discussions.is_empty() {
        out.push_str(&format!(
            "\n  {} discussion lines ({} private)\n",
            timeline.discussions.len(),
            private
        ));
    }
    out
}

/// One line for a phase change during playback.
pub fn transition(at_ms: f64, view: &PlaybackView, use_colors: bool) -> String {
    let phase = view.phase.as_str().to_uppercase();
    let phase = if use_colors {
        match view.phase {
            Phase::Idle => phase.dimmed().to_string(),
            Phase::Move | Phase::Impact => phase.red().bold().to_string(),
            _ => phase.cyan().bold().to_string(),
        }
    } else {
        phase
    };

    let detail = match (&view.active_discussion, &view.active_action) {
        (Some(discussion), _) if view.phase == Phase::Discussion => {
            format!("{}: {}", discussion.ai_name, truncate(&discussion.message, 70))
        }
        (_, Some(action)) => format!(
            "{} {} {} (action {})",
            action.ai_name, action.direction, action.steps, view.action_index
        ),
        _ => String::new(),
    };
    format!("[{}] {phase:<10} {detail}", clock(at_ms))
}

/// One line for a cue.
pub fn cue_line(at_ms: f64, cue: &Cue, use_colors: bool) -> String {
    let text = cue.kind.to_string();
    let text = if use_colors {
        match cue.kind {
            CueKind::RoundBanner { .. } => text.yellow().bold().to_string(),
            CueKind::HitFlash { .. } | CueKind::FlyOut { .. } => text.red().to_string(),
            CueKind::OnAir { .. } => text.magenta().to_string(),
            _ => text.normal().to_string(),
        }
    } else {
        text
    };
    format!("[{}]   * {text}", clock(at_ms))
}

fn standing_line(rank: usize, player: &PlayerState) -> String {
    let status = if player.is_alive() { "alive" } else { "out" };
    format!("  {rank}. {:<16} hp {:>2}  {status}", truncate(&player.name, 16), player.hp)
}

/// Outcome headline followed by the standings table.
pub fn outcome(outcome: &Outcome, standings: &[&PlayerState], state: &GameState, use_colors: bool) -> String {
    let headline = outcome.to_string();
    let headline = if use_colors {
        match outcome {
            Outcome::NoSurvivors => headline.red().bold().to_string(),
            _ => headline.green().bold().to_string(),
        }
    } else {
        headline
    };

    let mut out = format!("{headline}\n");
    out.push_str(&dim(&format!("  after tick {}\n", state.tick), use_colors));
    for (rank, player) in standings.iter().enumerate() {
        out.push_str(&standing_line(rank + 1, player));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use laprun_proto::{classify_outcome, standings};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer message here", 10), "a longe...");
        assert_eq!(truncate("two\nlines", 20), "two lines");
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(0.0), "00:00.000");
        assert_eq!(clock(61_234.4), "01:01.234");
    }

    #[test]
    fn test_outcome_lists_standings() {
        let mut state = GameState::default();
        state.players.push(PlayerState::new("a", "Alice", 0));
        state.players.push(PlayerState::new("b", "Bob", 2));
        let result = classify_outcome(&state);
        let text = outcome(&result, &standings(&state), &state, false);

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("Bob"));
        assert!(lines[2].contains("1. Bob"));
        assert!(lines[3].contains("out"));
    }

    #[test]
    fn test_empty_summary_has_counts() {
        let text = summary(&Timeline::default(), false);
        assert!(text.contains("frames: 0"));
    }
}
