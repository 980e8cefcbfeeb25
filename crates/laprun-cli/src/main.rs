//! laprun: reconstruct and replay circular-track survival matches.

mod completions;
mod display;

use std::io::{IsTerminal, stdout};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use laprun_core::{
    LaprunConfig, Orchestrator, Phase, PlaybackCommand, PlaybackDriver, PlaybackView, Reconstructor,
};
use laprun_proto::{Timeline, classify_outcome, load_document, standings};
use serde_json::json;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG: &str = "laprun.yml";

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Output format for commands that print structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON for scripting
    Json,
}

/// laprun - replay reconstruction and playback for truck-chase matches
#[derive(Parser, Debug)]
#[command(name = "laprun", version, about, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./laprun.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconstruct an export and print the timeline
    Inspect(InspectArgs),

    /// Play an export back headlessly, printing phases and cues
    Play(PlayArgs),

    /// Classify the final state of an export
    Outcome(OutcomeArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Replay export (JSON)
    file: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Replay export (JSON)
    file: PathBuf,

    /// Playback speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Skip the scripted rules intro
    #[arg(long)]
    skip_intro: bool,

    /// Run on a virtual clock instead of wall time
    #[arg(long)]
    instant: bool,
}

#[derive(Parser, Debug)]
struct OutcomeArgs {
    /// Replay export (JSON)
    file: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let use_colors = cli.color.should_use_colors();
    if !use_colors {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Inspect(args) => {
            let config = load_config(cli.config.as_deref())?;
            inspect_command(&config, &args, use_colors)
        }
        Commands::Play(args) => {
            let config = load_config(cli.config.as_deref())?;
            play_command(config, &args, use_colors).await
        }
        Commands::Outcome(args) => {
            let config = load_config(cli.config.as_deref())?;
            outcome_command(&config, &args, use_colors)
        }
        Commands::Completions(args) => {
            completions::generate_completions(&args);
            Ok(())
        }
    }
}

/// Loads configuration, falling back to defaults when no file exists.
fn load_config(explicit: Option<&Path>) -> Result<LaprunConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG),
    };
    if !path.exists() {
        if explicit.is_some() {
            warn!(path = %path.display(), "Config file not found, using defaults");
        } else {
            debug!("No {} found, using defaults", DEFAULT_CONFIG);
        }
        return Ok(LaprunConfig::default());
    }
    let config = LaprunConfig::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn load_timeline(config: &LaprunConfig, file: &Path) -> Result<Timeline> {
    let raw = load_document(file).with_context(|| format!("Failed to read replay {}", file.display()))?;
    Ok(Reconstructor::new(config.reconstruct.clone()).reconstruct(&raw))
}

fn inspect_command(config: &LaprunConfig, args: &InspectArgs, use_colors: bool) -> Result<()> {
    let timeline = load_timeline(config, &args.file)?;
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }
        OutputFormat::Table => {
            if timeline.is_empty() {
                println!("No replayable events in {}", args.file.display());
                return Ok(());
            }
            print!("{}", display::summary(&timeline, use_colors));
        }
    }
    Ok(())
}

fn outcome_command(config: &LaprunConfig, args: &OutcomeArgs, use_colors: bool) -> Result<()> {
    let timeline = load_timeline(config, &args.file)?;
    let Some(state) = timeline.last_state() else {
        println!("No replayable events in {}", args.file.display());
        return Ok(());
    };
    let outcome = classify_outcome(state);
    let ranked = standings(state);
    match args.format {
        OutputFormat::Json => {
            let value = json!({
                "outcome": outcome.to_string(),
                "tick": state.tick,
                "standings": ranked,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => print!("{}", display::outcome(&outcome, &ranked, state, use_colors)),
    }
    Ok(())
}

async fn play_command(mut config: LaprunConfig, args: &PlayArgs, use_colors: bool) -> Result<()> {
    if args.skip_intro {
        config.playback.intro = false;
    }
    let timeline = load_timeline(&config, &args.file)?;
    if timeline.is_empty() {
        println!("No replayable events in {}", args.file.display());
        return Ok(());
    }
    let final_state = timeline.last_state().cloned();

    let mut orchestrator = Orchestrator::new(config.playback.clone());
    if args.instant {
        play_virtual(&mut orchestrator, timeline, args.speed, use_colors);
    } else {
        play_realtime(orchestrator, timeline, args.speed, use_colors).await?;
    }

    if let Some(state) = final_state {
        println!();
        print!(
            "{}",
            display::outcome(&classify_outcome(&state), &standings(&state), &state, use_colors)
        );
    }
    Ok(())
}

/// Tracks the last printed view so only phase or action changes are shown.
#[derive(Default)]
struct TransitionPrinter {
    last: Option<(Phase, usize, bool)>,
}

impl TransitionPrinter {
    fn observe(&mut self, at_ms: f64, view: &PlaybackView, use_colors: bool) {
        let key = (view.phase, view.action_index, view.active_discussion.is_some());
        if self.last == Some(key) || (!view.playing && !view.finished) {
            return;
        }
        self.last = Some(key);
        println!("{}", display::transition(at_ms, view, use_colors));
    }
}

/// Drives playback on a virtual clock, jumping straight to each due timer.
fn play_virtual(orchestrator: &mut Orchestrator, timeline: Timeline, speed: Option<f64>, use_colors: bool) {
    orchestrator.load(timeline);
    if let Some(speed) = speed {
        orchestrator.set_speed(speed);
    }
    orchestrator.set_playing(true);

    let mut printer = TransitionPrinter::default();
    while let Some(due) = orchestrator.next_due_ms() {
        orchestrator.advance(due);
        for cue in orchestrator.drain_cues() {
            println!("{}", display::cue_line(due, &cue, use_colors));
        }
        printer.observe(due, &orchestrator.view(), use_colors);
        if orchestrator.is_finished() {
            break;
        }
    }
    info!(elapsed_ms = orchestrator.now_ms(), "Virtual playback finished");
}

/// Drives playback in wall time until it finishes or ctrl-c arrives.
async fn play_realtime(
    orchestrator: Orchestrator,
    timeline: Timeline,
    speed: Option<f64>,
    use_colors: bool,
) -> Result<()> {
    let frame_rate = orchestrator.config().frame_rate;
    let handle = PlaybackDriver::spawn(orchestrator, frame_rate);
    let mut cues = handle.subscribe_cues();
    let mut view = handle.view();

    handle.send(PlaybackCommand::Load(Box::new(timeline))).await?;
    if let Some(speed) = speed {
        handle.send(PlaybackCommand::SetSpeed(speed)).await?;
    }
    handle.send(PlaybackCommand::Play).await?;

    let started = tokio::time::Instant::now();
    let elapsed_ms = || started.elapsed().as_secs_f64() * 1000.0;
    let mut printer = TransitionPrinter::default();

    loop {
        tokio::select! {
            cue = cues.recv() => match cue {
                Ok(cue) => println!("{}", display::cue_line(elapsed_ms(), &cue, use_colors)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Cue output lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                printer.observe(elapsed_ms(), &current, use_colors);
                if current.finished {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping playback");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_play_flags() {
        let cli = Cli::try_parse_from([
            "laprun", "play", "match.json", "--speed", "2", "--skip-intro", "--color", "never",
        ])
        .unwrap();
        assert_eq!(cli.color, ColorMode::Never);
        let Commands::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.speed, Some(2.0));
        assert!(args.skip_intro);
        assert!(!args.instant);
    }

    #[test]
    fn test_parse_inspect_json_with_global_config() {
        let cli = Cli::try_parse_from(["laprun", "inspect", "m.json", "--format", "json", "-c", "x.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yml")));
        assert!(matches!(
            cli.command,
            Commands::Inspect(InspectArgs { format: OutputFormat::Json, .. })
        ));
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["laprun"]).is_err());
    }

    #[test]
    fn test_missing_explicit_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.yml"))).unwrap();
        assert_eq!(config.playback.speed, LaprunConfig::default().playback.speed);
    }

    #[test]
    fn test_load_config_and_timeline_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("laprun.yml");
        std::fs::write(&config_path, "playback:\n  speed: 2.0\n").unwrap();
        let config = load_config(Some(&config_path)).unwrap();
        assert_eq!(config.playback.speed, 2.0);

        let replay_path = dir.path().join("match.json");
        let mut file = std::fs::File::create(&replay_path).unwrap();
        write!(
            file,
            r#"{{"core_messages": [
                {{"turn": 0, "event": "game_started", "payload": {{"players": [{{"agent_id": "a", "hp": 3}}]}}}},
                {{"turn": 1, "event": "player_moved", "payload": {{"agent_id": "a", "steps": 2, "to": 2}}}}
            ]}}"#
        )
        .unwrap();
        let timeline = load_timeline(&config, &replay_path).unwrap();
        assert_eq!(timeline.actions.len(), 1);
    }

    #[test]
    fn test_bad_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "playback: [not, a, map").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yml"));
    }

    #[test]
    fn test_virtual_playback_finishes() {
        let raw = json!({"core_messages": [
            {"turn": 0, "event": "game_started", "payload": {"players": [{"agent_id": "a", "hp": 3}]}},
            {"turn": 1, "event": "player_moved", "payload": {"agent_id": "a", "steps": 1, "to": 1}}
        ]});
        let timeline = Reconstructor::default().reconstruct(&raw);
        let mut orchestrator = Orchestrator::new(laprun_core::PlaybackConfig::default());
        play_virtual(&mut orchestrator, timeline, Some(8.0), false);
        assert!(orchestrator.is_finished());
    }
}
