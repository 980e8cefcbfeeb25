//! Real-time driver: runs an [`Orchestrator`] on a tokio task.
//!
//! The task owns the orchestrator outright. Controls arrive over an mpsc
//! channel, the latest [`PlaybackView`] is published on a `watch` channel,
//! and cues fan out over a `broadcast` channel. Slow consumers never hold
//! the loop up: the view keeps only its newest value and lagging cue
//! receivers skip ahead.

use laprun_proto::Timeline;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use super::cue::Cue;
use super::orchestrator::{Orchestrator, PlaybackView};
use super::phase::Mode;

const COMMAND_CAPACITY: usize = 64;
const CUE_CAPACITY: usize = 256;

/// Playback controls accepted by the driver.
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    Load(Box<Timeline>),
    Play,
    Pause,
    SetSpeed(f64),
    SetMode(Mode),
    StepNext,
    StepPrev,
    Seek(usize),
    PushLiveState(Value),
    Shutdown,
}

impl PlaybackCommand {
    fn apply(self, orchestrator: &mut Orchestrator) {
        match self {
            PlaybackCommand::Load(timeline) => orchestrator.load(*timeline),
            PlaybackCommand::Play => orchestrator.set_playing(true),
            PlaybackCommand::Pause => orchestrator.set_playing(false),
            PlaybackCommand::SetSpeed(speed) => orchestrator.set_speed(speed),
            PlaybackCommand::SetMode(mode) => orchestrator.set_mode(mode),
            PlaybackCommand::StepNext => {
                orchestrator.step_next();
            }
            PlaybackCommand::StepPrev => {
                orchestrator.step_prev();
            }
            PlaybackCommand::Seek(frame) => {
                orchestrator.seek(frame);
            }
            PlaybackCommand::PushLiveState(payload) => {
                orchestrator.push_live_state(&payload);
            }
            PlaybackCommand::Shutdown => orchestrator.shutdown(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("playback driver has stopped")]
    Stopped,

    #[error("playback task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Caller's end of a running driver.
#[derive(Debug)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<PlaybackCommand>,
    view: watch::Receiver<PlaybackView>,
    cues: broadcast::Sender<Cue>,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    pub async fn send(&self, command: PlaybackCommand) -> Result<(), DriverError> {
        self.commands.send(command).await.map_err(|_| DriverError::Stopped)
    }

    /// Latest published view.
    pub fn view(&self) -> watch::Receiver<PlaybackView> {
        self.view.clone()
    }

    /// Cues emitted from now on.
    pub fn subscribe_cues(&self) -> broadcast::Receiver<Cue> {
        self.cues.subscribe()
    }

    /// Stops the driver and waits for its task to exit.
    pub async fn shutdown(self) -> Result<(), DriverError> {
        // The loop also exits when the sender drops, so a closed channel is fine.
        let _ = self.commands.send(PlaybackCommand::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}

pub struct PlaybackDriver;

impl PlaybackDriver {
    /// Spawns `orchestrator` on the current runtime, redrawing `frame_rate`
    /// times per second.
    pub fn spawn(orchestrator: Orchestrator, frame_rate: u32) -> PlaybackHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (view_tx, view_rx) = watch::channel(orchestrator.view());
        let (cue_tx, _) = broadcast::channel(CUE_CAPACITY);

        let task = tokio::spawn(run(orchestrator, frame_rate, command_rx, view_tx, cue_tx.clone()));

        PlaybackHandle {
            commands: command_tx,
            view: view_rx,
            cues: cue_tx,
            task,
        }
    }
}

async fn run(
    mut orchestrator: Orchestrator,
    frame_rate: u32,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    view: watch::Sender<PlaybackView>,
    cues: broadcast::Sender<Cue>,
) {
    let frame = Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1)));
    let mut ticker = interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let origin = Instant::now();
    let elapsed_ms = || origin.elapsed().as_secs_f64() * 1000.0;
    orchestrator.advance(elapsed_ms());

    info!(frame_rate, "Playback driver started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            command = commands.recv() => {
                // Commands take effect at the current instant.
                orchestrator.advance(elapsed_ms());
                match command {
                    None | Some(PlaybackCommand::Shutdown) => break,
                    Some(command) => {
                        debug!(?command, "Playback command");
                        command.apply(&mut orchestrator);
                    }
                }
            }
        }

        orchestrator.advance(elapsed_ms());
        for cue in orchestrator.drain_cues() {
            // No subscribers is not an error.
            let _ = cues.send(cue);
        }
        view.send_if_modified(|current| {
            let next = orchestrator.view();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    orchestrator.shutdown();
    view.send_replace(orchestrator.view());
    info!("Playback driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackConfig;
    use crate::playback::phase::Phase;
    use crate::reconstruct::reconstruct;
    use serde_json::json;

    fn timeline() -> Timeline {
        reconstruct(&json!({"core_messages": [
            {"turn": 0, "event": "game_started", "payload": {
                "players": [{"agent_id": "a", "position": 0, "hp": 3}]
            }},
            {"turn": 1, "event": "player_moved", "payload": {"agent_id": "a", "steps": 2, "to": 2}},
            {"turn": 1, "event": "truck_moved", "payload": {"position": 1}},
            {"turn": 1, "event": "player_hit", "payload": {"agent_id": "a", "hp": 0}}
        ]}))
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(PlaybackConfig {
            intro: false,
            ..PlaybackConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_completion() {
        let handle = PlaybackDriver::spawn(orchestrator(), 60);
        let mut cues = handle.subscribe_cues();
        let mut view = handle.view();

        handle.send(PlaybackCommand::Load(Box::new(timeline()))).await.unwrap();
        handle.send(PlaybackCommand::SetSpeed(4.0)).await.unwrap();
        handle.send(PlaybackCommand::Play).await.unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(600), view.wait_for(|v| v.finished))
            .await
            .expect("replay should finish")
            .unwrap()
            .clone();
        assert_eq!(finished.phase, Phase::Idle);
        assert_eq!(finished.state.player("a").unwrap().hp, 0);

        let first = cues.recv().await.unwrap();
        assert_eq!(first.kind, crate::playback::CueKind::RoundBanner { text: "Round 1".into() });

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_state() {
        let handle = PlaybackDriver::spawn(orchestrator(), 30);
        let view = handle.view();
        handle.send(PlaybackCommand::Load(Box::new(timeline()))).await.unwrap();
        handle.send(PlaybackCommand::Play).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.send(PlaybackCommand::Pause).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let paused = view.borrow().clone();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(*view.borrow(), paused);
        assert!(!paused.playing);
        assert_eq!(paused.phase, Phase::Idle);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_fail_after_shutdown() {
        let handle = PlaybackDriver::spawn(orchestrator(), 60);
        let commands = handle.commands.clone();
        handle.shutdown().await.unwrap();
        assert!(matches!(
            commands.send(PlaybackCommand::Play).await,
            Err(mpsc::error::SendError(_))
        ));
    }
}
