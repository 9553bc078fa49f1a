//! Playback pipeline and the player thread.
//!
//! The editing side never touches the pipeline directly. It sends commands
//! to a dedicated player thread over a channel; committed arrangements
//! travel as immutable `Arc<TimelineSnapshot>` values. Queries read the
//! pipeline state behind a mutex.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use splice_core::{RationalTime, Result, SpliceError};
use tracing::{debug, info, warn};

use crate::snapshot::TimelineSnapshot;

/// Playback state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Null,
    Ready,
    Paused,
    Playing,
}

/// A playback/render backend driven by the player thread.
pub trait Pipeline: Send {
    /// Replace the arrangement being played.
    fn set_timeline(&mut self, arrangement: Arc<TimelineSnapshot>);
    fn duration(&self) -> RationalTime;
    fn position(&self) -> RationalTime;
    fn seek(&mut self, position: RationalTime);
    fn state(&self) -> PlaybackState;
    fn set_state(&mut self, state: PlaybackState);
}

/// Pipeline that renders nothing. It tracks the published arrangement,
/// position and state, which is all editing and tests need.
#[derive(Debug, Default)]
pub struct HeadlessPipeline {
    arrangement: Option<Arc<TimelineSnapshot>>,
    position: RationalTime,
    state: PlaybackState,
}

impl HeadlessPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrangement(&self) -> Option<&Arc<TimelineSnapshot>> {
        self.arrangement.as_ref()
    }
}

impl Pipeline for HeadlessPipeline {
    fn set_timeline(&mut self, arrangement: Arc<TimelineSnapshot>) {
        let duration = arrangement.duration();
        self.arrangement = Some(arrangement);
        if self.position > duration {
            self.position = duration;
        }
    }

    fn duration(&self) -> RationalTime {
        self.arrangement
            .as_ref()
            .map_or(RationalTime::ZERO, |a| a.duration())
    }

    fn position(&self) -> RationalTime {
        self.position
    }

    fn seek(&mut self, position: RationalTime) {
        self.position = position.max(RationalTime::ZERO).min(self.duration());
    }

    fn state(&self) -> PlaybackState {
        self.state
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }
}

// ── Player thread ───────────────────────────────────────────────

enum PlayerCommand {
    Publish {
        arrangement: Arc<TimelineSnapshot>,
        ack: Option<Sender<()>>,
    },
    Seek(RationalTime),
    SetState(PlaybackState),
    Shutdown,
}

type SharedPipeline = Arc<Mutex<Box<dyn Pipeline>>>;

struct Worker {
    commands: Sender<PlayerCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                warn!("player thread panicked");
            }
        }
    }
}

/// Handle to a pipeline running on its own thread.
///
/// Cloning shares the same thread; it stops when the last clone drops.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: Sender<PlayerCommand>,
    pipeline: SharedPipeline,
    _worker: Arc<Worker>,
}

impl PlayerHandle {
    /// Start a player thread driving `pipeline`.
    pub fn spawn(pipeline: impl Pipeline + 'static) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let pipeline: SharedPipeline = Arc::new(Mutex::new(Box::new(pipeline)));
        let shared = Arc::clone(&pipeline);

        let thread = thread::Builder::new()
            .name("splice-player".into())
            .spawn(move || run(rx, shared))
            .map_err(|e| SpliceError::Player(format!("failed to start player thread: {}", e)))?;
        info!("player thread started");

        Ok(Self {
            commands: tx.clone(),
            pipeline,
            _worker: Arc::new(Worker {
                commands: tx,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Queue an arrangement for the pipeline without waiting.
    pub fn publish(&self, arrangement: Arc<TimelineSnapshot>) -> Result<()> {
        self.send(PlayerCommand::Publish {
            arrangement,
            ack: None,
        })
    }

    /// Hand an arrangement to the pipeline and block until it is installed.
    pub fn publish_sync(&self, arrangement: Arc<TimelineSnapshot>) -> Result<()> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(PlayerCommand::Publish {
            arrangement,
            ack: Some(ack_tx),
        })?;
        ack_rx
            .recv()
            .map_err(|_| SpliceError::Player("player thread stopped before acknowledging".into()))
    }

    pub fn seek(&self, position: RationalTime) -> Result<()> {
        self.send(PlayerCommand::Seek(position))
    }

    pub fn set_state(&self, state: PlaybackState) -> Result<()> {
        self.send(PlayerCommand::SetState(state))
    }

    /// Bring the pipeline to the paused state, ready to show frames.
    pub fn prepare(&self) -> Result<()> {
        self.set_state(PlaybackState::Paused)
    }

    pub fn play(&self) -> Result<()> {
        self.set_state(PlaybackState::Playing)
    }

    pub fn pause(&self) -> Result<()> {
        self.set_state(PlaybackState::Paused)
    }

    /// Duration of the last installed arrangement.
    pub fn duration(&self) -> RationalTime {
        self.pipeline.lock().duration()
    }

    pub fn position(&self) -> RationalTime {
        self.pipeline.lock().position()
    }

    pub fn state(&self) -> PlaybackState {
        self.pipeline.lock().state()
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SpliceError::Player("player thread is not running".into()))
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("queued", &self.commands.len())
            .finish()
    }
}

fn run(commands: Receiver<PlayerCommand>, pipeline: SharedPipeline) {
    for command in commands.iter() {
        match command {
            PlayerCommand::Publish { arrangement, ack } => {
                let duration = arrangement.duration();
                pipeline.lock().set_timeline(arrangement);
                debug!(duration = %duration, "arrangement installed");
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            PlayerCommand::Seek(position) => pipeline.lock().seek(position),
            PlayerCommand::SetState(state) => {
                debug!(?state, "pipeline state change");
                pipeline.lock().set_state(state);
            }
            PlayerCommand::Shutdown => break,
        }
    }
    info!("player thread stopped");
}
