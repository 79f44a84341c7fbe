//! Line-oriented operator shell over the recorder and playback controllers.
mod command;

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use lapreplay::domain::time::format_hms_millis;
use lapreplay::domain::{PlayQueue, Replay};
use lapreplay::error::{AppResult, ValidationError};
use lapreplay::playback::{FanOutReport, PlaybackController, PlaybackState};
use lapreplay::recorder::{RecordingController, SaveOutcome};
use lapreplay::remote::{RemoteControl, catalog};

use crate::shutdown_handlers::ShutdownReceiver;

use command::{Command, HELP, parse_command};

/// A replay saved during this session.
struct SavedReplay {
    replay: Replay,
    saved_at: DateTime<Local>,
}

pub(crate) struct Console<'ctl> {
    remote: Arc<dyn RemoteControl>,
    recorder: &'ctl RecordingController,
    playback: Arc<PlaybackController>,
    replays: Vec<SavedReplay>,
}

impl<'ctl> Console<'ctl> {
    pub(crate) fn new(
        remote: Arc<dyn RemoteControl>,
        recorder: &'ctl RecordingController,
        playback: Arc<PlaybackController>,
    ) -> Self {
        Self {
            remote,
            recorder,
            playback,
            replays: Vec::new(),
        }
    }

    /// Reads commands until EOF, `quit` or shutdown.
    pub(crate) async fn run(
        mut self,
        mut saved: mpsc::UnboundedReceiver<Replay>,
        mut shutdown_rx: ShutdownReceiver,
    ) -> AppResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Type 'help' for the command list.");
        let mut saved_open = true;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
                replay = saved.recv(), if saved_open => match replay {
                    Some(replay) => self.on_saved(replay),
                    None => saved_open = false,
                },
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match parse_command(&line) {
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(command)) => self.execute(command).await,
                        Ok(None) => {}
                        Err(err) => println!("{}", err),
                    }
                }
            }
        }
        Ok(())
    }

    fn on_saved(&mut self, replay: Replay) {
        let number = self.replays.len().saturating_add(1);
        println!(
            "Replay #{} saved: {} ({} lap(s))",
            number,
            replay.path,
            replay.laps.len()
        );
        self.replays.push(SavedReplay {
            replay,
            saved_at: Local::now(),
        });
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::Toggle => {
                if let Err(err) = self.recorder.toggle_buffer().await {
                    println!("{}", err);
                }
            }
            Command::Lap => match self.recorder.add_lap() {
                Some(lap) => println!(
                    "Lap at {}",
                    format_hms_millis(i64::try_from(lap.time_ms).unwrap_or(i64::MAX))
                ),
                None => println!("Replay buffer is {}; lap ignored", self.recorder.status()),
            },
            Command::Save => self.save().await,
            Command::Replays => self.list_replays(),
            Command::Queue(number) => self.queue(number),
            Command::Prepare => self.spawn_prepare(),
            Command::Start => self.spawn_start(),
            Command::Next => self.spawn_next(),
            Command::Abort => match self.playback.abort().await {
                Ok(report) => log_report(&report),
                Err(err) => println!("{}", err),
            },
            Command::Preview(enabled) => {
                if let Err(err) = self.playback.set_preview_only(enabled) {
                    println!("{}", err);
                }
            }
            Command::Status => self.print_status(),
            Command::Scenes => match catalog::list_scenes(self.remote.as_ref()).await {
                Ok(scenes) => {
                    for scene in scenes {
                        println!("  {}", scene);
                    }
                }
                Err(err) => error!("Failed to list scenes: {}", err),
            },
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
    }

    async fn save(&self) {
        match self.recorder.save().await {
            Ok(SaveOutcome::Requested { laps }) => println!("Saving replay with {} lap(s)", laps),
            Ok(SaveOutcome::ReplacedPendingStash { discarded }) => println!(
                "Saving replay; {} lap(s) of an unconfirmed save were dropped",
                discarded.len()
            ),
            Ok(SaveOutcome::CommandFailed { source }) => {
                println!("Save failed, laps kept for the next save: {}", source);
            }
            Err(err) => println!("{}", err),
        }
    }

    fn list_replays(&self) {
        if self.replays.is_empty() {
            println!("No replays saved yet");
            return;
        }
        for (index, saved) in self.replays.iter().enumerate() {
            println!(
                "  #{} {} {} ({} lap(s))",
                index.saturating_add(1),
                saved.saved_at.format("%H:%M:%S"),
                saved.replay.file_stem(),
                saved.replay.laps.len()
            );
        }
    }

    fn queue(&self, number: usize) {
        match self.build_queue(number) {
            Ok(queue) => {
                let len = queue.len();
                match self.playback.set_queue(queue) {
                    Ok(()) => println!("Queued {} segment(s) from replay #{}", len, number),
                    Err(err) => println!("{}", err),
                }
            }
            Err(err) => println!("{}", err),
        }
    }

    fn build_queue(&self, number: usize) -> Result<PlayQueue, ValidationError> {
        let saved = number
            .checked_sub(1)
            .and_then(|index| self.replays.get(index))
            .ok_or(ValidationError::UnknownReplay {
                number,
                available: self.replays.len(),
            })?;
        Ok(PlayQueue::from_replay(&saved.replay))
    }

    fn spawn_prepare(&self) {
        let playback = Arc::clone(&self.playback);
        tokio::spawn(async move {
            match playback.prepare().await {
                Ok(report) => {
                    log_report(&report);
                    println!("Ready");
                }
                Err(err) => println!("{}", err),
            }
        });
    }

    fn spawn_start(&self) {
        let playback = Arc::clone(&self.playback);
        tokio::spawn(async move {
            match playback.start().await {
                Ok(report) => log_report(&report),
                Err(err) => println!("{}", err),
            }
        });
    }

    fn spawn_next(&self) {
        let state = self.playback.state();
        let PlaybackState::Playing(index) = state else {
            println!("Playback is {}; nothing to advance", state);
            return;
        };
        let playback = Arc::clone(&self.playback);
        let next = index.saturating_add(1);
        tokio::spawn(async move {
            if let Err(err) = playback.play_item(next).await {
                println!("{}", err);
            }
        });
    }

    fn print_status(&self) {
        println!("Buffer:   {}", self.recorder.status());
        let laps = self.recorder.laps();
        if !laps.is_empty() {
            let times: Vec<String> = laps
                .iter()
                .map(|lap| format_hms_millis(i64::try_from(lap.time_ms).unwrap_or(i64::MAX)))
                .collect();
            println!("Laps:     {}", times.join(", "));
        }
        if let Some(remaining) = self.recorder.remaining_ms() {
            println!("Autosave: in {}", format_hms_millis(remaining));
        }
        if self.recorder.has_unsaved_stash() {
            println!("Save:     waiting for the mixer");
        }
        let state = self.playback.state();
        match (self.playback.current_item(), self.playback.position_ms()) {
            (Some(item), Some(position)) => println!(
                "Playback: {} {} at {} ms of {} ms",
                state, item.name, position, item.duration_ms
            ),
            (Some(item), None) => println!("Playback: {} {}", state, item.name),
            (None, _) => println!("Playback: {}", state),
        }
        println!(
            "Queue:    {} segment(s){}",
            self.playback.queue().len(),
            if self.playback.preview_only() {
                ", preview only"
            } else {
                ""
            }
        );
    }
}

fn log_report(report: &FanOutReport) {
    for entry in &report.reports {
        match &entry.result {
            Ok(outcome) if outcome.is_completed() => {
                info!("{} {}: {}", entry.adapter, report.step, outcome);
            }
            Ok(outcome) => warn!("{} {}: {}", entry.adapter, report.step, outcome),
            Err(err) => error!("{} {} failed: {}", entry.adapter, report.step, err),
        }
    }
}
