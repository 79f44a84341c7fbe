use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::{PlayQueue, PlayQueueItem};
use crate::error::{AdapterError, PlaybackError};

use super::{
    PlaybackAdapter, PlaybackController, PlaybackSession, PlaybackState, PlaybackTargets,
    StepOutcome, StepResult,
};

#[derive(Default)]
struct Script {
    fail_prepare: bool,
    block_start: bool,
    unconfigured: bool,
    prepare_delay: Duration,
    end_delay: Duration,
}

struct ScriptedAdapter {
    name: String,
    script: Script,
    calls: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    fn new(name: &str) -> Arc<Self> {
        Self::with_script(name, Script::default())
    }

    fn with_script(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PlaybackAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_configuration(&self) -> bool {
        !self.script.unconfigured
    }

    async fn prepare(&self, _session: &PlaybackSession, path: &str, first_start_ms: u64) -> StepResult {
        self.record(format!("prepare:{}:{}", path, first_start_ms));
        tokio::time::sleep(self.script.prepare_delay).await;
        if self.script.fail_prepare {
            return Err(AdapterError::Target {
                target: self.name.clone(),
                operation: "prepare",
                message: "media missing".to_owned(),
            });
        }
        Ok(StepOutcome::Completed)
    }

    async fn start(&self, session: &PlaybackSession) -> StepResult {
        if self.script.block_start {
            session.cancellation().cancelled().await;
            self.record("start:cancelled".to_owned());
            return Ok(StepOutcome::degraded("session cancelled"));
        }
        self.record("start".to_owned());
        Ok(StepOutcome::Completed)
    }

    async fn seek(&self, _session: &PlaybackSession, ms: u64) -> StepResult {
        self.record(format!("seek:{}", ms));
        Ok(StepOutcome::Completed)
    }

    async fn pause(&self, _session: &PlaybackSession) -> StepResult {
        self.record("pause".to_owned());
        Ok(StepOutcome::Completed)
    }

    async fn resume(&self, _session: &PlaybackSession) -> StepResult {
        self.record("resume".to_owned());
        Ok(StepOutcome::Completed)
    }

    async fn end(&self, _session: &PlaybackSession) -> StepResult {
        tokio::time::sleep(self.script.end_delay).await;
        self.record("end".to_owned());
        Ok(StepOutcome::Completed)
    }
}

fn two_laps() -> PlayQueue {
    PlayQueue::new(vec![
        PlayQueueItem {
            path: "/replays/a.mkv".to_owned(),
            name: "a #1".to_owned(),
            start_ms: 0,
            duration_ms: 3000,
        },
        PlayQueueItem {
            path: "/replays/a.mkv".to_owned(),
            name: "a #2".to_owned(),
            start_ms: 5000,
            duration_ms: 3000,
        },
    ])
}

fn program_only(adapter: &Arc<ScriptedAdapter>) -> PlaybackTargets {
    let program: Arc<dyn PlaybackAdapter> = adapter.clone();
    PlaybackTargets::new(Some(program), None)
}

async fn wait_for_state(
    states: &mut tokio::sync::watch::Receiver<PlaybackState>,
    target: PlaybackState,
) -> Result<(), String> {
    states
        .wait_for(|state| *state == target)
        .await
        .map(|_state| ())
        .map_err(|err| format!("state channel closed waiting for {}: {}", target, err))
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn two_segments_advance_on_countdown_then_end() -> Result<(), String> {
    let adapter = ScriptedAdapter::with_script(
        "program",
        Script {
            end_delay: Duration::from_millis(100),
            ..Script::default()
        },
    );
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    let mut states = controller.subscribe();

    let report = controller.prepare().await.map_err(|err| err.to_string())?;
    if !report.all_completed() || controller.state() != PlaybackState::Ready {
        return Err(format!("prepare failed: {:?} in {}", report, controller.state()));
    }

    let started = Instant::now();
    controller.start().await.map_err(|err| err.to_string())?;
    if controller.state() != PlaybackState::Playing(0) {
        return Err(format!("expected PLAYING(0), got {}", controller.state()));
    }

    wait_for_state(&mut states, PlaybackState::Playing(1)).await?;
    if started.elapsed() != Duration::from_millis(3000) {
        return Err(format!("second segment at {:?}", started.elapsed()));
    }
    if controller.position_ms() != Some(5000) {
        return Err(format!("unexpected position {:?}", controller.position_ms()));
    }

    wait_for_state(&mut states, PlaybackState::Ending).await?;
    if started.elapsed() != Duration::from_millis(6000) {
        return Err(format!("ending at {:?}", started.elapsed()));
    }
    wait_for_state(&mut states, PlaybackState::NotReady).await?;

    let expected = [
        "prepare:/replays/a.mkv:0",
        "start",
        "resume",
        "seek:5000",
        "resume",
        "pause",
        "end",
    ];
    if adapter.calls() != expected {
        return Err(format!("unexpected calls {:?}", adapter.calls()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn run_is_restartable_after_ending() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    let mut states = controller.subscribe();

    for _ in 0..2 {
        controller.prepare().await.map_err(|err| err.to_string())?;
        controller.start().await.map_err(|err| err.to_string())?;
        wait_for_state(&mut states, PlaybackState::Playing(1)).await?;
        wait_for_state(&mut states, PlaybackState::NotReady).await?;
    }
    let ends = adapter.calls().iter().filter(|call| *call == "end").count();
    if ends != 2 {
        return Err(format!("expected two end hooks, got {}", ends));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn play_item_past_the_end_is_a_range_error() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.prepare().await.map_err(|err| err.to_string())?;
    let calls_before = adapter.calls().len();

    match controller.play_item(2).await {
        Err(PlaybackError::IndexOutOfRange { index: 2, len: 2 }) => {}
        other => return Err(format!("expected range error, got {:?}", other)),
    }
    if controller.state() != PlaybackState::Ready {
        return Err(format!("state changed to {}", controller.state()));
    }
    if adapter.calls().len() != calls_before {
        return Err(format!("adapters were called: {:?}", adapter.calls()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn start_is_rejected_unless_ready() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;

    match controller.start().await {
        Err(PlaybackError::InvalidTransition {
            from: "NOT_READY",
            to: "STARTING",
        }) => {}
        other => return Err(format!("expected invalid transition, got {:?}", other)),
    }
    if controller.state() != PlaybackState::NotReady || !adapter.calls().is_empty() {
        return Err(format!(
            "rejected start had effects: {} {:?}",
            controller.state(),
            adapter.calls()
        ));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn empty_queue_cannot_be_prepared() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));

    match controller.prepare().await {
        Err(PlaybackError::EmptyQueue) => {}
        other => return Err(format!("expected empty queue error, got {:?}", other)),
    }
    if controller.state() != PlaybackState::NotReady || !adapter.calls().is_empty() {
        return Err("rejected prepare had effects".to_owned());
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn one_failing_target_does_not_block_the_other() -> Result<(), String> {
    let program = ScriptedAdapter::new("program");
    let preview = ScriptedAdapter::with_script(
        "preview",
        Script {
            fail_prepare: true,
            ..Script::default()
        },
    );
    let program_target: Arc<dyn PlaybackAdapter> = program.clone();
    let preview_target: Arc<dyn PlaybackAdapter> = preview.clone();
    let controller =
        PlaybackController::new(PlaybackTargets::new(Some(program_target), Some(preview_target)));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;

    let report = controller.prepare().await.map_err(|err| err.to_string())?;
    if report.failures() != 1 || report.reports.len() != 2 {
        return Err(format!("unexpected report {:?}", report));
    }
    if !matches!(report.outcome_of("program"), Some(Ok(StepOutcome::Completed))) {
        return Err(format!("program outcome {:?}", report.outcome_of("program")));
    }
    if controller.state() != PlaybackState::Ready {
        return Err(format!("expected READY, got {}", controller.state()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn preview_only_leaves_program_untouched() -> Result<(), String> {
    let program = ScriptedAdapter::new("program");
    let preview = ScriptedAdapter::new("preview");
    let program_target: Arc<dyn PlaybackAdapter> = program.clone();
    let preview_target: Arc<dyn PlaybackAdapter> = preview.clone();
    let controller =
        PlaybackController::new(PlaybackTargets::new(Some(program_target), Some(preview_target)));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.set_preview_only(true).map_err(|err| err.to_string())?;

    let report = controller.prepare().await.map_err(|err| err.to_string())?;
    if report.reports.len() != 1 || !program.calls().is_empty() {
        return Err(format!("program was driven: {:?}", program.calls()));
    }
    if preview.calls() != ["prepare:/replays/a.mkv:0"] {
        return Err(format!("unexpected preview calls {:?}", preview.calls()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn unconfigured_target_is_left_out() -> Result<(), String> {
    let program = ScriptedAdapter::with_script(
        "program",
        Script {
            unconfigured: true,
            ..Script::default()
        },
    );
    let controller = PlaybackController::new(program_only(&program));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;

    let report = controller.prepare().await.map_err(|err| err.to_string())?;
    if !report.reports.is_empty() || !program.calls().is_empty() {
        return Err(format!("unconfigured target was driven: {:?}", program.calls()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn queue_is_locked_while_playing() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.prepare().await.map_err(|err| err.to_string())?;
    controller.start().await.map_err(|err| err.to_string())?;

    match controller.set_queue(PlayQueue::default()) {
        Err(PlaybackError::SessionActive { what: "queue", .. }) => {}
        other => return Err(format!("expected session active, got {:?}", other)),
    }
    match controller.set_preview_only(true) {
        Err(PlaybackError::SessionActive { what: "targets", .. }) => {}
        other => return Err(format!("expected session active, got {:?}", other)),
    }
    if controller.queue().len() != 2 {
        return Err("queue was replaced".to_owned());
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn new_queue_discards_preparation() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.prepare().await.map_err(|err| err.to_string())?;

    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    if controller.state() != PlaybackState::NotReady {
        return Err(format!("expected NOT_READY, got {}", controller.state()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn abort_stops_the_countdown_and_pauses() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.prepare().await.map_err(|err| err.to_string())?;
    controller.start().await.map_err(|err| err.to_string())?;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let report = controller.abort().await.map_err(|err| err.to_string())?;
    if report.step != "pause" || !report.all_completed() {
        return Err(format!("unexpected abort report {:?}", report));
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
    if controller.state() != PlaybackState::NotReady {
        return Err(format!("expected NOT_READY, got {}", controller.state()));
    }
    if adapter.calls().iter().any(|call| call.starts_with("seek")) {
        return Err(format!("segment advanced after abort: {:?}", adapter.calls()));
    }
    if controller.position_ms().is_some() {
        return Err("countdown still running".to_owned());
    }
    match controller.abort().await {
        Err(PlaybackError::InvalidTransition { .. }) => Ok(()),
        other => Err(format!("second abort should be rejected, got {:?}", other)),
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn abort_cancels_hooks_in_flight() -> Result<(), String> {
    let adapter = ScriptedAdapter::with_script(
        "program",
        Script {
            block_start: true,
            ..Script::default()
        },
    );
    let controller = Arc::new(PlaybackController::new(program_only(&adapter)));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.prepare().await.map_err(|err| err.to_string())?;

    let starting = Arc::clone(&controller);
    let start = tokio::spawn(async move { starting.start().await });
    tokio::time::sleep(Duration::from_millis(500)).await;
    if controller.state() != PlaybackState::Starting {
        return Err(format!("expected STARTING, got {}", controller.state()));
    }

    controller.abort().await.map_err(|err| err.to_string())?;
    let started = start.await.map_err(|err| err.to_string())?;
    if !matches!(started, Err(PlaybackError::InvalidTransition { .. })) {
        return Err(format!("aborted start should fail, got {:?}", started));
    }
    if !adapter.calls().iter().any(|call| call == "start:cancelled") {
        return Err(format!("start hook was not cancelled: {:?}", adapter.calls()));
    }
    if controller.state() != PlaybackState::NotReady {
        return Err(format!("expected NOT_READY, got {}", controller.state()));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shut_down_controller_rejects_commands() -> Result<(), String> {
    let adapter = ScriptedAdapter::new("program");
    let controller = PlaybackController::new(program_only(&adapter));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;
    controller.shutdown();
    match controller.prepare().await {
        Err(PlaybackError::ShutDown) => Ok(()),
        other => Err(format!("expected shut down error, got {:?}", other)),
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn aborted_prepare_does_not_ready_the_next_run() -> Result<(), String> {
    let adapter = ScriptedAdapter::with_script(
        "program",
        Script {
            prepare_delay: Duration::from_millis(200),
            ..Script::default()
        },
    );
    let controller = Arc::new(PlaybackController::new(program_only(&adapter)));
    controller.set_queue(two_laps()).map_err(|err| err.to_string())?;

    let stale = Arc::clone(&controller);
    let first = tokio::spawn(async move { stale.prepare().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.abort().await.map_err(|err| err.to_string())?;

    let live = Arc::clone(&controller);
    let second = tokio::spawn(async move { live.prepare().await });
    tokio::time::sleep(Duration::from_millis(160)).await;

    let first = first.await.map_err(|err| err.to_string())?;
    if !matches!(first, Err(PlaybackError::Aborted)) {
        return Err(format!("aborted prepare should fail, got {:?}", first));
    }
    if controller.state() != PlaybackState::Preparing {
        return Err(format!(
            "new run should still be PREPARING, got {}",
            controller.state()
        ));
    }

    let second = second.await.map_err(|err| err.to_string())?;
    if let Err(err) = second {
        return Err(format!("live prepare failed: {}", err));
    }
    if controller.state() != PlaybackState::Ready {
        return Err(format!("expected READY, got {}", controller.state()));
    }
    Ok(())
}
