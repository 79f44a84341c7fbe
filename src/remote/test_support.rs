//! Scripted in-memory mixer for tests.
//!
//! Time is tokio time, so tests driving it usually run with a paused clock.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

use crate::error::{RemoteError, RemoteResult};

use super::{
    MediaAction, MediaState, MediaStatus, OutputState, RemoteControl, RemoteEvent, RemoteRequest,
    RemoteResponse, SceneItem,
};

const OUTPUT_NOT_RUNNING: u16 = 501;
const RESOURCE_NOT_FOUND: u16 = 600;
const INVALID_RESOURCE_STATE: u16 = 604;

/// How simulated media inputs react to commands.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MediaBehaviour {
    /// Time between the first play command and a reported cursor/duration.
    pub load_delay: Duration,
    /// Time a pause command takes before the input stops advancing.
    pub pause_lag: Duration,
    /// Offset applied to every commanded cursor.
    pub seek_error_ms: u64,
    pub duration_ms: u64,
}

impl Default for MediaBehaviour {
    fn default() -> Self {
        Self {
            load_delay: Duration::from_millis(300),
            pause_lag: Duration::ZERO,
            seek_error_ms: 0,
            duration_ms: 60_000,
        }
    }
}

#[derive(Debug, Default)]
struct FakeMedia {
    path: Option<String>,
    playing: bool,
    loaded_at: Option<Instant>,
    cursor_base: u64,
    since: Option<Instant>,
    pause_at: Option<Instant>,
}

impl FakeMedia {
    fn loaded(&self, now: Instant) -> bool {
        self.loaded_at.is_some_and(|at| now >= at)
    }

    fn cursor_at(&self, at: Instant, duration_ms: u64) -> u64 {
        let Some(loaded_at) = self.loaded_at else {
            return 0;
        };
        if !self.playing || at < loaded_at {
            return self.cursor_base.min(duration_ms);
        }
        let since = self.since.map_or(loaded_at, |since| since.max(loaded_at));
        let advanced = u64::try_from(at.saturating_duration_since(since).as_millis()).unwrap_or(0);
        self.cursor_base.saturating_add(advanced).min(duration_ms)
    }

    fn settle(&mut self, now: Instant, duration_ms: u64) {
        if let Some(at) = self.pause_at
            && now >= at
        {
            self.cursor_base = self.cursor_at(at, duration_ms);
            self.playing = false;
            self.pause_at = None;
        }
    }
}

#[derive(Debug)]
struct MixerState {
    scenes: Vec<(String, Vec<SceneItem>)>,
    program_scene: String,
    enabled: HashMap<(String, i64), bool>,
    media: HashMap<String, FakeMedia>,
    behaviour: MediaBehaviour,
    replay_buffer: Option<bool>,
    saves: u32,
    calls: Vec<RemoteRequest>,
    failures: HashMap<&'static str, (u16, u32)>,
    transition: Duration,
    save_delay: Duration,
}

pub(crate) struct FakeMixer {
    state: Mutex<MixerState>,
    events: broadcast::Sender<RemoteEvent>,
    connected: watch::Sender<bool>,
}

impl FakeMixer {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (connected, _) = watch::channel(true);
        Self {
            state: Mutex::new(MixerState {
                scenes: Vec::new(),
                program_scene: String::new(),
                enabled: HashMap::new(),
                media: HashMap::new(),
                behaviour: MediaBehaviour::default(),
                replay_buffer: Some(false),
                saves: 0,
                calls: Vec::new(),
                failures: HashMap::new(),
                transition: Duration::from_millis(500),
                save_delay: Duration::from_millis(50),
            }),
            events,
            connected,
        }
    }

    fn with_state<R>(&self, apply: impl FnOnce(&mut MixerState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => apply(&mut state),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }

    /// Adds a scene with `(source name, scene item id)` entries. The first
    /// scene added becomes the program scene.
    pub(crate) fn add_scene(&self, name: &str, items: &[(&str, i64)]) {
        self.with_state(|state| {
            if state.program_scene.is_empty() {
                state.program_scene = name.to_owned();
            }
            let items = items
                .iter()
                .map(|(source_name, scene_item_id)| SceneItem {
                    scene_item_id: *scene_item_id,
                    source_name: (*source_name).to_owned(),
                    input_kind: Some("vlc_source".to_owned()),
                    is_group: false,
                })
                .collect();
            state.scenes.push((name.to_owned(), items));
        });
    }

    pub(crate) fn set_media_behaviour(&self, behaviour: MediaBehaviour) {
        self.with_state(|state| state.behaviour = behaviour);
    }

    pub(crate) fn set_transition(&self, duration: Duration) {
        self.with_state(|state| state.transition = duration);
    }

    /// `None` simulates a replay buffer disabled in the mixer's settings.
    pub(crate) fn set_replay_buffer(&self, active: Option<bool>) {
        self.with_state(|state| state.replay_buffer = active);
    }

    /// Makes the next `times` calls of `request_type` fail with `code`.
    pub(crate) fn fail(&self, request_type: &'static str, code: u16, times: u32) {
        self.with_state(|state| {
            state.failures.insert(request_type, (code, times));
        });
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.send_replace(connected);
    }

    pub(crate) fn emit(&self, event: RemoteEvent) {
        drop(self.events.send(event));
    }

    /// Switches the program scene the way an operator would, with the
    /// configured transition.
    pub(crate) fn operator_switch(&self, scene: &str) {
        let transition = self.with_state(|state| {
            state.program_scene = scene.to_owned();
            state.transition
        });
        self.run_transition(transition);
    }

    /// Flips the buffer on or off from the mixer side.
    pub(crate) fn operator_toggle_buffer(&self) {
        let active = self.with_state(|state| {
            let active = !state.replay_buffer.unwrap_or(false);
            state.replay_buffer = Some(active);
            active
        });
        self.emit_buffer_change(active);
    }

    pub(crate) fn current_scene(&self) -> String {
        self.with_state(|state| state.program_scene.clone())
    }

    pub(crate) fn item_enabled(&self, scene: &str, scene_item_id: i64) -> Option<bool> {
        self.with_state(|state| {
            state
                .enabled
                .get(&(scene.to_owned(), scene_item_id))
                .copied()
        })
    }

    pub(crate) fn media_path(&self, input_name: &str) -> Option<String> {
        self.with_state(|state| {
            state
                .media
                .get(input_name)
                .and_then(|media| media.path.clone())
        })
    }

    pub(crate) fn media_status_now(&self, input_name: &str) -> MediaStatus {
        self.with_state(|state| media_status(state, input_name, Instant::now()))
    }

    pub(crate) fn calls(&self) -> Vec<RemoteRequest> {
        self.with_state(|state| state.calls.clone())
    }

    pub(crate) fn count(&self, request_type: &str) -> usize {
        self.with_state(|state| {
            state
                .calls
                .iter()
                .filter(|request| request.request_type() == request_type)
                .count()
        })
    }

    pub(crate) fn clear_calls(&self) {
        self.with_state(|state| state.calls.clear());
    }

    fn run_transition(&self, duration: Duration) {
        self.emit(RemoteEvent::TransitionStarted {
            transition_name: "Fade".to_owned(),
        });
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            drop(events.send(RemoteEvent::TransitionEnded {
                transition_name: "Fade".to_owned(),
            }));
        });
    }

    fn emit_buffer_change(&self, active: bool) {
        let (first, second) = if active {
            (
                RemoteEvent::ReplayBufferStateChanged {
                    active: false,
                    state: OutputState::Starting,
                },
                RemoteEvent::ReplayBufferStateChanged {
                    active: true,
                    state: OutputState::Started,
                },
            )
        } else {
            (
                RemoteEvent::ReplayBufferStateChanged {
                    active: true,
                    state: OutputState::Stopping,
                },
                RemoteEvent::ReplayBufferStateChanged {
                    active: false,
                    state: OutputState::Stopped,
                },
            )
        };
        self.emit(first);
        self.emit(second);
    }

    fn handle(&self, request: RemoteRequest) -> RemoteResult<RemoteResponse> {
        let request_type = request.request_type();
        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.calls.push(request.clone());
        if let Some((code, remaining)) = state.failures.get_mut(request_type)
            && *remaining > 0
        {
            *remaining = remaining.saturating_sub(1);
            return Err(RemoteError::Request {
                request_type,
                code: *code,
                comment: "scripted failure".to_owned(),
            });
        }
        let behaviour = state.behaviour;
        let buffer = state.replay_buffer;
        match request {
            RemoteRequest::GetReplayBufferStatus => match buffer {
                Some(active) => Ok(RemoteResponse::ReplayBufferStatus { active }),
                None => Err(rejected(request_type, INVALID_RESOURCE_STATE)),
            },
            RemoteRequest::ToggleReplayBuffer => {
                let Some(active) = buffer else {
                    return Err(rejected(request_type, INVALID_RESOURCE_STATE));
                };
                state.replay_buffer = Some(!active);
                drop(state);
                self.emit_buffer_change(!active);
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::SaveReplayBuffer => match buffer {
                None => Err(rejected(request_type, INVALID_RESOURCE_STATE)),
                Some(false) => Err(rejected(request_type, OUTPUT_NOT_RUNNING)),
                Some(true) => {
                    state.saves = state.saves.saturating_add(1);
                    let path = format!("/replays/Replay {}.mkv", state.saves);
                    let delay = state.save_delay;
                    drop(state);
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        drop(events.send(RemoteEvent::ReplayBufferSaved { path }));
                    });
                    Ok(RemoteResponse::Ack)
                }
            },
            RemoteRequest::SetSceneItemEnabled {
                scene_name,
                scene_item_id,
                enabled,
            } => {
                state.enabled.insert((scene_name, scene_item_id), enabled);
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::SetInputPlaylist { input_name, path } => {
                state.media.insert(
                    input_name,
                    FakeMedia {
                        path: Some(path),
                        ..FakeMedia::default()
                    },
                );
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::TriggerMediaAction { input_name, action } => {
                let media = state.media.entry(input_name).or_default();
                media.settle(now, behaviour.duration_ms);
                match action {
                    MediaAction::Play => {
                        if !media.playing || media.pause_at.is_some() {
                            media.cursor_base = media.cursor_at(now, behaviour.duration_ms);
                            media.since = Some(now);
                            media.playing = true;
                            media.pause_at = None;
                        }
                        if media.loaded_at.is_none() {
                            media.loaded_at = now.checked_add(behaviour.load_delay);
                        }
                    }
                    MediaAction::Pause => {
                        if media.playing && media.pause_at.is_none() {
                            if behaviour.pause_lag.is_zero() {
                                media.cursor_base = media.cursor_at(now, behaviour.duration_ms);
                                media.playing = false;
                            } else {
                                media.pause_at = now.checked_add(behaviour.pause_lag);
                            }
                        }
                    }
                }
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::GetMediaStatus { input_name } => Ok(RemoteResponse::MediaStatus(
                media_status(&mut state, &input_name, now),
            )),
            RemoteRequest::SetMediaCursor {
                input_name,
                cursor_ms,
            } => {
                let media = state.media.entry(input_name).or_default();
                media.settle(now, behaviour.duration_ms);
                media.cursor_base = cursor_ms
                    .saturating_add(behaviour.seek_error_ms)
                    .min(behaviour.duration_ms);
                media.since = Some(now);
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::SetProgramScene { scene_name } => {
                if !state.scenes.iter().any(|(name, _)| *name == scene_name) {
                    return Err(rejected(request_type, RESOURCE_NOT_FOUND));
                }
                state.program_scene = scene_name;
                let transition = state.transition;
                drop(state);
                self.run_transition(transition);
                Ok(RemoteResponse::Ack)
            }
            RemoteRequest::GetProgramScene => Ok(RemoteResponse::ProgramScene {
                scene_name: state.program_scene.clone(),
            }),
            RemoteRequest::GetSceneList => Ok(RemoteResponse::SceneList {
                scenes: state.scenes.iter().map(|(name, _)| name.clone()).collect(),
            }),
            RemoteRequest::GetSceneItemList { scene_name } => state
                .scenes
                .iter()
                .find(|(name, _)| *name == scene_name)
                .map(|(_, items)| RemoteResponse::SceneItems {
                    items: items.clone(),
                })
                .ok_or_else(|| rejected(request_type, RESOURCE_NOT_FOUND)),
        }
    }
}

fn rejected(request_type: &'static str, code: u16) -> RemoteError {
    RemoteError::Request {
        request_type,
        code,
        comment: "rejected by fake mixer".to_owned(),
    }
}

fn media_status(state: &mut MixerState, input_name: &str, now: Instant) -> MediaStatus {
    let duration_ms = state.behaviour.duration_ms;
    let Some(media) = state.media.get_mut(input_name) else {
        return MediaStatus {
            state: MediaState::None,
            cursor_ms: None,
            duration_ms: None,
        };
    };
    media.settle(now, duration_ms);
    if media.path.is_none() {
        return MediaStatus {
            state: MediaState::None,
            cursor_ms: None,
            duration_ms: None,
        };
    }
    if !media.loaded(now) {
        return MediaStatus {
            state: if media.playing {
                MediaState::Opening
            } else {
                MediaState::Stopped
            },
            cursor_ms: None,
            duration_ms: None,
        };
    }
    MediaStatus {
        state: if media.playing {
            MediaState::Playing
        } else {
            MediaState::Paused
        },
        cursor_ms: Some(media.cursor_at(now, duration_ms)),
        duration_ms: Some(duration_ms),
    }
}

#[async_trait]
impl RemoteControl for FakeMixer {
    async fn call(&self, request: RemoteRequest) -> RemoteResult<RemoteResponse> {
        tokio::task::yield_now().await;
        if !*self.connected.borrow() {
            return Err(RemoteError::ConnectionClosed);
        }
        self.handle(request)
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.events.subscribe()
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}
