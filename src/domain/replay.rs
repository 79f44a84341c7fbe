use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ValidationError;

/// A moment marked by the operator, measured from the start of the current
/// buffer session, plus the window to look back from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapMarker {
    pub time_ms: u64,
    pub duration_ms: u64,
}

impl LapMarker {
    #[must_use]
    pub const fn new(time_ms: u64, duration_ms: u64) -> Self {
        Self {
            time_ms,
            duration_ms,
        }
    }

    /// Start of the look-back window, or `None` when the window would begin
    /// before the recording did.
    #[must_use]
    pub const fn look_back_start_ms(&self) -> Option<u64> {
        self.time_ms.checked_sub(self.duration_ms)
    }
}

/// A saved buffer file together with the laps that were pending when the save
/// was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub path: String,
    pub laps: Vec<LapMarker>,
}

impl Replay {
    /// File name of the saved replay without directories or extension.
    ///
    /// Separators of both path flavours are honoured because the mixer may
    /// run on a different platform than this process.
    #[must_use]
    pub fn file_stem(&self) -> &str {
        let file_name = self
            .path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str());
        match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            Some(_) | None => file_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayQueueItem {
    pub path: String,
    pub name: String,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl PlayQueueItem {
    /// Derives the segment that ends at `lap` and spans its look-back window.
    ///
    /// # Errors
    ///
    /// Returns `LapBeforeRecordingStart` when the window would start before
    /// the recording.
    pub fn from_lap(path: &str, name: String, lap: &LapMarker) -> Result<Self, ValidationError> {
        let start_ms =
            lap.look_back_start_ms()
                .ok_or(ValidationError::LapBeforeRecordingStart {
                    time_ms: lap.time_ms,
                    duration_ms: lap.duration_ms,
                })?;
        Ok(Self {
            path: path.to_owned(),
            name,
            start_ms,
            duration_ms: lap.duration_ms,
        })
    }

    #[must_use]
    pub const fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }
}

/// Ordered segments; index order is playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayQueue {
    items: Vec<PlayQueueItem>,
}

impl PlayQueue {
    #[must_use]
    pub const fn new(items: Vec<PlayQueueItem>) -> Self {
        Self { items }
    }

    /// Builds one segment per lap of `replay`, in capture order. Laps whose
    /// look-back window starts before the recording are skipped; the others
    /// keep their lap number in the item name.
    #[must_use]
    pub fn from_replay(replay: &Replay) -> Self {
        let stem = replay.file_stem();
        let items = replay
            .laps
            .iter()
            .enumerate()
            .filter_map(|(index, lap)| {
                let name = format!("{} #{}", stem, index.saturating_add(1));
                match PlayQueueItem::from_lap(&replay.path, name, lap) {
                    Ok(item) => Some(item),
                    Err(err) => {
                        warn!("Skipping lap {} of {}: {}", index.saturating_add(1), stem, err);
                        None
                    }
                }
            })
            .collect();
        Self { items }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PlayQueueItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }
}

/// Identity of a mixer-hosted media source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteTargetSource {
    pub scene_name: String,
    pub item_name: String,
    pub scene_item_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_item_looks_back_from_lap() -> Result<(), String> {
        let lap = LapMarker::new(5000, 3000);
        let item = PlayQueueItem::from_lap("/tmp/replay.mkv", "one".to_owned(), &lap)
            .map_err(|err| format!("unexpected error: {}", err))?;
        if item.start_ms != 2000 || item.duration_ms != 3000 {
            return Err(format!("unexpected item: {:?}", item));
        }
        if item.end_ms() != 5000 {
            return Err(format!("unexpected end: {}", item.end_ms()));
        }
        Ok(())
    }

    #[test]
    fn queue_item_rejects_window_before_recording() -> Result<(), String> {
        let lap = LapMarker::new(1200, 3000);
        match PlayQueueItem::from_lap("replay.mkv", "early".to_owned(), &lap) {
            Err(ValidationError::LapBeforeRecordingStart {
                time_ms: 1200,
                duration_ms: 3000,
            }) => Ok(()),
            other => Err(format!("expected LapBeforeRecordingStart, got {:?}", other)),
        }
    }

    #[test]
    fn lap_exactly_at_window_starts_at_zero() -> Result<(), String> {
        let lap = LapMarker::new(3000, 3000);
        if lap.look_back_start_ms() != Some(0) {
            return Err("expected segment to start at 0".to_owned());
        }
        Ok(())
    }

    #[test]
    fn queue_from_replay_keeps_capture_order_and_names() -> Result<(), String> {
        let replay = Replay {
            path: "C:\\Videos\\Replay 2024-05-01 10-00-00.mkv".to_owned(),
            laps: vec![LapMarker::new(4000, 3000), LapMarker::new(9000, 3000)],
        };
        let queue = PlayQueue::from_replay(&replay);
        if queue.len() != 2 {
            return Err(format!("unexpected length {}", queue.len()));
        }
        let second = queue.get(1).ok_or("missing second item")?;
        if second.start_ms != 6000 {
            return Err(format!("unexpected start {}", second.start_ms));
        }
        if second.name != "Replay 2024-05-01 10-00-00 #2" {
            return Err(format!("unexpected name {}", second.name));
        }
        if queue.last_index() != Some(1) {
            return Err("unexpected last index".to_owned());
        }
        Ok(())
    }

    #[test]
    fn queue_from_replay_skips_laps_before_recording_start() -> Result<(), String> {
        let replay = Replay {
            path: "/var/replays/heat.mkv".to_owned(),
            laps: vec![LapMarker::new(1000, 3000), LapMarker::new(6000, 3000)],
        };
        let queue = PlayQueue::from_replay(&replay);
        if queue.len() != 1 {
            return Err(format!("unexpected length {}", queue.len()));
        }
        let only = queue.get(0).ok_or("missing item")?;
        if only.start_ms != 3000 || only.name != "heat #2" {
            return Err(format!("unexpected item: {:?}", only));
        }
        Ok(())
    }

    #[test]
    fn queue_from_replay_with_only_early_laps_is_empty() -> Result<(), String> {
        let replay = Replay {
            path: "/var/replays/heat.mkv".to_owned(),
            laps: vec![LapMarker::new(500, 3000)],
        };
        if !PlayQueue::from_replay(&replay).is_empty() {
            return Err("expected an empty queue".to_owned());
        }
        Ok(())
    }

    #[test]
    fn file_stem_handles_unix_paths_without_extension() -> Result<(), String> {
        let replay = Replay {
            path: "/var/replays/take".to_owned(),
            laps: Vec::new(),
        };
        if replay.file_stem() != "take" {
            return Err(format!("unexpected stem {}", replay.file_stem()));
        }
        Ok(())
    }
}
