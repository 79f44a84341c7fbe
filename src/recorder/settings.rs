use std::time::Duration;

use crate::error::RecorderError;

pub const DEFAULT_MAX_BUFFER: Duration = Duration::from_secs(300);
pub const DEFAULT_LAP_DURATION_MS: u64 = 3000;
pub const DEFAULT_LIMIT_MARGIN_MS: u64 = 5000;
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Buffer length and autosave tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderSettings {
    /// Length of the mixer's replay buffer.
    pub max_buffer: Duration,
    /// Look-back window attached to every lap.
    pub lap_duration_ms: u64,
    /// How long before the buffer would overflow the autosave fires.
    pub limit_margin_ms: u64,
    pub check_interval: Duration,
    pub auto_save: bool,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            max_buffer: DEFAULT_MAX_BUFFER,
            lap_duration_ms: DEFAULT_LAP_DURATION_MS,
            limit_margin_ms: DEFAULT_LIMIT_MARGIN_MS,
            check_interval: DEFAULT_CHECK_INTERVAL,
            auto_save: true,
        }
    }
}

impl RecorderSettings {
    /// # Errors
    ///
    /// Rejects a margin that leaves no time before the deadline and a zero
    /// check interval.
    pub fn validate(&self) -> Result<(), RecorderError> {
        let max_buffer_ms = self.max_buffer_ms();
        if self.limit_margin_ms >= max_buffer_ms {
            return Err(RecorderError::MarginExceedsBuffer {
                max_buffer_ms,
                margin_ms: self.limit_margin_ms,
            });
        }
        if self.check_interval.is_zero() {
            return Err(RecorderError::ZeroCheckInterval);
        }
        Ok(())
    }

    #[must_use]
    pub fn max_buffer_ms(&self) -> u64 {
        u64::try_from(self.max_buffer.as_millis()).unwrap_or(u64::MAX)
    }

    /// Time from the first lap until the autosave deadline.
    #[must_use]
    pub fn deadline_after_first_lap(&self) -> Duration {
        self.max_buffer
            .saturating_sub(Duration::from_millis(self.limit_margin_ms))
    }
}
