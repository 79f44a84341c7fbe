//! Millisecond time readouts.

/// Formats milliseconds as `H:MM:SS.mmm`; hours are not padded. Negative
/// values keep their sign, as the autosave countdown can overshoot.
#[must_use]
pub fn format_hms_millis(time_ms: i64) -> String {
    let sign = if time_ms < 0 { "-" } else { "" };
    let total = time_ms.unsigned_abs();
    let millis = total % 1000;
    let total_seconds = total / 1000;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!(
        "{}{}:{:02}:{:02}.{:03}",
        sign, hours, minutes, seconds, millis
    )
}
