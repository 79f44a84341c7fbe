use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid boolean '{value}'. Expected true/false, yes/no, on/off, or 1/0.")]
    InvalidBoolean { value: String },
    #[error(
        "Lap at {time_ms} ms cannot look back {duration_ms} ms; the segment would start before the recording."
    )]
    LapBeforeRecordingStart { time_ms: u64, duration_ms: u64 },
    #[error("Unknown command '{value}'. Type 'help' for the command list.")]
    UnknownCommand { value: String },
    #[error("Command '{command}' requires {argument}.")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("Invalid argument '{value}' for '{command}'.")]
    InvalidArgument {
        command: &'static str,
        value: String,
    },
    #[error("No replay #{number}. Saved replays: {available}.")]
    UnknownReplay { number: usize, available: usize },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
