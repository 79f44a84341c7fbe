use lapreplay::error::ValidationError;

/// One operator command read from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Toggle,
    Lap,
    Save,
    Replays,
    /// Loads saved replay `n` (1-based) into the play queue.
    Queue(usize),
    Prepare,
    Start,
    /// Cuts to the segment after the one playing.
    Next,
    Abort,
    Preview(bool),
    Status,
    Scenes,
    Help,
    Quit,
}

pub(crate) const HELP: &str = "\
Commands:
  toggle          start or stop the replay buffer
  lap             mark a lap at the current buffer time
  save            save the buffer with the marked laps
  replays         list replays saved in this session
  queue <n>       load replay <n> into the play queue
  prepare         park the targets at the first segment
  start           run the transition and play the queue
  next            cut to the next segment of the running queue
  abort           stop playback
  preview on|off  limit playback to the preview target
  status          show buffer and playback status
  scenes          list the mixer's scenes
  help            show this list
  quit            exit";

/// Parses one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns an error for unknown commands and missing or malformed arguments.
pub(crate) fn parse_command(line: &str) -> Result<Option<Command>, ValidationError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();
    let command = match name.to_ascii_lowercase().as_str() {
        "toggle" => Command::Toggle,
        "lap" => Command::Lap,
        "save" => Command::Save,
        "replays" => Command::Replays,
        "queue" => Command::Queue(parse_number("queue", argument)?),
        "prepare" => Command::Prepare,
        "start" => Command::Start,
        "next" => Command::Next,
        "abort" => Command::Abort,
        "preview" => Command::Preview(parse_switch(argument)?),
        "status" => Command::Status,
        "scenes" => Command::Scenes,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => {
            return Err(ValidationError::UnknownCommand {
                value: name.to_owned(),
            });
        }
    };
    Ok(Some(command))
}

fn parse_number(command: &'static str, argument: Option<&str>) -> Result<usize, ValidationError> {
    let value = argument.ok_or(ValidationError::MissingArgument {
        command,
        argument: "a number",
    })?;
    match value.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number),
        Ok(_) | Err(_) => Err(ValidationError::InvalidArgument {
            command,
            value: value.to_owned(),
        }),
    }
}

fn parse_switch(argument: Option<&str>) -> Result<bool, ValidationError> {
    let value = argument.ok_or(ValidationError::MissingArgument {
        command: "preview",
        argument: "on or off",
    })?;
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(ValidationError::InvalidArgument {
            command: "preview",
            value: value.to_owned(),
        }),
    }
}
