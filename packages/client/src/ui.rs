//! UI utilities for the client: prompt handling and command parsing.

use std::io::Write;

/// Redisplay the prompt after printing an event
pub fn redisplay_prompt(client_id: &str) {
    print!("{}> ", client_id);
    std::io::stdout().flush().ok();
}

/// Commands a user can type at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Start,
    Stop,
    Tempo(u32),
    TimeSignature(String),
    Instrument(String),
    Leave,
    Quit,
    Help,
}

/// One-line usage summary shown for `help` and unrecognized input.
pub const USAGE: &str = "commands: start | stop | tempo <bpm> | sig <N/D> | instrument <id> | leave | quit";

/// Parse a line of user input into a command.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next().unwrap_or("");
    let argument = parts.next();

    match (keyword, argument) {
        ("start", None) => Ok(UserCommand::Start),
        ("stop", None) => Ok(UserCommand::Stop),
        ("tempo", Some(bpm)) => bpm
            .parse()
            .map(UserCommand::Tempo)
            .map_err(|_| format!("'{}' is not a valid bpm", bpm)),
        ("tempo", None) => Err("usage: tempo <bpm>".to_string()),
        ("sig", Some(signature)) => Ok(UserCommand::TimeSignature(signature.to_string())),
        ("sig", None) => Err("usage: sig <N/D>, e.g. sig 3/4".to_string()),
        ("instrument", Some(id)) => Ok(UserCommand::Instrument(id.to_string())),
        ("instrument", None) => Err("usage: instrument <id>".to_string()),
        ("leave", None) => Ok(UserCommand::Leave),
        ("quit", None) | ("exit", None) => Ok(UserCommand::Quit),
        ("help", None) => Ok(UserCommand::Help),
        _ => Err(format!("unrecognized command: {}", line.trim())),
    }
}
