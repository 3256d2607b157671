//! Stdin command parsing for headless mode

use qrlaunch_app::Message;
use qrlaunch_channel::{parse_push_message, ChannelMessage};
use qrlaunch_core::prelude::*;

/// Parse one stdin line into a message.
///
/// Returns `Ok(None)` for blank lines and well-formed pushes of event kinds
/// the engine does not handle.
pub fn parse_command(line: &str) -> Result<Option<Message>> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let message = match command {
        "" => return Ok(None),
        "continue" | "c" => Message::ContinueInApp,
        "confirm" | "y" => Message::LaunchConfirmed,
        "cancel" | "n" => Message::LaunchCancelled,
        "extend" | "e" => Message::ExtendSession,
        "install" | "i" => Message::InstallApp,
        "dismiss" | "d" => Message::DismissFallback,
        "quit" | "q" => Message::Quit,
        "return" => Message::ReturnSignal {
            fragment: rest.to_string(),
        },
        "push" => match parse_push_message(rest)? {
            ChannelMessage::Event(event) => Message::Push(event),
            ChannelMessage::Unknown(name) => {
                debug!("Ignoring unknown push event '{}'", name);
                return Ok(None);
            }
        },
        other => return Err(Error::protocol(format!("unknown command '{other}'"))),
    };

    Ok(Some(message))
}
