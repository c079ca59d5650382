//! Special commands for the interactive prompt
//!
//! Lines starting with `/` control the session instead of being submitted:
//! - `/flow <llm|pdf|web|smart>` or `/llm`, `/pdf`, `/web`, `/smart` to
//!   switch the active flow
//! - `/status` to show the active flow and endpoints
//! - `/help` for usage
//! - `exit`, `quit`, or `/exit` to leave
//!
//! Commands are case-insensitive.

use colored::Colorize;
use thiserror::Error;

use crate::flows::FlowKind;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Session commands recognised by the interactive prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Make another flow receive submitted lines
    SwitchFlow(FlowKind),

    /// Show the active flow
    ShowStatus,

    /// Show usage
    Help,

    /// Leave the session
    Exit,

    /// Not a command; submit the line
    None,
}

/// Parse a line typed at the interactive prompt
///
/// # Errors
///
/// Returns [`CommandError`] for a `/` line that is not a valid command.
///
/// # Examples
///
/// ```
/// use ragstream::commands::special_commands::{parse_special_command, SpecialCommand};
/// use ragstream::flows::FlowKind;
///
/// assert_eq!(
///     parse_special_command("/flow web").unwrap(),
///     SpecialCommand::SwitchFlow(FlowKind::Web)
/// );
/// assert_eq!(parse_special_command("/PDF").unwrap(), SpecialCommand::SwitchFlow(FlowKind::Pdf));
/// assert_eq!(parse_special_command("what is rust?").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/teleport").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/status" => Ok(SpecialCommand::ShowStatus),

        "/flow" => Err(CommandError::MissingArgument {
            command: "/flow".to_string(),
            usage: "/flow <llm|pdf|web|smart>".to_string(),
        }),
        input if input.starts_with("/flow ") => {
            let arg = input[6..].trim();
            FlowKind::parse_str(arg)
                .map(SpecialCommand::SwitchFlow)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/flow".to_string(),
                    arg: arg.to_string(),
                })
        }

        input => FlowKind::parse_str(&input[1..])
            .map(SpecialCommand::SwitchFlow)
            .map_err(|_| CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print usage for the interactive prompt
pub fn print_help() {
    println!();
    println!("{}", "Interactive commands".bold());
    println!("  {:<28} switch the flow that receives your input", "/flow <llm|pdf|web|smart>");
    println!("  {:<28} shorthand for /flow", "/llm /pdf /web /smart");
    println!("  {:<28} show the active flow", "/status");
    println!("  {:<28} show this help", "/help");
    println!("  {:<28} leave", "exit, quit, /exit");
    println!();
    println!("Anything else is submitted to the active flow when you press Enter.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_aliases() {
        for input in ["exit", "QUIT", "/exit", " /quit "] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Exit);
        }
    }

    #[test]
    fn test_flow_switches() {
        assert_eq!(
            parse_special_command("/flow SMART").unwrap(),
            SpecialCommand::SwitchFlow(FlowKind::Smart)
        );
        assert_eq!(
            parse_special_command("/llm").unwrap(),
            SpecialCommand::SwitchFlow(FlowKind::Llm)
        );
    }

    #[test]
    fn test_flow_argument_errors() {
        assert!(matches!(
            parse_special_command("/flow"),
            Err(CommandError::MissingArgument { .. })
        ));
        assert_eq!(
            parse_special_command("/flow fax"),
            Err(CommandError::UnsupportedArgument {
                command: "/flow".to_string(),
                arg: "fax".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_special_command("/bogus"),
            Err(CommandError::UnknownCommand("/bogus".to_string()))
        );
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(
            parse_special_command("explain /etc/hosts").unwrap(),
            SpecialCommand::None
        );
        assert_eq!(parse_special_command("exit now").unwrap(), SpecialCommand::None);
    }
}
