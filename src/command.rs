//! Parsing of terminal input lines.
//!
//! A line starting with `:` is a directive for the terminal itself; every
//! other line is text for the device.

use crate::error::AppError;
use crate::port::BaudRate;

/// Prefix marking a directive.
pub const DIRECTIVE_PREFIX: char = ':';

pub const HELP_TEXT: &str = "\
:connect [port] [baud]  open a port (defaults from config)
:disconnect             close the current port
:ports                  list candidate ports
:baud <rate>            set the rate used by the next :connect
:help                   show this help
:quit                   disconnect and exit
::text                  send text that starts with ':'";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Connect {
        port: Option<String>,
        baud: Option<BaudRate>,
    },
    Disconnect,
    ListPorts,
    SetBaud(BaudRate),
    Help,
    Quit,
    /// Text to send to the device, without line ending.
    Send(String),
}

impl TerminalCommand {
    /// Parse a line with its trailing newline already removed.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) else {
            return Ok(Self::Send(line.to_string()));
        };
        // "::" escapes a literal leading colon.
        if rest.starts_with(DIRECTIVE_PREFIX) {
            return Ok(Self::Send(rest.to_string()));
        }

        let mut words = rest.split_whitespace();
        let Some(name) = words.next() else {
            return Err(AppError::InvalidCommand(line.to_string()));
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("connect" | "c", []) => Self::Connect {
                port: None,
                baud: None,
            },
            ("connect" | "c", [port]) => Self::Connect {
                port: Some(port.to_string()),
                baud: None,
            },
            ("connect" | "c", [port, baud]) => Self::Connect {
                port: Some(port.to_string()),
                baud: Some(parse_baud(baud)?),
            },
            ("disconnect" | "d", []) => Self::Disconnect,
            ("ports" | "p", []) => Self::ListPorts,
            ("baud" | "b", [baud]) => Self::SetBaud(parse_baud(baud)?),
            ("help" | "h" | "?", []) => Self::Help,
            ("quit" | "q" | "exit", []) => Self::Quit,
            _ => return Err(AppError::InvalidCommand(line.to_string())),
        };
        Ok(command)
    }
}

fn parse_baud(text: &str) -> Result<BaudRate, AppError> {
    text.parse::<BaudRate>().map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            TerminalCommand::parse("AT+GMR").unwrap(),
            TerminalCommand::Send("AT+GMR".into())
        );
        assert_eq!(
            TerminalCommand::parse("").unwrap(),
            TerminalCommand::Send(String::new())
        );
    }

    #[test]
    fn test_escaped_colon() {
        assert_eq!(
            TerminalCommand::parse("::ok").unwrap(),
            TerminalCommand::Send(":ok".into())
        );
    }

    #[test]
    fn test_connect_variants() {
        assert_eq!(
            TerminalCommand::parse(":connect").unwrap(),
            TerminalCommand::Connect {
                port: None,
                baud: None
            }
        );
        assert_eq!(
            TerminalCommand::parse(":connect /dev/ttyUSB0 9600").unwrap(),
            TerminalCommand::Connect {
                port: Some("/dev/ttyUSB0".into()),
                baud: Some(BaudRate::B9600)
            }
        );
    }

    #[test]
    fn test_unsupported_baud_rejected() {
        let err = TerminalCommand::parse(":baud 57600").unwrap_err();
        assert!(matches!(err, AppError::Port(_)));
        assert_eq!(
            TerminalCommand::parse(":b 1200000").unwrap(),
            TerminalCommand::SetBaud(BaudRate::B1200000)
        );
    }

    #[test]
    fn test_unknown_directive() {
        assert!(matches!(
            TerminalCommand::parse(":flash"),
            Err(AppError::InvalidCommand(_))
        ));
        assert!(matches!(
            TerminalCommand::parse(":"),
            Err(AppError::InvalidCommand(_))
        ));
        assert!(TerminalCommand::parse(":quit now").is_err());
    }

    #[test]
    fn test_simple_directives() {
        assert_eq!(TerminalCommand::parse(":Q").unwrap(), TerminalCommand::Quit);
        assert_eq!(
            TerminalCommand::parse(":ports").unwrap(),
            TerminalCommand::ListPorts
        );
        assert_eq!(
            TerminalCommand::parse(":disconnect").unwrap(),
            TerminalCommand::Disconnect
        );
        assert_eq!(TerminalCommand::parse(":?").unwrap(), TerminalCommand::Help);
    }
}
